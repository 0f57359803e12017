//! The view router state machine.
//!
//! Owns the application base path, history integration and the mount
//! point's lifecycle. Phases run `Uninitialized -> Installing(subpath) ->
//! Installed(subpath)`; every routing failure is fatal where it is
//! detected, there is no degraded installed state.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::view::error::ViewError;
use crate::view::host::{find_nav_href, HostPage, NavTarget};
use crate::view::registry::ViewRegistry;

/// Where the router is in its install lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterPhase {
    /// Constructed, nothing installed yet.
    Uninitialized,
    /// A handler's populate routine is running for this subpath.
    Installing(String),
    /// This subpath's view owns the mount point.
    Installed(String),
}

pub struct ViewRouter<H: HostPage> {
    page: Arc<H>,
    registry: ViewRegistry<H>,
    /// Location prefix this router manages; immutable after construction.
    base: String,
    phase: Mutex<RouterPhase>,
}

impl<H: HostPage> ViewRouter<H> {
    /// Build a router over a finished registry.
    ///
    /// The base path is computed from the current location: among the
    /// registered subpaths that are a suffix of it, the one yielding the
    /// shortest base wins, which disambiguates overlapping registrations.
    ///
    /// # Errors
    /// Fails fatally on an empty registry or when no registration matches
    /// the current location.
    pub fn new(page: Arc<H>, registry: ViewRegistry<H>) -> Result<Self, ViewError> {
        if registry.is_empty() {
            return Err(ViewError::EmptyRegistry);
        }
        let path = page.current_path();
        let base = compute_base(&path, &registry)?;
        tracing::info!(base = %base, path = %path, "View router initialized");
        Ok(Self {
            page,
            registry,
            base,
            phase: Mutex::new(RouterPhase::Uninitialized),
        })
    }

    /// The managed base path.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn phase(&self) -> RouterPhase {
        self.phase.lock().clone()
    }

    /// Install the view for the current location.
    ///
    /// Replaces the mount node with a fresh empty one, runs the handler and
    /// applies the returned title. Fails fatally when the location resolves
    /// to an unregistered subpath.
    pub async fn install(&self) -> Result<(), ViewError> {
        let subpath = self.resolve_subpath()?;
        self.install_subpath(subpath).await
    }

    /// Install only if the resolved subpath differs from the installed one.
    /// Returns whether an install ran.
    pub async fn install_if_necessary(&self) -> Result<bool, ViewError> {
        let subpath = self.resolve_subpath()?;
        if self.is_installed(&subpath) {
            return Ok(false);
        }
        self.install_subpath(subpath).await?;
        Ok(true)
    }

    /// Try to navigate to an arbitrary link target.
    ///
    /// Returns `Ok(true)` iff the target falls under the managed base and a
    /// registered subpath; in that case a history entry is pushed only when
    /// the subpath actually changes, and the view is installed. `Ok(false)`
    /// means the router did nothing and the caller must not suppress the
    /// host's default navigation.
    pub async fn go(&self, href: &str) -> Result<bool, ViewError> {
        let Some(subpath) = self.subpath_of(href) else {
            return Ok(false);
        };
        if !self.is_installed(&subpath) {
            tracing::debug!(href, subpath = %subpath, "In-app navigation");
            self.page.push_history(href);
            self.install_subpath(subpath).await?;
        }
        Ok(true)
    }

    /// Host back/forward integration: reinstall for wherever the location
    /// now points.
    pub async fn handle_popstate(&self) -> Result<(), ViewError> {
        self.install().await
    }

    /// Click interception: walk up from the clicked node looking for a
    /// navigation target and hand it to [`ViewRouter::go`].
    ///
    /// Returns whether the click was handled; a handled click's default
    /// navigation must be cancelled by the caller.
    pub async fn handle_click(&self, target: &dyn NavTarget) -> Result<bool, ViewError> {
        match find_nav_href(target) {
            Some(href) => self.go(&href).await,
            None => Ok(false),
        }
    }

    fn is_installed(&self, subpath: &str) -> bool {
        matches!(&*self.phase.lock(), RouterPhase::Installed(current) if current == subpath)
    }

    fn resolve_subpath(&self) -> Result<String, ViewError> {
        let path = self.page.current_path();
        match self.subpath_of(&path) {
            Some(subpath) => Ok(subpath),
            None => {
                let subpath = path
                    .strip_prefix(&self.base)
                    .unwrap_or(path.as_str())
                    .to_string();
                Err(ViewError::UnregisteredSubpath { path, subpath })
            }
        }
    }

    fn subpath_of(&self, href: &str) -> Option<String> {
        // Absolute URLs with a scheme are never ours.
        if href.contains("://") {
            return None;
        }
        let rest = href.strip_prefix(&self.base)?;
        if !rest.starts_with('/') {
            return None;
        }
        self.registry.contains(rest).then(|| rest.to_string())
    }

    async fn install_subpath(&self, subpath: String) -> Result<(), ViewError> {
        let handler = self
            .registry
            .get(&subpath)
            .ok_or_else(|| ViewError::UnregisteredSubpath {
                path: self.page.current_path(),
                subpath: subpath.clone(),
            })?;
        *self.phase.lock() = RouterPhase::Installing(subpath.clone());
        tracing::debug!(subpath = %subpath, "Installing view");

        // Fresh mount node per install: stray listeners a previous handler
        // attached to the old node die with it.
        let mount = self.page.reset_mount();
        let title = handler.install(self.page.as_ref(), &mount, &subpath).await?;
        self.page.set_title(&title.title);

        *self.phase.lock() = RouterPhase::Installed(subpath);
        Ok(())
    }
}

fn compute_base<H: HostPage>(
    path: &str,
    registry: &ViewRegistry<H>,
) -> Result<String, ViewError> {
    // The longest matching subpath yields the shortest base.
    let mut best: Option<&str> = None;
    for subpath in registry.subpaths() {
        if path.ends_with(subpath) && best.map_or(true, |b| subpath.len() > b.len()) {
            best = Some(subpath);
        }
    }
    match best {
        Some(subpath) => Ok(path[..path.len() - subpath.len()].to_string()),
        None => Err(ViewError::NoMatchingView {
            path: path.to_string(),
        }),
    }
}

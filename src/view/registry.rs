//! Injective subpath-to-handler registry.
//!
//! Subpaths are validated at registration time: a leading `/` and a
//! restricted character set, so a registered subpath can never collide
//! with query strings, fragments or userinfo in a URL.

use std::collections::HashMap;
use std::sync::Arc;

use crate::view::error::ViewError;
use crate::view::host::HostPage;
use crate::view::ViewHandler;

/// Characters allowed in a subpath besides ASCII alphanumerics.
const EXTRA_SUBPATH_CHARS: &[char] = &['/', '-', '_', '.', '~'];

pub(crate) fn validate_subpath(subpath: &str) -> Result<(), ViewError> {
    if !subpath.starts_with('/') {
        return Err(ViewError::BadSubpath {
            subpath: subpath.to_string(),
            reason: "must start with '/'",
        });
    }
    if !subpath
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || EXTRA_SUBPATH_CHARS.contains(&c))
    {
        return Err(ViewError::BadSubpath {
            subpath: subpath.to_string(),
            reason: "contains a character outside ASCII alphanumerics and / - _ . ~",
        });
    }
    Ok(())
}

/// Mapping from subpath to view handler. Mutable while the application
/// registers its views, immutable once handed to the router.
pub struct ViewRegistry<H: HostPage> {
    views: HashMap<String, Arc<dyn ViewHandler<H>>>,
}

impl<H: HostPage> Default for ViewRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: HostPage> ViewRegistry<H> {
    pub fn new() -> Self {
        Self {
            views: HashMap::new(),
        }
    }

    /// Register `handler` under `subpath`.
    ///
    /// # Errors
    /// Fails on a malformed subpath or a duplicate registration; the
    /// registry is unchanged on error.
    pub fn register(
        &mut self,
        subpath: &str,
        handler: Arc<dyn ViewHandler<H>>,
    ) -> Result<(), ViewError> {
        validate_subpath(subpath)?;
        if self.views.contains_key(subpath) {
            return Err(ViewError::DuplicateSubpath {
                subpath: subpath.to_string(),
            });
        }
        self.views.insert(subpath.to_string(), handler);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn contains(&self, subpath: &str) -> bool {
        self.views.contains_key(subpath)
    }

    pub fn get(&self, subpath: &str) -> Option<Arc<dyn ViewHandler<H>>> {
        self.views.get(subpath).cloned()
    }

    pub fn subpaths(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(String::as_str)
    }
}

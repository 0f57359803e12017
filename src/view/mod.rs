//! Single-page view routing.
//!
//! Maps URL subpaths to pluggable view handlers, intercepts in-app
//! navigation and integrates with host history. The handler contract is the
//! only polymorphic seam: the application supplies one [`ViewHandler`] per
//! subpath, each of which populates the mount point (usually by awaiting
//! model caches) and returns the desired document title.

pub mod error;
pub mod host;
pub mod registry;
pub mod router;

use async_trait::async_trait;

use crate::view::error::ViewError;
use crate::view::host::HostPage;

/// What an installed view hands back to the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewTitle {
    pub title: String,
}

impl ViewTitle {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

/// An application-supplied unit that populates the mount point for one
/// subpath.
///
/// The mount element is freshly created and empty when `install` is called;
/// the handler owns it until the router replaces it. The call is awaited
/// before the returned title is applied, so handlers are free to fetch.
#[async_trait]
pub trait ViewHandler<H: HostPage>: Send + Sync {
    async fn install(
        &self,
        page: &H,
        mount: &H::Mount,
        subpath: &str,
    ) -> Result<ViewTitle, ViewError>;
}

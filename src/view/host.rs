//! Host-environment abstraction the router drives.
//!
//! The router never touches a concrete UI toolkit. It manipulates the page
//! through [`HostPage`] (location, history, title, mount point) and
//! inspects clicked nodes through the [`NavTarget`] capability trait.

/// The page the router owns: location, history, document title and the
/// mount point whose contents belong to the installed view.
pub trait HostPage: Send + Sync + 'static {
    /// Mount node handed to view handlers. A fresh value is produced for
    /// every install so stale event listeners die with the old node.
    type Mount: Send + Sync;

    /// Path component of the current location, without query or fragment.
    fn current_path(&self) -> String;

    /// Push a history entry for `path` without reloading.
    fn push_history(&self, path: &str);

    /// Apply the document title.
    fn set_title(&self, title: &str);

    /// Replace the mount node with a fresh empty one and return it.
    fn reset_mount(&self) -> Self::Mount;
}

/// Capability view of a clickable node: it may carry a navigation target
/// and it knows its ancestor. The router walks up this chain instead of
/// dispatching on concrete element types.
pub trait NavTarget {
    /// The link target this node carries, if it is link-like.
    fn nav_href(&self) -> Option<String>;

    /// The node's parent, if any.
    fn parent(&self) -> Option<&dyn NavTarget>;
}

/// Walk from `target` to the root, returning the first navigation href.
pub fn find_nav_href(target: &dyn NavTarget) -> Option<String> {
    let mut current = Some(target);
    while let Some(node) = current {
        if let Some(href) = node.nav_href() {
            return Some(href);
        }
        current = node.parent();
    }
    None
}

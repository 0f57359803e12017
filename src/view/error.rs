//! View routing error types.
//!
//! Everything here is fatal at its point of detection: a router with a bad
//! registration or an unresolvable location has no degraded mode to fall
//! back to, the configuration has to be fixed.

use thiserror::Error;

use crate::cache::error::CacheError;

#[derive(Debug, Error)]
pub enum ViewError {
    /// Subpath failed syntactic validation at registration.
    #[error("Subpath '{subpath}' is malformed: {reason}")]
    BadSubpath {
        subpath: String,
        reason: &'static str,
    },

    /// The subpath is already mapped to a handler.
    #[error("Subpath '{subpath}' is already registered")]
    DuplicateSubpath { subpath: String },

    /// A router cannot be built over zero registrations.
    #[error("Cannot route: no views registered")]
    EmptyRegistry,

    /// No registered subpath is a suffix of the current location.
    #[error("No registered view matches location '{path}'")]
    NoMatchingView { path: String },

    /// The location sits under the managed base but resolves to a subpath
    /// nobody registered.
    #[error("Location '{path}' resolves to unregistered subpath '{subpath}'")]
    UnregisteredSubpath { path: String, subpath: String },

    /// A view handler's populate routine failed.
    #[error("View handler failed: {0}")]
    Handler(String),
}

impl From<CacheError> for ViewError {
    fn from(err: CacheError) -> Self {
        ViewError::Handler(err.to_string())
    }
}

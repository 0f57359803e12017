//! Cache-level error types.

use thiserror::Error;

use crate::api::session::DatasetDrift;
use crate::model::EntityId;

/// Errors surfaced to callers awaiting cached data.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A completed request did not produce one or more of the requested
    /// instances. Terminal for those ids; never auto-retried.
    #[error("Download failed for '{model}' ({fields}): ids {ids:?} were not returned")]
    DownloadFailed {
        model: &'static str,
        fields: String,
        ids: Vec<EntityId>,
    },

    /// A collection snapshot request completed without producing the dump.
    #[error("Dump download failed for '{model}' ({fields})")]
    DumpFailed {
        model: &'static str,
        fields: String,
    },

    /// A reference field name did not carry an `_id`/`_ids` suffix.
    #[error("Cannot derive reference target from '{field}': expected an '_id' or '_ids' suffix")]
    BadReferenceField { field: String },

    /// The server dataset changed mid-session; only a reload helps.
    #[error(transparent)]
    Drift(#[from] DatasetDrift),
}

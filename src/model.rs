//! Entity contract shared by every API model.
//!
//! A model is an application-defined record with a numeric server-side
//! identifier and a set of attributes that arrive piecemeal, one field group
//! at a time. The cache owns all instances and is the only writer; everyone
//! else holds [`ModelRef`] handles.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};

/// Server-side primary key of a model instance.
pub type EntityId = i64;

/// Shared handle to a live model instance.
///
/// Instances are created once per identifier and updated in place as
/// responses arrive, so references held across fetches stay current.
pub type ModelRef<M> = Arc<RwLock<M>>;

/// Contract between the model cache and an application-defined entity type.
pub trait Model: Send + Sync + 'static {
    /// API path segment for this model, e.g. `"submissions"`.
    const MODEL_NAME: &'static str;

    /// Create a placeholder instance that only knows its identifier.
    ///
    /// Used for lazy creation on first reference, before any data has been
    /// fetched, so identifier-only relationships can be held pre-resolution.
    fn stub(id: EntityId) -> Self;

    /// The instance identifier.
    fn id(&self) -> EntityId;

    /// Apply a partial attribute map taken from a response instance.
    ///
    /// Keys that do not correspond to a known attribute are silently
    /// ignored; attributes absent from the map keep their current value.
    fn merge(&mut self, attrs: &Map<String, Value>);
}

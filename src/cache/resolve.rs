//! Reference resolution between model caches.
//!
//! A parent instance stores foreign keys in fields named `X_id` (single)
//! or `X_ids` (ordered list). Resolving such a field fetches the referenced
//! instances from the child type's cache and populates the sibling field
//! `X` with live references. Parents whose target field is already set are
//! skipped entirely, both when collecting ids and when assigning, so
//! resolution is idempotent and never overwrites a concurrent assignment.

use std::collections::{HashMap, HashSet};

use crate::cache::error::CacheError;
use crate::cache::ModelCache;
use crate::model::{EntityId, Model, ModelRef};

/// Identifier value(s) read from a parent's `X_id`/`X_ids` field.
#[derive(Debug, Clone)]
pub enum RefIds {
    /// Single reference; `None` for a null foreign key.
    One(Option<EntityId>),
    /// Ordered list of references.
    Many(Vec<EntityId>),
}

/// Resolved reference(s) assigned to a parent's target field.
pub enum RefAssignment<C> {
    One(ModelRef<C>),
    /// Children in the order of the source id list.
    Many(Vec<ModelRef<C>>),
}

/// String-field-driven reference access a parent type grants the resolver.
///
/// Implemented once per (parent, child) pair; field names are strings so
/// the `_id`/`_ids` suffix contract stays observable at the seam.
pub trait ResolveTarget<C: Model> {
    /// Read the identifier field named `source_field`.
    fn ref_ids(&self, source_field: &str) -> RefIds;

    /// Whether the derived target field is already populated.
    fn ref_is_set(&self, target_field: &str) -> bool;

    /// Populate the target field with resolved references.
    fn set_ref(&mut self, target_field: &str, value: RefAssignment<C>);
}

/// Derive the target field name from an identifier field name.
///
/// `author_id` and `author_ids` both resolve to `author`. Only the two
/// suffixes are supported; anything else fails.
fn target_field_name(source_field: &str) -> Result<&str, CacheError> {
    for suffix in ["_ids", "_id"] {
        if let Some(target) = source_field.strip_suffix(suffix) {
            if !target.is_empty() {
                return Ok(target);
            }
        }
    }
    Err(CacheError::BadReferenceField {
        field: source_field.to_string(),
    })
}

/// Resolve `source_field` on every parent against the child cache, using
/// field group `fields` for whatever has to be fetched.
///
/// Collects ids only from parents whose target field is still unset, issues
/// at most one bulk fetch, and assigns a single child or an ordered child
/// list per parent. A second call over the same parents fetches nothing.
pub async fn resolve_references<P, C>(
    parents: &[ModelRef<P>],
    source_field: &str,
    children: &ModelCache<C>,
    fields: &str,
) -> Result<(), CacheError>
where
    P: Model + ResolveTarget<C>,
    C: Model,
{
    let target_field = target_field_name(source_field)?;

    let mut wanted: Vec<EntityId> = Vec::new();
    let mut seen: HashSet<EntityId> = HashSet::new();
    for parent in parents {
        let parent = parent.read();
        if parent.ref_is_set(target_field) {
            continue;
        }
        match parent.ref_ids(source_field) {
            RefIds::One(Some(id)) => {
                if seen.insert(id) {
                    wanted.push(id);
                }
            }
            RefIds::One(None) => {}
            RefIds::Many(ids) => {
                for id in ids {
                    if seen.insert(id) {
                        wanted.push(id);
                    }
                }
            }
        }
    }

    if wanted.is_empty() {
        return Ok(());
    }

    tracing::debug!(
        parent = P::MODEL_NAME,
        child = C::MODEL_NAME,
        source_field,
        count = wanted.len(),
        "Resolving references"
    );
    let resolved = children.get_bulk(&wanted, fields).await?;
    let by_id: HashMap<EntityId, ModelRef<C>> = resolved
        .into_iter()
        .map(|model_ref| (model_ref.read().id(), model_ref.clone()))
        .collect();

    for parent in parents {
        let mut parent = parent.write();
        // Re-checked after the await: a parent populated by another caller
        // mid-resolution is not overwritten.
        if parent.ref_is_set(target_field) {
            continue;
        }
        match parent.ref_ids(source_field) {
            RefIds::One(Some(id)) => {
                if let Some(child) = by_id.get(&id) {
                    parent.set_ref(target_field, RefAssignment::One(child.clone()));
                }
            }
            RefIds::One(None) => {}
            RefIds::Many(ids) => {
                let refs: Vec<ModelRef<C>> = ids
                    .iter()
                    .filter_map(|id| by_id.get(id).cloned())
                    .collect();
                if refs.len() == ids.len() {
                    parent.set_ref(target_field, RefAssignment::Many(refs));
                }
            }
        }
    }
    Ok(())
}

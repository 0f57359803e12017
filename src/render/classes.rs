//! Declarative CSS class-set computation.
//!
//! Views that reflect a value set into element classes (filter chips,
//! status badges) compute the desired prefixed class set as a pure function
//! and apply the difference, instead of toggling classes imperatively.
//! Classes outside the prefix are never touched.

use std::collections::BTreeSet;

/// Compute the class set for `values` under `prefix`, e.g.
/// `class_set("tag-", ["je", "be"])` yields `{"tag-je", "tag-be"}`.
pub fn class_set<I, S>(prefix: &str, values: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| format!("{prefix}{}", v.as_ref()))
        .collect()
}

/// Class changes to apply to an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDiff {
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

impl ClassDiff {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Diff the element's current classes against a desired prefixed set.
///
/// Only classes carrying `prefix` are candidates for removal; unrelated
/// classes pass through untouched. `desired` is expected to be prefixed
/// already (see [`class_set`]).
pub fn diff_classes(
    current: &BTreeSet<String>,
    desired: &BTreeSet<String>,
    prefix: &str,
) -> ClassDiff {
    let add = desired
        .iter()
        .filter(|class| !current.contains(*class))
        .cloned()
        .collect();
    let remove = current
        .iter()
        .filter(|class| class.starts_with(prefix) && !desired.contains(*class))
        .cloned()
        .collect();
    ClassDiff { add, remove }
}

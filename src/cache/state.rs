//! Availability bookkeeping for field groups.
//!
//! Tracks, per instance and per field group (plus one slot per field group
//! for dump requests), where the data is on the
//! `NotRequested -> Pending -> {Available, NotRequested}` lattice. All
//! transitions are funneled through this table so monotonicity is enforced
//! in one place: `Available` never regresses, and `Pending -> NotRequested`
//! only happens when a completed request failed to produce the data.

use std::collections::HashMap;

use crate::model::EntityId;

/// The superset field group containing every attribute.
pub const ALL_FIELDS: &str = "*";

/// Availability of one (instance, field group) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState {
    /// Never requested, or a completed request did not yield this instance.
    NotRequested,
    /// A request covering this field group is in flight.
    Pending,
    /// Data is populated and current.
    Available,
}

#[derive(Debug, Default)]
pub struct AvailabilityTable {
    instances: HashMap<EntityId, HashMap<String, FieldState>>,
    dumps: HashMap<String, FieldState>,
}

impl AvailabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective state of an (instance, field group) pair.
    ///
    /// An instance whose `"*"` group is `Available` answers `Available` for
    /// every group: the superset covers them all and the instance is never
    /// re-fetched.
    pub fn state(&self, id: EntityId, fields: &str) -> FieldState {
        match self.raw_state(id, fields) {
            FieldState::Available => FieldState::Available,
            other => {
                if fields != ALL_FIELDS
                    && self.raw_state(id, ALL_FIELDS) == FieldState::Available
                {
                    FieldState::Available
                } else {
                    other
                }
            }
        }
    }

    fn raw_state(&self, id: EntityId, fields: &str) -> FieldState {
        self.instances
            .get(&id)
            .and_then(|groups| groups.get(fields))
            .copied()
            .unwrap_or(FieldState::NotRequested)
    }

    /// Effective state of the all-instances request for a field group.
    pub fn dump_state(&self, fields: &str) -> FieldState {
        let raw = self
            .dumps
            .get(fields)
            .copied()
            .unwrap_or(FieldState::NotRequested);
        if raw != FieldState::Available
            && fields != ALL_FIELDS
            && self.dumps.get(ALL_FIELDS).copied() == Some(FieldState::Available)
        {
            return FieldState::Available;
        }
        raw
    }

    /// Transition `NotRequested -> Pending`. Returns whether the transition
    /// happened; ids already `Pending` or `Available` are left alone, which
    /// is what makes concurrent request deduplication work.
    pub fn mark_pending(&mut self, id: EntityId, fields: &str) -> bool {
        if self.state(id, fields) != FieldState::NotRequested {
            return false;
        }
        self.set_raw(id, fields, FieldState::Pending);
        true
    }

    /// Transition to `Available`. Always an upgrade, never a downgrade.
    pub fn mark_available(&mut self, id: EntityId, fields: &str) {
        self.set_raw(id, fields, FieldState::Available);
    }

    /// Transition `Pending -> NotRequested` after a completed request did
    /// not produce the instance. A no-op for any other current state, so a
    /// dump or an earlier response can never be un-done.
    pub fn mark_missing(&mut self, id: EntityId, fields: &str) -> bool {
        if self.raw_state(id, fields) != FieldState::Pending {
            return false;
        }
        self.set_raw(id, fields, FieldState::NotRequested);
        true
    }

    pub fn mark_dump_pending(&mut self, fields: &str) -> bool {
        if self.dump_state(fields) != FieldState::NotRequested {
            return false;
        }
        self.dumps.insert(fields.to_string(), FieldState::Pending);
        true
    }

    pub fn mark_dump_available(&mut self, fields: &str) {
        self.dumps.insert(fields.to_string(), FieldState::Available);
    }

    pub fn mark_dump_missing(&mut self, fields: &str) -> bool {
        if self.dumps.get(fields).copied() != Some(FieldState::Pending) {
            return false;
        }
        self.dumps.insert(fields.to_string(), FieldState::NotRequested);
        true
    }

    /// Whether the instance has at least one `Available` field group.
    pub fn has_any_available(&self, id: EntityId) -> bool {
        self.instances
            .get(&id)
            .is_some_and(|groups| groups.values().any(|s| *s == FieldState::Available))
    }

    fn set_raw(&mut self, id: EntityId, fields: &str, state: FieldState) {
        self.instances
            .entry(id)
            .or_default()
            .insert(fields.to_string(), state);
    }
}

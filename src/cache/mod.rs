//! Client-side model cache and fetch coordination engine.
//!
//! One [`ModelCache`] per entity type serves consistent, partially-fetched
//! views of server-held instances to any number of concurrent callers while
//! issuing the minimum number of network requests. Availability is tracked
//! per (instance, field group) on a monotonic three-state lattice; callers
//! park on a generation counter and re-check their own completion condition
//! after every ingested response.

pub mod error;
pub mod resolve;
pub mod state;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{broadcast, watch};

use crate::api::session::DataSession;
use crate::api::transport::FetchTransport;
use crate::api::{ApiPacket, IdSelector};
use crate::cache::error::CacheError;
use crate::cache::state::{AvailabilityTable, FieldState};
use crate::model::{EntityId, Model, ModelRef};

/// Broadcast after every ingested response or data injection, naming the
/// instances that changed and the field group involved.
#[derive(Debug, Clone)]
pub struct UpdateEvent {
    pub ids: Vec<EntityId>,
    pub fields: String,
}

/// A registered `do_once_for_each` action plus the instances queued for it.
struct VisitorHandle<M: Model> {
    action: Mutex<Box<dyn FnMut(&ModelRef<M>) + Send>>,
    /// Instances waiting for the action. Drained only by whoever holds the
    /// action lock; everyone else just queues.
    pending: Mutex<Vec<ModelRef<M>>>,
}

impl<M: Model> VisitorHandle<M> {
    /// Queue `fresh` and run the action unless it is already running.
    ///
    /// The action lock is taken with `try_lock`: an action that calls back
    /// into the cache re-enters dispatch on its own thread, finds the lock
    /// held, leaves the new instances in the queue and returns. The outer
    /// invocation keeps draining until the queue stays empty, so callbacks
    /// into the cache never deadlock and never lose a visit.
    fn dispatch(&self, fresh: Vec<ModelRef<M>>) {
        self.pending.lock().extend(fresh);
        loop {
            {
                let Some(mut action) = self.action.try_lock() else {
                    return;
                };
                loop {
                    let batch: Vec<ModelRef<M>> = std::mem::take(&mut *self.pending.lock());
                    if batch.is_empty() {
                        break;
                    }
                    for model_ref in &batch {
                        (action)(model_ref);
                    }
                }
            }
            // A dispatcher that queued while the action ran bailed on the
            // held lock; that work is now ours. Re-check with the lock free.
            if self.pending.lock().is_empty() {
                return;
            }
        }
    }
}

/// A `do_once_for_each` registration: the action plus the ids it has
/// already been invoked for.
struct Visitor<M: Model> {
    handle: Arc<VisitorHandle<M>>,
    visited: HashSet<EntityId>,
}

struct CacheInner<M: Model> {
    /// Entity store: append-only map from id to live instance.
    store: HashMap<EntityId, ModelRef<M>>,
    availability: AvailabilityTable,
    visitors: Vec<Visitor<M>>,
}

impl<M: Model> CacheInner<M> {
    /// Get or lazily create the instance for `id`.
    fn instance(&mut self, id: EntityId) -> ModelRef<M> {
        self.store
            .entry(id)
            .or_insert_with(|| Arc::new(parking_lot::RwLock::new(M::stub(id))))
            .clone()
    }
}

struct CacheShared<M: Model> {
    transport: Arc<dyn FetchTransport>,
    session: DataSession,
    inner: Mutex<CacheInner<M>>,
    /// Generation counter bumped on every update; parked waiters watch it
    /// and re-evaluate their own predicate on each bump.
    update_gen: watch::Sender<u64>,
    events: broadcast::Sender<UpdateEvent>,
}

/// Per-entity-type cache. Cheap to clone; clones share all state.
pub struct ModelCache<M: Model> {
    shared: Arc<CacheShared<M>>,
}

impl<M: Model> Clone for ModelCache<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

enum Collect<M: Model> {
    Ready(Vec<ModelRef<M>>),
    Waiting,
    Failed(Vec<EntityId>),
}

impl<M: Model> ModelCache<M> {
    pub fn new(transport: Arc<dyn FetchTransport>, session: DataSession) -> Self {
        let (update_gen, _) = watch::channel(0u64);
        let (events, _) = broadcast::channel(64);
        Self {
            shared: Arc::new(CacheShared {
                transport,
                session,
                inner: Mutex::new(CacheInner {
                    store: HashMap::new(),
                    availability: AvailabilityTable::new(),
                    visitors: Vec::new(),
                }),
                update_gen,
                events,
            }),
        }
    }

    /// The session this cache validates its responses against.
    pub fn session(&self) -> &DataSession {
        &self.shared.session
    }

    /// Get or lazily create the instance for `id`, fetched or not.
    ///
    /// Lets identifier-only relationships hold a live reference before any
    /// data arrives; the instance is updated in place once it does.
    pub fn instance(&self, id: EntityId) -> ModelRef<M> {
        self.shared.inner.lock().instance(id)
    }

    /// Availability of one (instance, field group) pair.
    pub fn field_state(&self, id: EntityId, fields: &str) -> FieldState {
        self.shared.inner.lock().availability.state(id, fields)
    }

    /// Subscribe to update notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<UpdateEvent> {
        self.shared.events.subscribe()
    }

    /// Fetch a single instance; see [`ModelCache::get_bulk`].
    pub async fn get(&self, id: EntityId, fields: &str) -> Result<ModelRef<M>, CacheError> {
        let refs = self.get_bulk(&[id], fields).await?;
        Ok(refs
            .into_iter()
            .next()
            .expect("get_bulk returned empty result for a one-id request"))
    }

    /// Return one instance per requested id once `fields` is available for
    /// all of them, fetching whatever is missing.
    ///
    /// Suspends until every id is `Available`; fails with
    /// [`CacheError::DownloadFailed`] naming the ids whose request completed
    /// without producing them. Returns immediately when everything is
    /// already available. Result order is unspecified.
    pub async fn get_bulk(
        &self,
        ids: &[EntityId],
        fields: &str,
    ) -> Result<Vec<ModelRef<M>>, CacheError> {
        // Subscribe before checking so an update landing between the check
        // and the await is never lost.
        let mut updates = self.shared.update_gen.subscribe();
        self.download(ids, fields);
        loop {
            self.shared.session.ensure_consistent()?;
            match self.try_collect(ids, fields) {
                Collect::Ready(refs) => return Ok(refs),
                Collect::Failed(missing) => {
                    return Err(CacheError::DownloadFailed {
                        model: M::MODEL_NAME,
                        fields: fields.to_string(),
                        ids: missing,
                    })
                }
                Collect::Waiting => {}
            }
            updates
                .changed()
                .await
                .expect("cache update channel closed while cache alive");
        }
    }

    /// Return the entire collection once a dump with `fields` is available.
    ///
    /// Fails with [`CacheError::DumpFailed`] if the dump request completed
    /// without producing a snapshot.
    pub async fn get_all(&self, fields: &str) -> Result<Vec<ModelRef<M>>, CacheError> {
        let mut updates = self.shared.update_gen.subscribe();
        self.download_all(fields);
        loop {
            self.shared.session.ensure_consistent()?;
            {
                let inner = self.shared.inner.lock();
                match inner.availability.dump_state(fields) {
                    FieldState::Available => {
                        return Ok(inner
                            .store
                            .iter()
                            .filter(|(id, _)| {
                                inner.availability.state(**id, fields) == FieldState::Available
                            })
                            .map(|(_, model_ref)| model_ref.clone())
                            .collect());
                    }
                    // `download_all` marked it Pending before we first got
                    // here, so NotRequested means the request failed.
                    FieldState::NotRequested => {
                        return Err(CacheError::DumpFailed {
                            model: M::MODEL_NAME,
                            fields: fields.to_string(),
                        })
                    }
                    FieldState::Pending => {}
                }
            }
            updates
                .changed()
                .await
                .expect("cache update channel closed while cache alive");
        }
    }

    /// Fire-and-forget fetch of `ids` with field group `fields`.
    ///
    /// Deduplication is synchronous: ids already `Pending` or `Available`
    /// are skipped, and the rest are marked `Pending` before this returns,
    /// so concurrent callers observe the in-flight state and never
    /// double-request. At most one network call is issued per batch.
    pub fn download(&self, ids: &[EntityId], fields: &str) {
        // A drifted session never fetches again; waiters fail on the latched
        // drift instead.
        if self.shared.session.ensure_consistent().is_err() {
            return;
        }
        let batch: Vec<EntityId> = {
            let mut inner = self.shared.inner.lock();
            ids.iter()
                .copied()
                .filter(|&id| inner.availability.mark_pending(id, fields))
                .collect()
        };
        if batch.is_empty() {
            return;
        }
        tracing::debug!(
            model = M::MODEL_NAME,
            fields,
            count = batch.len(),
            "Issuing batch download"
        );
        let cache = self.clone();
        let fields = fields.to_string();
        tokio::spawn(async move {
            cache.run_fetch(IdSelector::Ids(batch), fields).await;
        });
    }

    /// Fire-and-forget fetch of the entire collection.
    pub fn download_all(&self, fields: &str) {
        if self.shared.session.ensure_consistent().is_err() {
            return;
        }
        let fresh = self
            .shared
            .inner
            .lock()
            .availability
            .mark_dump_pending(fields);
        if !fresh {
            return;
        }
        tracing::debug!(model = M::MODEL_NAME, fields, "Issuing dump download");
        let cache = self.clone();
        let fields = fields.to_string();
        tokio::spawn(async move {
            cache.run_fetch(IdSelector::All, fields).await;
        });
    }

    /// Ingest an externally-sourced packet (e.g. data embedded in the
    /// initial page) as though it came from a successful fetch.
    pub fn add_data(&self, packet: &ApiPacket, fields: &str) -> Result<(), CacheError> {
        self.ingest(packet, fields, &IdSelector::Ids(Vec::new()))
    }

    /// Invoke `action` once for every instance that has, or later acquires,
    /// at least one available field group.
    ///
    /// Fires retroactively for instances already known, then incrementally
    /// as new ones arrive. Each instance is visited at most once per
    /// registered action, tracked by id; later updates to a visited
    /// instance do not re-invoke it.
    pub fn do_once_for_each<F>(&self, action: F)
    where
        F: FnMut(&ModelRef<M>) + Send + 'static,
    {
        let handle = Arc::new(VisitorHandle {
            action: Mutex::new(Box::new(action)),
            pending: Mutex::new(Vec::new()),
        });
        // Snapshot the backlog and register the visitor under one lock so an
        // interleaved ingest can neither be missed nor double-visit.
        let backlog: Vec<ModelRef<M>> = {
            let mut inner = self.shared.inner.lock();
            let mut visited = HashSet::new();
            let mut backlog = Vec::new();
            for (&id, model_ref) in &inner.store {
                if inner.availability.has_any_available(id) {
                    visited.insert(id);
                    backlog.push(model_ref.clone());
                }
            }
            inner.visitors.push(Visitor {
                handle: handle.clone(),
                visited,
            });
            backlog
        };
        handle.dispatch(backlog);
    }

    async fn run_fetch(&self, selector: IdSelector, fields: String) {
        match self
            .shared
            .transport
            .fetch(M::MODEL_NAME, &selector, &fields)
            .await
        {
            Ok(packet) => {
                if let Err(err) = self.ingest(&packet, &fields, &selector) {
                    tracing::error!(
                        model = M::MODEL_NAME,
                        fields = %fields,
                        error = %err,
                        "Failed to ingest response packet"
                    );
                }
            }
            Err(err) => {
                tracing::error!(
                    model = M::MODEL_NAME,
                    fields = %fields,
                    error = %err,
                    "Transport failure, rejecting waiters for the batch"
                );
                self.fail_batch(&selector, &fields);
            }
        }
    }

    /// Move an entire batch to `NotRequested` and wake waiters, so a failed
    /// request rejects every caller suspended on it instead of leaving them
    /// parked forever.
    fn fail_batch(&self, selector: &IdSelector, fields: &str) {
        let failed_ids = {
            let mut inner = self.shared.inner.lock();
            match selector {
                IdSelector::Ids(ids) => {
                    for &id in ids {
                        inner.availability.mark_missing(id, fields);
                    }
                    ids.clone()
                }
                IdSelector::All => {
                    inner.availability.mark_dump_missing(fields);
                    Vec::new()
                }
            }
        };
        self.notify(UpdateEvent {
            ids: failed_ids,
            fields: fields.to_string(),
        });
    }

    fn ingest(
        &self,
        packet: &ApiPacket,
        fields: &str,
        requested: &IdSelector,
    ) -> Result<(), CacheError> {
        if let Err(drift) = self.shared.session.observe(&packet.last_modified) {
            // The dataset changed under us. Fail the batch so no waiter
            // hangs, then surface the fatal error.
            self.fail_batch(requested, fields);
            return Err(drift.into());
        }

        let mut ingested: Vec<EntityId> = Vec::new();
        let mut visits: Vec<(Arc<VisitorHandle<M>>, Vec<ModelRef<M>>)> = Vec::new();
        {
            let mut inner = self.shared.inner.lock();
            for attrs in &packet.instances {
                let Some(id) = attrs.get("id").and_then(Value::as_i64) else {
                    tracing::warn!(
                        model = M::MODEL_NAME,
                        "Response instance without a numeric 'id', skipping"
                    );
                    continue;
                };
                let model_ref = inner.instance(id);
                model_ref.write().merge(attrs);
                inner.availability.mark_available(id, fields);
                ingested.push(id);
            }

            if packet.dump {
                inner.availability.mark_dump_available(fields);
            }

            if let IdSelector::Ids(requested_ids) = requested {
                for &id in requested_ids {
                    if !ingested.contains(&id) && inner.availability.mark_missing(id, fields) {
                        tracing::warn!(
                            model = M::MODEL_NAME,
                            id,
                            fields,
                            "Requested id missing from response"
                        );
                    }
                }
            }

            let CacheInner {
                store, visitors, ..
            } = &mut *inner;
            for visitor in visitors.iter_mut() {
                let mut fresh = Vec::new();
                for &id in &ingested {
                    if visitor.visited.insert(id) {
                        if let Some(model_ref) = store.get(&id) {
                            fresh.push(model_ref.clone());
                        }
                    }
                }
                if !fresh.is_empty() {
                    visits.push((visitor.handle.clone(), fresh));
                }
            }
        }

        // Visitor actions run outside the state lock; they are free to call
        // back into the cache (reentrant calls queue through the handle).
        for (handle, refs) in visits {
            handle.dispatch(refs);
        }

        tracing::debug!(
            model = M::MODEL_NAME,
            fields,
            count = ingested.len(),
            dump = packet.dump,
            "Ingested packet"
        );
        self.notify(UpdateEvent {
            ids: ingested,
            fields: fields.to_string(),
        });
        Ok(())
    }

    fn notify(&self, event: UpdateEvent) {
        // No subscribers is fine for the public event stream.
        let _ = self.shared.events.send(event);
        self.shared.update_gen.send_modify(|generation| *generation += 1);
    }

    fn try_collect(&self, ids: &[EntityId], fields: &str) -> Collect<M> {
        let mut inner = self.shared.inner.lock();
        let mut seen = HashSet::new();
        let mut refs = Vec::new();
        let mut failed = Vec::new();
        let mut waiting = false;
        for &id in ids {
            if !seen.insert(id) {
                continue;
            }
            match inner.availability.state(id, fields) {
                FieldState::Available => {
                    let model_ref = inner.instance(id);
                    refs.push(model_ref);
                }
                FieldState::Pending => waiting = true,
                // We marked every id Pending before the first check, so
                // NotRequested here means its request completed without it.
                FieldState::NotRequested => failed.push(id),
            }
        }
        if !failed.is_empty() {
            Collect::Failed(failed)
        } else if waiting {
            Collect::Waiting
        } else {
            Collect::Ready(refs)
        }
    }
}

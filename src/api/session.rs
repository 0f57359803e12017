//! Session-wide dataset consistency tracking.
//!
//! Every successful response carries a `last_modified` stamp identifying the
//! server dataset version. The first observed stamp becomes the session
//! baseline; any later stamp that differs means the server data changed
//! under a live client. The cache refuses to reconcile that incrementally:
//! the session latches a drift error, fires the injected reload hook once,
//! and every subsequent wait fails until the client restarts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

/// Fatal consistency violation: the server dataset changed mid-session.
#[derive(Debug, Clone, Error)]
#[error("Server dataset changed mid-session (baseline '{baseline}', observed '{observed}'); full reload required")]
pub struct DatasetDrift {
    pub baseline: String,
    pub observed: String,
}

/// Action the host environment takes when drift is detected, typically a
/// full page reload. Invoked at most once per session.
pub type ReloadHook = Box<dyn Fn() + Send + Sync>;

/// Shared consistency context for all model caches of one client session.
///
/// Explicit state rather than a process-wide singleton, so tests can create
/// and discard sessions freely.
#[derive(Clone)]
pub struct DataSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    baseline: Mutex<Option<String>>,
    drift: Mutex<Option<DatasetDrift>>,
    reload_fired: AtomicBool,
    reload: ReloadHook,
}

impl DataSession {
    /// Create a session with a drift reaction hook.
    pub fn new(reload: ReloadHook) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                baseline: Mutex::new(None),
                drift: Mutex::new(None),
                reload_fired: AtomicBool::new(false),
                reload,
            }),
        }
    }

    /// Create a session whose drift reaction only logs.
    pub fn detached() -> Self {
        Self::new(Box::new(|| {
            tracing::error!("Dataset drift detected but no reload hook is installed");
        }))
    }

    /// Record the `last_modified` stamp of a successful response.
    ///
    /// The first call establishes the baseline. A mismatching stamp latches
    /// the session into the drifted state and fires the reload hook exactly
    /// once, no matter how many responses observe the mismatch.
    pub fn observe(&self, last_modified: &str) -> Result<(), DatasetDrift> {
        // A drifted session stays failed even if a later stamp matches the
        // baseline again; only a restart clears it.
        self.ensure_consistent()?;
        let mut baseline = self.inner.baseline.lock();
        match baseline.as_deref() {
            None => {
                tracing::debug!(last_modified, "Dataset baseline established");
                *baseline = Some(last_modified.to_string());
                Ok(())
            }
            Some(b) if b == last_modified => Ok(()),
            Some(b) => {
                let drift = DatasetDrift {
                    baseline: b.to_string(),
                    observed: last_modified.to_string(),
                };
                drop(baseline);
                self.latch(drift.clone());
                Err(drift)
            }
        }
    }

    /// Fail fast if the session has already observed drift.
    pub fn ensure_consistent(&self) -> Result<(), DatasetDrift> {
        match &*self.inner.drift.lock() {
            Some(drift) => Err(drift.clone()),
            None => Ok(()),
        }
    }

    /// The latched drift, if any.
    pub fn drift(&self) -> Option<DatasetDrift> {
        self.inner.drift.lock().clone()
    }

    fn latch(&self, drift: DatasetDrift) {
        {
            let mut latched = self.inner.drift.lock();
            if latched.is_none() {
                *latched = Some(drift.clone());
            }
        }
        if !self.inner.reload_fired.swap(true, Ordering::SeqCst) {
            tracing::error!(
                baseline = %drift.baseline,
                observed = %drift.observed,
                "Dataset drift detected, triggering reload"
            );
            (self.inner.reload)();
        }
    }
}

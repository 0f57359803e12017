//! KenDB3 browser-side runtime.
//!
//! The autonomous frontend engine of the KenDB3 submissions database:
//! server-rendered pages hand over to this runtime, which fetches
//! structured data through the data manager API and re-renders views
//! without full page loads.
//!
//! Two cores:
//!
//! - [`cache::ModelCache`] — per-entity-type model cache and fetch
//!   coordinator: tracks availability per field group, deduplicates
//!   concurrent requests, resolves relational references lazily and detects
//!   server-side dataset changes.
//! - [`view::router::ViewRouter`] — single-page view routing: maps URL
//!   subpaths to pluggable view handlers, intercepts in-app navigation and
//!   integrates with host history.
//!
//! Everything host-specific (DOM, history, clicks, templates) sits behind
//! traits in [`view::host`] and [`render`], so the engine is testable
//! without a browser.

pub mod api;
pub mod cache;
pub mod model;
pub mod render;
pub mod view;

pub use api::session::DataSession;
pub use api::transport::{FetchTransport, HttpTransport};
pub use api::{ApiPacket, IdSelector, InjectedPacket};
pub use cache::error::CacheError;
pub use cache::resolve::{resolve_references, RefAssignment, RefIds, ResolveTarget};
pub use cache::state::{FieldState, ALL_FIELDS};
pub use cache::{ModelCache, UpdateEvent};
pub use model::{EntityId, Model, ModelRef};
pub use view::error::ViewError;
pub use view::host::{HostPage, NavTarget};
pub use view::registry::ViewRegistry;
pub use view::router::{RouterPhase, ViewRouter};
pub use view::{ViewHandler, ViewTitle};

use tracing_subscriber::EnvFilter;

/// Initialize tracing with env-filter support.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();
}

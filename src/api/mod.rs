//! Wire protocol types for the KenDB3 data manager API.
//!
//! The backend exposes one endpoint per model:
//! `GET {base_url}/{model}/?ids=<csv|all>&fields=<group>`, answering with an
//! envelope `{"status": "OK", "payload": {...}}`. Failures carry the error
//! message in `status` and a null payload.

pub mod error;
pub mod session;
pub mod transport;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::EntityId;

/// A successful response payload: a batch of serialized instances plus the
/// dataset version stamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiPacket {
    /// Serialized instances; each carries at least an `id` attribute.
    pub instances: Vec<Map<String, Value>>,
    /// Dataset version stamp; identical across responses unless the server
    /// data changed mid-session.
    pub last_modified: String,
    /// True iff this packet is a complete collection snapshot.
    pub dump: bool,
}

/// The response envelope as sent by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    /// `"OK"` on success, a human-readable message otherwise.
    pub status: String,
    pub payload: Option<ApiPacket>,
}

/// Which instances a fetch asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdSelector {
    /// A specific id batch, encoded as comma-separated values.
    Ids(Vec<EntityId>),
    /// The entire collection, encoded as the literal `all`.
    All,
}

impl IdSelector {
    /// Value for the `ids` query parameter.
    pub fn to_query(&self) -> String {
        match self {
            IdSelector::Ids(ids) => ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(","),
            IdSelector::All => "all".to_string(),
        }
    }
}

/// A packet embedded in a server-rendered page, targeted at one model cache.
///
/// Pages pre-seed caches by emitting a JSON array of these; the application
/// feeds each packet to the matching cache's `add_data` so the first render
/// needs no fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct InjectedPacket {
    /// Model name the packet belongs to.
    pub model: String,
    /// Field group the instances were serialized with.
    pub fields: String,
    pub packet: ApiPacket,
}

/// Parse the page-embedded injection array.
pub fn parse_injected_packets(json: &str) -> Result<Vec<InjectedPacket>, serde_json::Error> {
    serde_json::from_str(json)
}

//! Fetch transport: how packets get from the backend into the runtime.
//!
//! The cache only knows the [`FetchTransport`] trait; [`HttpTransport`] is
//! the production implementation speaking the data manager protocol over
//! reqwest. Tests substitute scripted transports.

use async_trait::async_trait;
use reqwest::Client;

use crate::api::error::TransportError;
use crate::api::{ApiPacket, ApiResponse, IdSelector};

/// A client capable of fetching one packet per call.
#[async_trait]
pub trait FetchTransport: Send + Sync {
    /// Fetch the given instances of `model`, serialized with field group
    /// `fields`.
    async fn fetch(
        &self,
        model: &str,
        ids: &IdSelector,
        fields: &str,
    ) -> Result<ApiPacket, TransportError>;
}

/// HTTP implementation of the data manager protocol.
///
/// Issues `GET {base_url}/{model}/?ids=...&fields=...` and unwraps the
/// response envelope.
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport rooted at `base_url` (e.g. `https://host/api/v0`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .build()
            .expect("Failed to build API client");
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }
}

#[async_trait]
impl FetchTransport for HttpTransport {
    async fn fetch(
        &self,
        model: &str,
        ids: &IdSelector,
        fields: &str,
    ) -> Result<ApiPacket, TransportError> {
        let url = format!("{}/{}/", self.base_url, model);
        tracing::debug!(%url, ids = %ids.to_query(), fields, "Fetching packet");

        let response = self
            .client
            .get(&url)
            .query(&[("ids", ids.to_query().as_str()), ("fields", fields)])
            .send()
            .await
            .map_err(|source| TransportError::Connection {
                model: model.to_string(),
                source,
            })?;

        let code = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| TransportError::Connection {
                model: model.to_string(),
                source,
            })?;

        let envelope: ApiResponse = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(err) => {
                // A non-success status with an unreadable body is still an
                // API failure; report the status code rather than the parse.
                if !code.is_success() {
                    return Err(TransportError::Api {
                        model: model.to_string(),
                        code: code.as_u16(),
                        message: "<unreadable body>".to_string(),
                    });
                }
                return Err(TransportError::MalformedBody {
                    model: model.to_string(),
                    reason: err.to_string(),
                });
            }
        };

        if !code.is_success() || envelope.status != "OK" {
            return Err(TransportError::Api {
                model: model.to_string(),
                code: code.as_u16(),
                message: envelope.status,
            });
        }

        envelope
            .payload
            .ok_or_else(|| TransportError::MalformedBody {
                model: model.to_string(),
                reason: "successful response without payload".to_string(),
            })
    }
}

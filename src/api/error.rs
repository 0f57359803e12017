//! Transport-level error types.

use thiserror::Error;

/// Errors produced while talking to the backend API.
///
/// All of these are terminal for the request that hit them: there is no
/// retry or backoff inside the runtime. The cache converts a failed batch
/// into rejections for every caller waiting on it.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request never produced a response.
    #[error("Connection failed for '{model}': {source}")]
    Connection {
        model: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("API request for '{model}' failed with HTTP {code}: {message}")]
    Api {
        model: String,
        code: u16,
        message: String,
    },

    /// The response body was not a valid API envelope.
    #[error("Malformed response body for '{model}': {reason}")]
    MalformedBody { model: String, reason: String },
}

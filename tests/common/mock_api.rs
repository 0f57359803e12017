//! Mock data manager API server for HTTP transport tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;

/// A captured API request for assertions.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub model: String,
    pub params: HashMap<String, String>,
}

/// A queued response: HTTP status plus raw body.
#[derive(Debug, Clone)]
pub struct QueuedResponse {
    pub status: u16,
    pub body: String,
}

impl QueuedResponse {
    /// A successful envelope around a payload.
    pub fn ok(instances: serde_json::Value, last_modified: &str, dump: bool) -> Self {
        let body = serde_json::json!({
            "status": "OK",
            "payload": {
                "instances": instances,
                "last_modified": last_modified,
                "dump": dump,
            }
        });
        Self {
            status: 200,
            body: body.to_string(),
        }
    }

    /// A failure envelope as the backend emits it.
    pub fn failure(status: u16, message: &str) -> Self {
        let body = serde_json::json!({"status": message, "payload": null});
        Self {
            status,
            body: body.to_string(),
        }
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }
}

#[derive(Clone)]
struct MockState {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    responses: Arc<Mutex<VecDeque<QueuedResponse>>>,
}

/// Mock API server answering `GET /{model}/` from a response queue.
pub struct MockApi {
    pub addr: SocketAddr,
    state: MockState,
}

impl MockApi {
    pub async fn start() -> Self {
        let state = MockState {
            requests: Arc::new(Mutex::new(Vec::new())),
            responses: Arc::new(Mutex::new(VecDeque::new())),
        };

        let app = Router::new()
            .route("/{model}/", get(serve_model))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock API server");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn queue(&self, response: QueuedResponse) {
        self.state.responses.lock().push_back(response);
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.state.requests.lock().clone()
    }
}

async fn serve_model(
    State(state): State<MockState>,
    Path(model): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.requests.lock().push(CapturedRequest { model, params });

    let queued = state
        .responses
        .lock()
        .pop_front()
        .unwrap_or_else(|| QueuedResponse::failure(500, "MockApi: no queued response"));

    (
        StatusCode::from_u16(queued.status).expect("invalid queued status"),
        [(header::CONTENT_TYPE, "application/json")],
        queued.body,
    )
        .into_response()
}

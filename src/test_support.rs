//! In-process webhook endpoint for exercising the notifier.

use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::routing::post;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Status(u16),
    /// Accepts the request and then never answers.
    Silent,
}

pub struct StubServer {
    pub url: String,
    pub requests: mpsc::UnboundedReceiver<CapturedRequest>,
}

#[derive(Clone)]
struct StubState {
    reply: Reply,
    requests: mpsc::UnboundedSender<CapturedRequest>,
}

pub async fn spawn_stub(reply: Reply) -> StubServer {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = Router::new()
        .route("/trigger/{event}/with/key/{key}", post(capture))
        .with_state(StubState {
            reply,
            requests: tx,
        });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubServer {
        url: format!("http://{addr}/trigger/uno-q-presence/with/key/test-key"),
        requests: rx,
    }
}

/// A URL nothing is listening on.
pub async fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/trigger/uno-q-presence/with/key/test-key")
}

async fn capture(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let _ = state.requests.send(CapturedRequest {
        method,
        path: uri.path().to_string(),
        headers,
        body,
    });

    match state.reply {
        Reply::Status(status) => StatusCode::from_u16(status).unwrap(),
        Reply::Silent => {
            tokio::time::sleep(Duration::from_secs(60)).await;
            StatusCode::OK
        }
    }
}

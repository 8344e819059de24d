//! Mock imagery provider and SSE reader for skydesk integration tests

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use futures::stream::{BoxStream, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uplink_conf::SkydeskConfig;

pub const API_KEY: &str = "sk-test-key";

/// One request as the provider saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub api_key: Option<String>,
    pub body: Value,
}

/// Records every request and answers with canned provider responses.
#[derive(Clone, Default)]
pub struct MockUpstream {
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockUpstream {
    /// Serve on an ephemeral localhost port.
    pub async fn start() -> (Self, SocketAddr) {
        let mock = Self::default();
        let app = Router::new().fallback(respond).with_state(mock.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (mock, addr)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last(&self) -> Recorded {
        self.requests().pop().expect("no upstream request recorded")
    }
}

async fn respond(
    State(mock): State<MockUpstream>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    mock.requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        api_key: headers
            .get("x-skyfi-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    match (method.as_str(), segments.as_slice()) {
        ("POST", ["feasibility"]) => Json(json!({ "id": "feas-1", "opportunities": [] })).into_response(),
        ("POST", ["feasibility", "pass-prediction"]) => {
            Json(json!({ "passes": [{ "satellite": "SAT-1" }] })).into_response()
        }
        ("POST", ["orders"]) => (
            StatusCode::CREATED,
            Json(json!({ "orderId": "ord-1", "status": "CREATED" })),
        )
            .into_response(),
        ("GET", ["orders"]) => Json(json!({ "orders": [], "total": 0 })).into_response(),
        ("GET", ["orders", "ord-missing"]) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "order not found" })),
        )
            .into_response(),
        ("GET", ["orders", id]) => Json(json!({ "orderId": id, "status": "DELIVERED" })).into_response(),
        ("POST", ["notifications"]) => Json(json!({ "id": "ntf-1" })).into_response(),
        ("GET", ["notifications"]) => Json(json!({ "notifications": [] })).into_response(),
        ("DELETE", ["notifications", _]) => StatusCode::NO_CONTENT.into_response(),
        _ => (StatusCode::NOT_FOUND, "no such route").into_response(),
    }
}

/// Gateway config pointing at the mock, on an OS-assigned localhost port.
pub fn config_for(upstream: SocketAddr) -> SkydeskConfig {
    let mut config = SkydeskConfig::default();
    config.server.host = "127.0.0.1".into();
    config.server.port = 0;
    config.upstream.base_url = format!("http://{}", upstream);
    config.upstream.api_key = API_KEY.into();
    config.upstream.timeout_secs = 5;
    config
}

/// Reads `(event, data)` pairs off an SSE response.
pub struct SseReader {
    stream: BoxStream<'static, reqwest::Result<Bytes>>,
    buffer: String,
}

impl SseReader {
    pub fn new(response: reqwest::Response) -> Self {
        Self {
            stream: response.bytes_stream().boxed(),
            buffer: String::new(),
        }
    }

    /// Next `(event, data)`, skipping keep-alive comments.
    pub async fn next(&mut self) -> (String, String) {
        loop {
            if let Some(pos) = self.buffer.find("\n\n") {
                let block: String = self.buffer.drain(..pos + 2).collect();
                let mut event = String::from("message");
                let mut data = Vec::new();
                for line in block.lines() {
                    if let Some(rest) = line.strip_prefix("event:") {
                        event = rest.trim().to_string();
                    } else if let Some(rest) = line.strip_prefix("data:") {
                        data.push(rest.trim_start().to_string());
                    }
                }
                if !data.is_empty() {
                    return (event, data.join("\n"));
                }
                continue;
            }
            let chunk = tokio::time::timeout(Duration::from_secs(5), self.stream.next())
                .await
                .expect("timed out waiting for SSE event")
                .expect("SSE stream ended")
                .expect("SSE stream error");
            self.buffer.push_str(&String::from_utf8_lossy(&chunk));
        }
    }
}

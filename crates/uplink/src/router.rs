//! Request Router
//!
//! | Method  | Path         | Action                                 |
//! |---------|--------------|----------------------------------------|
//! | GET     | health path  | health snapshot                        |
//! | OPTIONS | any          | 204 with CORS headers                  |
//! | GET     | sse path     | open a session                         |
//! | POST    | message path | deliver to `sessionId`, 202            |
//! | *       | *            | 404 `{"error":"not found"}`            |

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::{LifecycleError, SessionError};
use crate::transport::{message_handler, sse_handler, McpState};

const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const ALLOW_HEADERS: &str = "content-type, authorization, mcp-session-id, mcp-protocol-version";

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({ "error": self.to_string(), "kind": self.kind() });
        (status, Json(body)).into_response()
    }
}

/// Build the axum Router for one server instance.
///
/// Fails when the configured CORS origin is not a valid header value.
pub fn router(state: Arc<McpState>) -> Result<Router, LifecycleError> {
    let config = state.config.clone();
    let cors = CorsHeaders::new(&config.cors_allow_origin)?;

    Ok(Router::new()
        .route(
            &config.health_path,
            get(health_handler).fallback(not_found),
        )
        .route(&config.sse_path, get(sse_handler).fallback(not_found))
        .route(
            &config.message_path,
            post(message_handler).fallback(not_found),
        )
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn_with_state(cors, cors_middleware)))
}

async fn health_handler(State(state): State<Arc<McpState>>) -> impl IntoResponse {
    Json(state.health())
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" })))
}

#[derive(Clone)]
struct CorsHeaders {
    allow_origin: HeaderValue,
}

impl CorsHeaders {
    fn new(origin: &str) -> Result<Self, LifecycleError> {
        let allow_origin = HeaderValue::from_str(origin).map_err(|_| {
            LifecycleError::InvalidConfig(format!(
                "cors_allow_origin {:?} is not a valid header value",
                origin
            ))
        })?;
        Ok(Self { allow_origin })
    }
}

/// Answers every OPTIONS request itself and stamps the allow-origin header on
/// everything else.
async fn cors_middleware(State(cors): State<CorsHeaders>, request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        let headers = response.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, cors.allow_origin.clone());
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
        return response;
    }

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, cors.allow_origin);
    response
        .headers_mut()
        .insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, HeaderValue::from_static("mcp-session-id"));
    response
}

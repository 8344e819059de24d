//! SSE Handler
//!
//! Handles GET requests on the SSE path: opens a session and streams its
//! frames until either side closes.

use axum::{
    extract::State,
    http::{HeaderName, HeaderValue},
    response::{
        sse::{KeepAlive, Sse},
        IntoResponse, Response,
    },
};
use std::sync::Arc;

use super::McpState;
use crate::error::SessionError;

pub const SESSION_ID_HEADER: HeaderName = HeaderName::from_static("mcp-session-id");

/// Open a session.
///
/// 1. Allocate and register the session
/// 2. Send the endpoint event with the POST URL
/// 3. Keep the connection alive with comment pings
///
/// The stream ends when the session closes; a client disconnect closes the
/// session.
#[tracing::instrument(skip(state), fields(session_id = tracing::field::Empty))]
pub async fn sse_handler(State(state): State<Arc<McpState>>) -> Result<Response, SessionError> {
    let stream = state.open()?;
    let session_id = stream.id().to_string();
    tracing::Span::current().record("session_id", session_id.as_str());
    tracing::info!("SSE connection established");

    let keep_alive = KeepAlive::new()
        .interval(state.config.keep_alive)
        .text("ping");
    let mut response = Sse::new(stream.into_events())
        .keep_alive(keep_alive)
        .into_response();

    if let Ok(value) = HeaderValue::from_str(&session_id) {
        response.headers_mut().insert(SESSION_ID_HEADER, value);
    }
    Ok(response)
}

//! Message Handler
//!
//! Handles POST requests on the message path. The body is queued on the
//! session; the response to it arrives later on the SSE stream.

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::McpState;
use crate::error::SessionError;

/// Query parameters for the message endpoint.
#[derive(Debug, Deserialize)]
pub struct MessageParams {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Queue one JSON-RPC message and answer 202 Accepted.
///
/// A query string axum cannot parse (a repeated `sessionId`, say) is a
/// malformed request, reported in the same JSON shape as other errors.
#[tracing::instrument(skip(state, query, body), fields(session_id = tracing::field::Empty))]
pub async fn message_handler(
    State(state): State<Arc<McpState>>,
    query: Result<Query<MessageParams>, QueryRejection>,
    body: Bytes,
) -> Result<StatusCode, SessionError> {
    let Query(params) = query.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "Rejected message query");
        SessionError::MalformedPayload(rejection.body_text())
    })?;
    let session_id = params
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or(SessionError::MissingSessionId)?;
    tracing::Span::current().record("session_id", session_id.as_str());

    state.deliver(&session_id, &body).await?;
    Ok(StatusCode::ACCEPTED)
}

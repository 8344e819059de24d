//! HTTP client for the imagery provider's platform API.
//!
//! Every request carries the API key header and the configured timeout.
//! Responses are JSON; non-2xx statuses become [`UpstreamError::Status`]
//! carrying the status code and (truncated) body text.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::Instrument;
use uplink::ApiKey;
use uplink_conf::UpstreamSection;

/// Error bodies longer than this are cut before they reach the agent.
const MAX_ERROR_BODY: usize = 2048;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("no upstream API key configured (set SKYDESK_API_KEY)")]
    MissingApiKey,

    #[error("invalid upstream client setting: {0}")]
    InvalidSetting(String),

    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upstream returned invalid JSON: {0}")]
    Decode(String),
}

/// Client for the provider API, shared by every tool handler.
#[derive(Debug, Clone)]
pub struct ImageryClient {
    http: reqwest::Client,
    base_url: String,
    has_key: bool,
}

impl ImageryClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: &ApiKey,
        api_key_header: &str,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let mut headers = HeaderMap::new();
        if !api_key.is_empty() {
            let name = HeaderName::from_bytes(api_key_header.as_bytes()).map_err(|e| {
                UpstreamError::InvalidSetting(format!("api_key_header {:?}: {}", api_key_header, e))
            })?;
            let mut value = HeaderValue::from_str(api_key.expose())
                .map_err(|_| UpstreamError::InvalidSetting("api_key is not a valid header value".into()))?;
            value.set_sensitive(true);
            headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .user_agent(concat!("skydesk/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            has_key: !api_key.is_empty(),
        })
    }

    pub fn from_config(upstream: &UpstreamSection) -> Result<Self, UpstreamError> {
        Self::new(
            upstream.base_url.clone(),
            &ApiKey::new(upstream.api_key.clone()),
            &upstream.api_key_header,
            upstream.timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, UpstreamError> {
        let request = self.request(Method::GET, path).query(query);
        self.send(Method::GET, path, request).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, UpstreamError> {
        let request = self.request(Method::POST, path).json(body);
        self.send(Method::POST, path, request).await
    }

    /// DELETE; an empty response body comes back as `Value::Null`.
    pub async fn delete(&self, path: &str) -> Result<Value, UpstreamError> {
        let request = self.request(Method::DELETE, path);
        self.send(Method::DELETE, path, request).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    async fn send(&self, method: Method, path: &str, request: RequestBuilder) -> Result<Value, UpstreamError> {
        if !self.has_key {
            return Err(UpstreamError::MissingApiKey);
        }

        let span = tracing::info_span!("upstream.request", method = %method, path = %path);
        async move {
            let started = Instant::now();
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            tracing::debug!(
                status = status.as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Upstream responded"
            );

            if !status.is_success() {
                tracing::warn!(status = status.as_u16(), "Upstream returned an error status");
                return Err(UpstreamError::Status {
                    status: status.as_u16(),
                    body: truncate(body),
                });
            }
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&body).map_err(|e| UpstreamError::Decode(e.to_string()))
        }
        .instrument(span)
        .await
    }
}

fn truncate(body: String) -> String {
    if body.chars().count() <= MAX_ERROR_BODY {
        return body;
    }
    let mut cut: String = body.chars().take(MAX_ERROR_BODY).collect();
    cut.push_str("...");
    cut
}

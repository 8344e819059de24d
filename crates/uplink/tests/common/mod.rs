//! Shared helpers for uplink integration tests

#![allow(dead_code)]

use futures::stream::{BoxStream, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use uplink::{tool_fn, BoxError, CallToolResult, McpServer, ServerConfig, Tool};

/// A server on an ephemeral localhost port with three test tools:
/// `echo` returns its arguments, `fail` always errors, `hang` never answers.
pub struct TestServer {
    pub server: McpServer,
    pub addr: SocketAddr,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(ServerConfig::new("test-server", "1.0.0")).await
    }

    pub async fn start_with(config: ServerConfig) -> Self {
        let server = McpServer::new(config.with_host("127.0.0.1"));
        server.register_tool(
            Tool::new("echo", "Echo arguments back"),
            Arc::new(tool_fn(|args, _ctx| async move {
                Ok::<_, BoxError>(CallToolResult::json(args))
            })),
        );
        server.register_tool(
            Tool::new("fail", "Always fails"),
            Arc::new(tool_fn(|_args, _ctx| async move {
                Err::<CallToolResult, BoxError>("upstream returned 503".into())
            })),
        );
        server.register_tool(
            Tool::new("hang", "Never completes"),
            Arc::new(tool_fn(|_args, _ctx| async move {
                std::future::pending::<()>().await;
                Ok::<_, BoxError>(CallToolResult::text("unreachable"))
            })),
        );
        let addr = server.start().await.expect("server should start");
        Self { server, addr }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// One parsed SSE event.
#[derive(Debug, Clone)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Minimal SSE reader over a reqwest byte stream. Comment frames are skipped.
pub struct SseReader {
    stream: BoxStream<'static, reqwest::Result<bytes::Bytes>>,
    buffer: String,
}

impl SseReader {
    pub fn new(response: reqwest::Response) -> Self {
        Self {
            stream: response.bytes_stream().boxed(),
            buffer: String::new(),
        }
    }

    /// Next event, or None if the stream ended or nothing arrived in time.
    pub async fn next_event(&mut self) -> Option<SseEvent> {
        loop {
            if let Some(pos) = self.buffer.find("\n\n") {
                let block: String = self.buffer.drain(..pos + 2).collect();
                if let Some(event) = parse_block(&block) {
                    return Some(event);
                }
                continue;
            }

            let chunk = tokio::time::timeout(Duration::from_secs(5), self.stream.next())
                .await
                .ok()??
                .ok()?;
            self.buffer.push_str(&String::from_utf8_lossy(&chunk));
        }
    }

    /// True once the server has ended the stream.
    pub async fn is_finished(&mut self) -> bool {
        loop {
            match tokio::time::timeout(Duration::from_secs(5), self.stream.next()).await {
                Ok(None) | Ok(Some(Err(_))) => return true,
                Ok(Some(Ok(_))) => continue,
                Err(_) => return false,
            }
        }
    }
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut event = String::from("message");
    let mut data = Vec::new();
    for line in block.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            event = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("data:") {
            data.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        }
    }
    if data.is_empty() {
        return None;
    }
    Some(SseEvent {
        event,
        data: data.join("\n"),
    })
}

//! skydesk - MCP gateway for a satellite imagery provider
//!
//! This library provides:
//! - `client`: HTTP client for the provider's platform API
//! - `tools`: typed tool handlers (feasibility, orders, notifications)
//! - `serve`: builds and runs the `uplink` MCP server
//! - `telemetry`: tracing subscriber and optional OTLP export

pub mod client;
pub mod serve;
pub mod telemetry;
pub mod tools;

pub use client::{ImageryClient, UpstreamError};
pub use serve::{build_server, server_config};

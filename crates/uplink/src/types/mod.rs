//! MCP Protocol Types
//!
//! Wire types for the subset of MCP this server speaks:
//!
//! - `jsonrpc` - JSON-RPC 2.0 envelopes (requests, notifications, responses)
//! - `error` - JSON-RPC error objects and standard codes
//! - `protocol` - Initialize handshake and capability negotiation
//! - `tool` - Tool definitions, call parameters and call results
//! - `content` - Content blocks carried by tool results

pub mod content;
pub mod error;
pub mod jsonrpc;
pub mod protocol;
pub mod tool;

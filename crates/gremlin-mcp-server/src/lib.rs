//! Gremlin MCP Server - Model Context Protocol server
//!
//! Exposes a Gremlin graph and its inferred schema to AI assistants as MCP
//! tools and resources.

pub mod handlers;
pub mod server;
pub mod tools;
pub mod transport;

#[cfg(feature = "sse")]
pub mod sse;

pub use server::McpServer;

#[cfg(feature = "sse")]
pub use sse::run_sse_server;

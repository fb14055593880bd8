//! Gremlin MCP Backend - Graph clients
//!
//! This crate provides the [`GraphClient`](gremlin_mcp_core::GraphClient)
//! implementations the server can run against.

pub mod error;
pub mod memory;

#[cfg(feature = "http")]
pub mod http;

pub use error::{BackendError, BackendResult};
pub use memory::MemoryGraph;

#[cfg(feature = "http")]
pub use http::GremlinHttpClient;

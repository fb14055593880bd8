//! Gremlin MCP Core - Schema introspection engine
//!
//! This crate discovers the schema of a Gremlin-compatible graph by sampling
//! it through a [`GraphClient`], and caches the result for reuse.

pub mod analyzer;
pub mod assembler;
pub mod bulk;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod generate;
pub mod normalize;
pub mod orchestrator;
pub mod patterns;
pub mod schema;
pub mod service;
pub mod traversal;

#[cfg(test)]
mod testing;

pub use bulk::{
    ExportFormat, ExportOptions, GraphData, ImportFormat, ImportOptions, ImportSummary,
};
pub use cache::SchemaCache;
pub use config::{ConnectionConfig, Endpoint, SchemaConfig};
pub use error::{Error, Result};
pub use generate::generate_schema;
pub use schema::{
    Cardinality, GraphSchema, NodeType, OptimizationSettings, Property, RelationshipPattern,
    RelationshipType, SchemaMetadata,
};
pub use service::{GraphService, GraphStatus};
pub use traversal::{ElementKind, GraphClient, Traversal};

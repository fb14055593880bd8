//! CLI command implementations

pub mod completions;
pub mod config;
pub mod io;
pub mod query;
pub mod schema;
pub mod serve;
pub mod status;

//! Full schema generation under a deadline

use tokio::time::Instant;

use crate::assembler::assemble;
use crate::config::SchemaConfig;
use crate::discovery::discover_labels;
use crate::error::{Error, Result};
use crate::orchestrator::Orchestrator;
use crate::schema::GraphSchema;
use crate::traversal::GraphClient;

/// Generate a fresh schema: discovery, per-label analysis, pattern mining, assembly.
///
/// The whole pipeline runs under `config.timeout_ms`. On expiry every
/// outstanding traversal future is dropped and `Error::Timeout` is returned;
/// nothing produced by the abandoned run escapes.
pub async fn generate_schema<C: GraphClient + ?Sized>(
    client: &C,
    config: &SchemaConfig,
) -> Result<GraphSchema> {
    let started = Instant::now();
    tracing::info!(
        timeout_ms = config.timeout_ms,
        batch_size = config.effective_batch_size(),
        "Generating graph schema"
    );

    match tokio::time::timeout(config.timeout(), run_pipeline(client, config, started)).await {
        Ok(Ok(schema)) => {
            tracing::info!(
                nodes = schema.metadata.node_count,
                relationships = schema.metadata.relationship_count,
                patterns = schema.metadata.pattern_count,
                elapsed_ms = schema.metadata.generation_time_ms,
                "Schema generated"
            );
            Ok(schema)
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Schema generation failed");
            Err(e)
        }
        Err(_) => {
            tracing::warn!(timeout_ms = config.timeout_ms, "Schema generation timed out");
            Err(Error::Timeout {
                timeout_ms: config.timeout_ms,
            })
        }
    }
}

async fn run_pipeline<C: GraphClient + ?Sized>(
    client: &C,
    config: &SchemaConfig,
    started: Instant,
) -> Result<GraphSchema> {
    let labels = discover_labels(client).await?;
    let parts = Orchestrator::new(client, config).run(&labels).await?;
    assemble(parts, config, started)
}

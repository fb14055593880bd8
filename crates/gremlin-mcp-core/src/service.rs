//! High-level graph operations over one client, with a cached schema

use std::sync::Arc;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bulk::{render_export, ExportOptions, GraphData, ImportFormat, ImportOptions, ImportSummary};
use crate::cache::SchemaCache;
use crate::config::SchemaConfig;
use crate::error::{Error, Result};
use crate::generate::generate_schema;
use crate::normalize::as_count;
use crate::schema::GraphSchema;
use crate::traversal::{ElementKind, GraphClient, Traversal};

/// Connection and cache health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertex_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_count: Option<u64>,
    pub schema_cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_age_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Owns a graph client, its schema configuration and the schema cache.
pub struct GraphService<C> {
    client: C,
    config: SchemaConfig,
    cache: SchemaCache,
}

impl<C: GraphClient> GraphService<C> {
    pub fn new(client: C, config: SchemaConfig) -> Self {
        let cache = SchemaCache::new(config.cache_ttl());
        Self {
            client,
            config,
            cache,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    /// Probe the connection. An unreachable server is reported, not raised.
    pub async fn status(&self) -> GraphStatus {
        let schema_cached = self.cache.peek().is_some();
        let schema_age_secs = self.cache.age().map(|age| age.as_secs());

        if let Err(e) = self.client.execute(&Traversal::Ping).await {
            tracing::warn!(error = %e, "Graph status check failed");
            return GraphStatus {
                connected: false,
                vertex_count: None,
                edge_count: None,
                schema_cached,
                schema_age_secs,
                message: Some(e.to_string()),
            };
        }

        let (vertex_count, edge_count) = tokio::join!(
            self.total(ElementKind::Vertex),
            self.total(ElementKind::Edge)
        );

        GraphStatus {
            connected: true,
            vertex_count,
            edge_count,
            schema_cached,
            schema_age_secs,
            message: None,
        }
    }

    async fn total(&self, element: ElementKind) -> Option<u64> {
        match self.client.execute(&Traversal::TotalCount { element }).await {
            Ok(rows) => rows.first().and_then(as_count),
            Err(e) => {
                tracing::debug!(%element, error = %e, "Count failed");
                None
            }
        }
    }

    /// Cached schema, generated on a miss.
    pub async fn schema(&self) -> Result<Arc<GraphSchema>> {
        self.cache
            .get(|| generate_schema(&self.client, &self.config))
            .await
    }

    pub fn peek_schema(&self) -> Option<Arc<GraphSchema>> {
        self.cache.peek()
    }

    pub async fn refresh_schema(&self) -> Result<Arc<GraphSchema>> {
        self.cache
            .refresh(|| generate_schema(&self.client, &self.config))
            .await
    }

    pub fn invalidate_schema(&self) {
        self.cache.invalidate();
    }

    /// Run a raw Gremlin script. Scripts with mutating steps drop the cached schema.
    pub async fn run_query(&self, gremlin: &str) -> Result<Vec<Value>> {
        let gremlin = gremlin.trim();
        if gremlin.is_empty() {
            return Err(Error::InvalidInput("Query must not be empty".into()));
        }

        let traversal = Traversal::Raw(gremlin.to_string());
        let rows = self.client.execute(&traversal).await?;
        if traversal.is_mutation() {
            self.cache.invalidate();
        }
        Ok(rows)
    }

    /// Parse and load a payload in batches.
    ///
    /// Batches run one after the other with their traversals in flight
    /// together. All vertex batches precede the edge batches.
    pub async fn import(
        &self,
        format: ImportFormat,
        data: &str,
        options: &ImportOptions,
    ) -> Result<ImportSummary> {
        let graph = GraphData::parse(format, data)?;
        let traversals = graph.traversals();
        let (vertex_writes, edge_writes) = traversals.split_at(graph.vertices.len());
        let batch_size = options.batch_size.max(1);
        let batches: Vec<&[Traversal]> = vertex_writes
            .chunks(batch_size)
            .chain(edge_writes.chunks(batch_size))
            .collect();

        let mut summary = ImportSummary {
            vertices: graph.vertices.len(),
            edges: graph.edges.len(),
            batches: batches.len(),
            cleared: false,
            validated_only: options.validate_only,
        };

        if options.validate_only {
            return Ok(summary);
        }

        if options.clear_graph {
            self.client.execute(&Traversal::DropAll).await?;
            summary.cleared = true;
        }

        let written = self.write_batches(&batches).await;
        // A partial import still changed the graph.
        self.cache.invalidate();
        written?;

        tracing::info!(
            vertices = summary.vertices,
            edges = summary.edges,
            batches = summary.batches,
            "Import complete"
        );
        Ok(summary)
    }

    async fn write_batches(&self, batches: &[&[Traversal]]) -> Result<()> {
        for (index, batch) in batches.iter().enumerate() {
            tracing::debug!(batch = index + 1, of = batches.len(), "Importing batch");
            try_join_all(batch.iter().map(|t| self.client.execute(t))).await?;
        }
        Ok(())
    }

    /// Run a traversal and render its results.
    pub async fn export(&self, traversal_query: &str, options: &ExportOptions) -> Result<String> {
        let rows = self.run_query(traversal_query).await?;
        render_export(rows, options)
    }
}

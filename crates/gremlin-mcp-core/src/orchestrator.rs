//! Batched, concurrency-limited analysis of every discovered label
//!
//! Labels are split into groups of `batch_size`. Groups run one after the
//! other; labels inside a group run concurrently. Every traversal issued
//! during a run additionally passes through one semaphore so that no more than
//! `min(batch_size, MAX_CONCURRENCY)` queries are ever in flight against the
//! connection. Vertex analysis, edge analysis and pattern mining are three
//! concurrent branches. The first error aborts the whole run.

use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::analyzer::analyze_property;
use crate::config::SchemaConfig;
use crate::discovery::{discover_property_keys, DiscoveredLabels};
use crate::error::{Error, Result};
use crate::normalize::as_count;
use crate::patterns::mine_patterns;
use crate::schema::{NodeType, Property, RelationshipPattern, RelationshipType};
use crate::traversal::{ElementKind, GraphClient, Traversal};

/// Analysis of one label
#[derive(Debug, Clone, PartialEq)]
pub struct LabelAnalysis {
    pub label: String,
    pub properties: Vec<Property>,
    pub count: Option<u64>,
}

/// Everything the assembler needs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaParts {
    pub nodes: Vec<NodeType>,
    pub relationships: Vec<RelationshipType>,
    pub patterns: Vec<RelationshipPattern>,
}

/// A client wrapper that admits a bounded number of concurrent traversals.
pub struct Throttled<'a, C: ?Sized> {
    inner: &'a C,
    permits: Semaphore,
}

impl<'a, C: GraphClient + ?Sized> Throttled<'a, C> {
    pub fn new(inner: &'a C, limit: usize) -> Self {
        Self {
            inner,
            permits: Semaphore::new(limit.max(1)),
        }
    }
}

#[async_trait]
impl<'a, C: GraphClient + ?Sized> GraphClient for Throttled<'a, C> {
    async fn execute(&self, traversal: &Traversal) -> Result<Vec<Value>> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::connectivity("Traversal limiter closed"))?;
        self.inner.execute(traversal).await
    }
}

/// Drives per-label analysis for one schema generation
pub struct Orchestrator<'a, C: ?Sized> {
    client: Throttled<'a, C>,
    config: &'a SchemaConfig,
}

impl<'a, C: GraphClient + ?Sized> Orchestrator<'a, C> {
    pub fn new(client: &'a C, config: &'a SchemaConfig) -> Self {
        Self {
            client: Throttled::new(client, config.concurrency_limit()),
            config,
        }
    }

    /// Analyze all labels and mine patterns.
    pub async fn run(&self, labels: &DiscoveredLabels) -> Result<SchemaParts> {
        let (vertices, edges, patterns) = tokio::try_join!(
            self.analyze_labels(ElementKind::Vertex, &labels.vertex_labels),
            self.analyze_labels(ElementKind::Edge, &labels.edge_labels),
            mine_patterns(&self.client),
        )?;

        Ok(SchemaParts {
            nodes: vertices
                .into_iter()
                .map(|a| NodeType {
                    labels: a.label,
                    properties: a.properties,
                    count: a.count,
                })
                .collect(),
            relationships: edges
                .into_iter()
                .map(|a| RelationshipType {
                    relationship_type: a.label,
                    properties: a.properties,
                    count: a.count,
                })
                .collect(),
            patterns,
        })
    }

    /// Analyze labels group by group, preserving input order.
    pub async fn analyze_labels(
        &self,
        element: ElementKind,
        labels: &[String],
    ) -> Result<Vec<LabelAnalysis>> {
        let batch_size = self.config.effective_batch_size();
        let batch_count = labels.len().div_ceil(batch_size);
        let mut results = Vec::with_capacity(labels.len());

        for (index, batch) in labels.chunks(batch_size).enumerate() {
            tracing::debug!(
                %element,
                batch = index + 1,
                of = batch_count,
                labels = batch.len(),
                "Analyzing label batch"
            );
            let analyzed =
                try_join_all(batch.iter().map(|label| self.analyze_label(element, label))).await?;
            results.extend(analyzed);
        }

        Ok(results)
    }

    async fn analyze_label(&self, element: ElementKind, label: &str) -> Result<LabelAnalysis> {
        let keys = discover_property_keys(&self.client, element, label).await?;

        let properties = try_join_all(
            keys.iter()
                .map(|key| analyze_property(&self.client, element, label, key, self.config)),
        );
        let (properties, count) = tokio::try_join!(properties, self.count_label(element, label))?;

        Ok(LabelAnalysis {
            label: label.to_string(),
            properties,
            count,
        })
    }

    async fn count_label(&self, element: ElementKind, label: &str) -> Result<Option<u64>> {
        if !self.config.include_counts {
            return Ok(None);
        }
        let rows = self
            .client
            .execute(&Traversal::LabelCount {
                element,
                label: label.to_string(),
            })
            .await?;
        Ok(rows.first().and_then(as_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::value_sample_traversal;
    use crate::discovery::PROPERTY_KEY_SAMPLE;
    use crate::testing::ScriptedClient;
    use serde_json::json;
    use std::time::Duration;

    fn keys(element: ElementKind, label: &str) -> Traversal {
        Traversal::PropertyKeys {
            element,
            label: label.to_string(),
            sample: PROPERTY_KEY_SAMPLE,
        }
    }

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("label{i}")).collect()
    }

    #[tokio::test]
    async fn test_results_keep_discovery_order() {
        let config = SchemaConfig {
            batch_size: 2,
            include_counts: false,
            ..Default::default()
        };
        let client = ScriptedClient::new().with_delay(Duration::from_millis(1));
        let orchestrator = Orchestrator::new(&client, &config);

        let input = labels(5);
        let analyzed = orchestrator
            .analyze_labels(ElementKind::Vertex, &input)
            .await
            .unwrap();

        let order: Vec<_> = analyzed.iter().map(|a| a.label.clone()).collect();
        assert_eq!(order, input);
    }

    #[tokio::test]
    async fn test_concurrency_ceiling() {
        let config = SchemaConfig {
            batch_size: 25,
            include_counts: true,
            ..Default::default()
        };
        let client = ScriptedClient::new().with_delay(Duration::from_millis(5));
        let orchestrator = Orchestrator::new(&client, &config);

        let discovered = DiscoveredLabels {
            vertex_labels: labels(30),
            edge_labels: labels(30),
        };
        orchestrator.run(&discovered).await.unwrap();

        assert!(client.max_in_flight() <= crate::config::MAX_CONCURRENCY);
        assert!(client.max_in_flight() > 1);
    }

    #[tokio::test]
    async fn test_batch_size_one_is_sequential() {
        let config = SchemaConfig {
            batch_size: 1,
            ..Default::default()
        };
        let client = ScriptedClient::new().with_delay(Duration::from_millis(1));
        let orchestrator = Orchestrator::new(&client, &config);

        let discovered = DiscoveredLabels {
            vertex_labels: labels(3),
            edge_labels: labels(2),
        };
        orchestrator.run(&discovered).await.unwrap();
        assert_eq!(client.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_single_failure_aborts_run() {
        let config = SchemaConfig::default();
        let client = ScriptedClient::new()
            .respond(keys(ElementKind::Vertex, "label1"), vec![json!("status")])
            .fail(
                value_sample_traversal(ElementKind::Vertex, "label1", "status", &config),
                "server closed connection",
            );
        let orchestrator = Orchestrator::new(&client, &config);

        let discovered = DiscoveredLabels {
            vertex_labels: labels(4),
            edge_labels: vec![],
        };
        let err = orchestrator.run(&discovered).await.unwrap_err();
        assert!(matches!(err, Error::Connectivity(_)));
    }

    #[tokio::test]
    async fn test_counts_attached() {
        let config = SchemaConfig::default();
        let client = ScriptedClient::new().respond(
            Traversal::LabelCount {
                element: ElementKind::Edge,
                label: "worksAt".into(),
            },
            vec![json!(3)],
        );
        let orchestrator = Orchestrator::new(&client, &config);

        let discovered = DiscoveredLabels {
            vertex_labels: vec![],
            edge_labels: vec!["worksAt".into()],
        };
        let parts = orchestrator.run(&discovered).await.unwrap();
        assert_eq!(parts.relationships.len(), 1);
        assert_eq!(parts.relationships[0].count, Some(3));
        assert!(parts.relationships[0].properties.is_empty());
    }
}

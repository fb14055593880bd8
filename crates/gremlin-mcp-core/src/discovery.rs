//! Label and property key discovery

use serde_json::Value;

use crate::error::Result;
use crate::normalize::as_string;
use crate::traversal::{ElementKind, GraphClient, Traversal};

/// Elements of a label inspected for property keys.
///
/// Walking every property of every element is too expensive on large graphs;
/// keys that only appear past this sample are missed.
pub const PROPERTY_KEY_SAMPLE: usize = 100;

/// Distinct labels present in the graph, in the order the database returned them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredLabels {
    pub vertex_labels: Vec<String>,
    pub edge_labels: Vec<String>,
}

/// Fetch vertex and edge labels concurrently.
pub async fn discover_labels<C: GraphClient + ?Sized>(client: &C) -> Result<DiscoveredLabels> {
    let (vertex_rows, edge_rows) = tokio::try_join!(
        client.execute(&Traversal::VertexLabels),
        client.execute(&Traversal::EdgeLabels),
    )?;

    let labels = DiscoveredLabels {
        vertex_labels: distinct_strings(vertex_rows),
        edge_labels: distinct_strings(edge_rows),
    };
    tracing::debug!(
        vertex_labels = labels.vertex_labels.len(),
        edge_labels = labels.edge_labels.len(),
        "Discovered labels"
    );
    Ok(labels)
}

/// Distinct property keys seen on the first [`PROPERTY_KEY_SAMPLE`] elements of `label`.
pub async fn discover_property_keys<C: GraphClient + ?Sized>(
    client: &C,
    element: ElementKind,
    label: &str,
) -> Result<Vec<String>> {
    let rows = client
        .execute(&Traversal::PropertyKeys {
            element,
            label: label.to_string(),
            sample: PROPERTY_KEY_SAMPLE,
        })
        .await?;
    Ok(distinct_strings(rows))
}

/// Keep non-empty strings, first occurrence wins.
fn distinct_strings(rows: Vec<Value>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(rows.len());
    for row in &rows {
        if let Some(s) = as_string(row) {
            if !out.iter().any(|existing| existing == s) {
                out.push(s.to_string());
            }
        }
    }
    out
}

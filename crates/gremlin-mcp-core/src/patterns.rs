//! Relationship pattern mining

use std::collections::HashSet;

use serde_json::Value;

use crate::error::Result;
use crate::normalize::{as_object, as_string};
use crate::schema::RelationshipPattern;
use crate::traversal::{GraphClient, Traversal};

/// Edges scanned for patterns.
pub const PATTERN_EDGE_LIMIT: usize = 1000;

/// Mine distinct (source label, edge label, target label) triples with one bulk query.
pub async fn mine_patterns<C: GraphClient + ?Sized>(client: &C) -> Result<Vec<RelationshipPattern>> {
    let rows = client
        .execute(&Traversal::RelationshipPatterns {
            limit: PATTERN_EDGE_LIMIT,
        })
        .await?;

    let patterns = extract_patterns(&rows);
    tracing::debug!(rows = rows.len(), patterns = patterns.len(), "Mined relationship patterns");
    Ok(patterns)
}

/// Turn projection rows into patterns, dropping incomplete rows and duplicates.
pub fn extract_patterns(rows: &[Value]) -> Vec<RelationshipPattern> {
    let mut seen = HashSet::new();
    let mut patterns = Vec::new();

    for row in rows {
        let Some(fields) = as_object(row) else {
            continue;
        };
        let from = fields.get("from").and_then(as_string);
        let to = fields.get("to").and_then(as_string);
        let label = fields.get("label").and_then(as_string);

        if let (Some(from), Some(to), Some(label)) = (from, to, label) {
            let pattern = RelationshipPattern::new(from, label, to);
            if seen.insert(pattern.clone()) {
                patterns.push(pattern);
            }
        }
    }

    patterns
}

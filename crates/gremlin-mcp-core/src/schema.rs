//! Graph schema document types

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SchemaConfig;

/// Type name recorded when no value could be sampled.
pub const UNKNOWN_TYPE: &str = "unknown";

/// How many values a property may repeat on one element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    Single,
}

/// Descriptor for one property key of one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,

    /// Native value types observed among sampled values
    #[serde(rename = "type")]
    pub value_types: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_values: Option<Vec<serde_json::Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<Cardinality>,

    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<serde_json::Value>>,
}

impl Property {
    /// A property whose values were not (or could not be) sampled.
    pub fn unknown(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_types: BTreeSet::from([UNKNOWN_TYPE.to_string()]),
            sample_values: None,
            cardinality: None,
            enum_values: None,
        }
    }

    pub fn is_enum(&self) -> bool {
        self.enum_values.is_some()
    }
}

/// One distinct vertex label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeType {
    pub labels: String,
    pub properties: Vec<Property>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

/// One distinct edge label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipType {
    #[serde(rename = "type")]
    pub relationship_type: String,
    pub properties: Vec<Property>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

/// An observed (source label, edge label, target label) triple
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipPattern {
    pub left_node: String,
    pub right_node: String,
    pub relation: String,
}

impl RelationshipPattern {
    pub fn new(
        left_node: impl Into<String>,
        relation: impl Into<String>,
        right_node: impl Into<String>,
    ) -> Self {
        Self {
            left_node: left_node.into(),
            right_node: right_node.into(),
            relation: relation.into(),
        }
    }
}

/// Settings that were in effect for a generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationSettings {
    pub sample_values_included: bool,
    pub max_enum_values: usize,
    pub counts_included: bool,
    pub enum_cardinality_threshold: usize,
    pub timeout_ms: u64,
    pub batch_size: usize,
}

impl From<&SchemaConfig> for OptimizationSettings {
    fn from(config: &SchemaConfig) -> Self {
        Self {
            sample_values_included: config.include_sample_values,
            max_enum_values: config.max_enum_values,
            counts_included: config.include_counts,
            enum_cardinality_threshold: config.enum_cardinality_threshold,
            timeout_ms: config.timeout_ms,
            batch_size: config.effective_batch_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaMetadata {
    pub generated_at: DateTime<Utc>,
    pub node_count: usize,
    pub relationship_count: usize,
    pub pattern_count: usize,
    pub generation_time_ms: u64,
    pub optimization_settings: OptimizationSettings,
}

/// The structural shape of a graph, as produced by one generation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSchema {
    pub nodes: Vec<NodeType>,
    pub relationships: Vec<RelationshipType>,
    pub relationship_patterns: Vec<RelationshipPattern>,
    pub metadata: SchemaMetadata,
}

impl GraphSchema {
    pub fn node(&self, label: &str) -> Option<&NodeType> {
        self.nodes.iter().find(|n| n.labels == label)
    }

    pub fn relationship(&self, label: &str) -> Option<&RelationshipType> {
        self.relationships
            .iter()
            .find(|r| r.relationship_type == label)
    }
}

//! Schema assembly and structural validation

use std::collections::HashSet;

use chrono::Utc;
use tokio::time::Instant;

use crate::config::SchemaConfig;
use crate::error::{Error, Result};
use crate::orchestrator::SchemaParts;
use crate::schema::{GraphSchema, OptimizationSettings, Property, SchemaMetadata};

/// Combine analysis results with generation metadata and validate the result.
pub fn assemble(parts: SchemaParts, config: &SchemaConfig, started: Instant) -> Result<GraphSchema> {
    let metadata = SchemaMetadata {
        generated_at: Utc::now(),
        node_count: parts.nodes.len(),
        relationship_count: parts.relationships.len(),
        pattern_count: parts.patterns.len(),
        generation_time_ms: started.elapsed().as_millis() as u64,
        optimization_settings: OptimizationSettings::from(config),
    };

    let schema = GraphSchema {
        nodes: parts.nodes,
        relationships: parts.relationships,
        relationship_patterns: parts.patterns,
        metadata,
    };

    validate(&schema, config)?;
    Ok(schema)
}

/// Check the structural invariants of a schema document.
///
/// A failure here points at a driver returning shapes the engine does not
/// understand, so it is not worth retrying.
pub fn validate(schema: &GraphSchema, config: &SchemaConfig) -> Result<()> {
    let mut labels = HashSet::new();
    for node in &schema.nodes {
        if node.labels.is_empty() {
            return Err(Error::Validation("Node type with empty label".into()));
        }
        if !labels.insert(node.labels.as_str()) {
            return Err(Error::Validation(format!(
                "Duplicate node type '{}'",
                node.labels
            )));
        }
        validate_properties(&node.labels, &node.properties, config)?;
    }

    let mut types = HashSet::new();
    for rel in &schema.relationships {
        if rel.relationship_type.is_empty() {
            return Err(Error::Validation("Relationship type with empty label".into()));
        }
        if !types.insert(rel.relationship_type.as_str()) {
            return Err(Error::Validation(format!(
                "Duplicate relationship type '{}'",
                rel.relationship_type
            )));
        }
        validate_properties(&rel.relationship_type, &rel.properties, config)?;
    }

    for pattern in &schema.relationship_patterns {
        if pattern.left_node.is_empty() || pattern.right_node.is_empty() || pattern.relation.is_empty()
        {
            return Err(Error::Validation(format!(
                "Incomplete relationship pattern {:?}",
                pattern
            )));
        }
    }

    let meta = &schema.metadata;
    if meta.node_count != schema.nodes.len()
        || meta.relationship_count != schema.relationships.len()
        || meta.pattern_count != schema.relationship_patterns.len()
    {
        return Err(Error::Validation("Metadata counts do not match schema".into()));
    }

    Ok(())
}

fn validate_properties(owner: &str, properties: &[Property], config: &SchemaConfig) -> Result<()> {
    for prop in properties {
        if prop.name.is_empty() {
            return Err(Error::Validation(format!("Unnamed property on '{}'", owner)));
        }
        if prop.value_types.is_empty() {
            return Err(Error::Validation(format!(
                "Property '{}.{}' has no type",
                owner, prop.name
            )));
        }
        if let Some(values) = &prop.enum_values {
            if values.is_empty() || values.len() > config.enum_cardinality_threshold {
                return Err(Error::Validation(format!(
                    "Property '{}.{}' has {} enum values (threshold {})",
                    owner,
                    prop.name,
                    values.len(),
                    config.enum_cardinality_threshold
                )));
            }
            if config.is_blacklisted(&prop.name) {
                return Err(Error::Validation(format!(
                    "Blacklisted property '{}.{}' classified as enum",
                    owner, prop.name
                )));
            }
        }
    }
    Ok(())
}

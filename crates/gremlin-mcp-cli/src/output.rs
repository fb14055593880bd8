//! Output formatting utilities

use gremlin_mcp_core::{GraphSchema, GraphStatus, Property};
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub fn to_json<T: Serialize>(data: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(data)?)
}

pub fn format_status(status: &GraphStatus, format: OutputFormat) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        return to_json(status);
    }

    let count = |c: Option<u64>| c.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
    let mut out = vec![
        format!("Connected:     {}", if status.connected { "yes" } else { "no" }),
        format!("Vertices:      {}", count(status.vertex_count)),
        format!("Edges:         {}", count(status.edge_count)),
        format!("Schema cached: {}", if status.schema_cached { "yes" } else { "no" }),
    ];
    if let Some(message) = &status.message {
        out.push(format!("Message:       {}", message));
    }
    Ok(out.join("\n"))
}

fn describe_property(p: &Property) -> String {
    let types: Vec<&str> = p.value_types.iter().map(String::as_str).collect();
    let mut line = format!("    {}: {}", p.name, types.join("|"));
    if let Some(values) = &p.enum_values {
        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        line.push_str(&format!(" enum[{}]", values.join(", ")));
    }
    line
}

fn count_suffix(count: Option<u64>) -> String {
    count.map(|c| format!(" ({})", c)).unwrap_or_default()
}

pub fn format_schema(schema: &GraphSchema, format: OutputFormat) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        return to_json(schema);
    }

    let mut out = Vec::new();
    out.push(format!("Node types ({}):", schema.nodes.len()));
    for node in &schema.nodes {
        out.push(format!("  {}{}", node.labels, count_suffix(node.count)));
        out.extend(node.properties.iter().map(describe_property));
    }

    out.push(format!("Relationship types ({}):", schema.relationships.len()));
    for rel in &schema.relationships {
        out.push(format!("  {}{}", rel.relationship_type, count_suffix(rel.count)));
        out.extend(rel.properties.iter().map(describe_property));
    }

    out.push(format!("Patterns ({}):", schema.relationship_patterns.len()));
    for p in &schema.relationship_patterns {
        out.push(format!("  ({})-[{}]->({})", p.left_node, p.relation, p.right_node));
    }

    out.push(format!(
        "Generated {} in {}ms",
        schema.metadata.generated_at.to_rfc3339(),
        schema.metadata.generation_time_ms
    ));
    Ok(out.join("\n"))
}

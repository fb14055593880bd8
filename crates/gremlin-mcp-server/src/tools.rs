//! MCP tool and resource definitions

use serde::Serialize;

/// MCP tool definition
#[derive(Debug, Serialize)]
pub struct Tool {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// MCP resource definition
#[derive(Debug, Serialize)]
pub struct Resource {
    pub uri: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "mimeType")]
    pub mime_type: &'static str,
}

pub const STATUS_URI: &str = "gremlin://status";
pub const SCHEMA_URI: &str = "gremlin://schema";

/// Get all available tools
pub fn get_tools() -> Vec<Tool> {
    vec![
        Tool {
            name: "get_graph_status",
            description: "Check the connection to the graph database and report vertex and edge totals.",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        },
        Tool {
            name: "get_graph_schema",
            description: "Get the graph schema: node labels, relationship types, their properties with types and enum values, and which labels each relationship connects. Served from cache when fresh.",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        },
        Tool {
            name: "run_gremlin_query",
            description: "Run a Gremlin traversal and return its results as JSON.",
            input_schema: serde_json::json!({
                "type": "object",
                "required": ["query"],
                "properties": {
                    "query": {"type": "string", "description": "Gremlin traversal, e.g. g.V().hasLabel('person').limit(5).valueMap()"}
                }
            }),
        },
        Tool {
            name: "refresh_schema_cache",
            description: "Discard the cached schema and generate a new one from the live graph.",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        },
        Tool {
            name: "import_graph_data",
            description: "Import vertices and edges from a GraphSON document or CSV text. Vertices are written before edges.",
            input_schema: serde_json::json!({
                "type": "object",
                "required": ["format", "data"],
                "properties": {
                    "format": {"type": "string", "enum": ["graphson", "csv"]},
                    "data": {"type": "string", "description": "GraphSON: {\"vertices\": [...], \"edges\": [...]}. CSV: header row with a 'label' column; 'from' and 'to' columns make it an edge file."},
                    "options": {
                        "type": "object",
                        "properties": {
                            "batch_size": {"type": "number", "default": 100},
                            "clear_graph": {"type": "boolean", "default": false},
                            "validate_only": {"type": "boolean", "default": false}
                        }
                    }
                }
            }),
        },
        Tool {
            name: "export_subgraph",
            description: "Run a traversal and export its results as JSON, GraphSON or CSV.",
            input_schema: serde_json::json!({
                "type": "object",
                "required": ["traversal_query"],
                "properties": {
                    "traversal_query": {"type": "string", "description": "Gremlin traversal selecting the elements to export"},
                    "format": {"type": "string", "enum": ["json", "graphson", "csv"], "default": "json"},
                    "include_properties": {"type": "array", "items": {"type": "string"}, "description": "Only export these properties"},
                    "exclude_properties": {"type": "array", "items": {"type": "string"}, "description": "Never export these properties"}
                }
            }),
        },
    ]
}

/// Get all readable resources
pub fn get_resources() -> Vec<Resource> {
    vec![
        Resource {
            uri: STATUS_URI,
            name: "Graph status",
            description: "Connection state and element totals",
            mime_type: "application/json",
        },
        Resource {
            uri: SCHEMA_URI,
            name: "Graph schema",
            description: "Cached graph schema",
            mime_type: "application/json",
        },
    ]
}

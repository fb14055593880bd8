//! MCP tool call handlers

use std::sync::Arc;

use gremlin_mcp_core::{
    ExportFormat, ExportOptions, GraphClient, GraphService, ImportFormat, ImportOptions,
};
use serde::{Deserialize, Serialize};

/// MCP tool call response
#[derive(Debug, Serialize, Deserialize)]
pub struct ToolCallResponse {
    pub content: Vec<ContentBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "isError")]
    pub is_error: Option<bool>,
}

/// Content block for responses
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
}

impl ToolCallResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text {
                text: content.into(),
            }],
            is_error: None,
        }
    }

    pub fn json<T: Serialize>(data: &T) -> Self {
        match serde_json::to_string_pretty(data) {
            Ok(json) => Self::text(json),
            Err(e) => Self::error(format!("JSON serialization error: {}", e)),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text {
                text: message.into(),
            }],
            is_error: Some(true),
        }
    }

    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }
}

/// Tool handler that processes tool calls
pub struct ToolHandler<C> {
    service: Arc<GraphService<C>>,
}

impl<C: GraphClient> ToolHandler<C> {
    pub fn new(service: Arc<GraphService<C>>) -> Self {
        Self { service }
    }

    pub async fn handle(&self, name: &str, arguments: serde_json::Value) -> ToolCallResponse {
        tracing::debug!(tool = name, "Handling tool call");

        match name {
            "get_graph_status" => self.graph_status().await,
            "get_graph_schema" => self.graph_schema().await,
            "run_gremlin_query" => self.run_query(arguments).await,
            "refresh_schema_cache" => self.refresh_schema().await,
            "import_graph_data" => self.import_data(arguments).await,
            "export_subgraph" => self.export_subgraph(arguments).await,
            _ => ToolCallResponse::error(format!("Unknown tool: {}", name)),
        }
    }

    async fn graph_status(&self) -> ToolCallResponse {
        ToolCallResponse::json(&self.service.status().await)
    }

    async fn graph_schema(&self) -> ToolCallResponse {
        match self.service.schema().await {
            Ok(schema) => ToolCallResponse::json(schema.as_ref()),
            Err(e) => ToolCallResponse::error(format!("Schema generation failed: {}", e)),
        }
    }

    async fn run_query(&self, args: serde_json::Value) -> ToolCallResponse {
        #[derive(Deserialize)]
        struct Args {
            query: String,
        }

        let args: Args = match serde_json::from_value(args) {
            Ok(a) => a,
            Err(e) => return ToolCallResponse::error(format!("Invalid arguments: {}", e)),
        };

        match self.service.run_query(&args.query).await {
            Ok(results) => ToolCallResponse::json(&serde_json::json!({
                "results": results,
                "count": results.len()
            })),
            Err(e) => ToolCallResponse::error(format!("Query failed: {}", e)),
        }
    }

    async fn refresh_schema(&self) -> ToolCallResponse {
        match self.service.refresh_schema().await {
            Ok(schema) => ToolCallResponse::json(&serde_json::json!({
                "message": "Schema cache refreshed",
                "nodeCount": schema.metadata.node_count,
                "relationshipCount": schema.metadata.relationship_count,
                "patternCount": schema.metadata.pattern_count,
                "generatedAt": schema.metadata.generated_at,
                "generationTimeMs": schema.metadata.generation_time_ms
            })),
            Err(e) => ToolCallResponse::error(format!("Schema refresh failed: {}", e)),
        }
    }

    async fn import_data(&self, args: serde_json::Value) -> ToolCallResponse {
        #[derive(Deserialize)]
        struct Args {
            format: String,
            data: String,
            #[serde(default)]
            options: ImportOptions,
        }

        let args: Args = match serde_json::from_value(args) {
            Ok(a) => a,
            Err(e) => return ToolCallResponse::error(format!("Invalid arguments: {}", e)),
        };
        let format: ImportFormat = match args.format.parse() {
            Ok(f) => f,
            Err(e) => return ToolCallResponse::error(format!("{}", e)),
        };

        match self.service.import(format, &args.data, &args.options).await {
            Ok(summary) => ToolCallResponse::json(&summary),
            Err(e) => ToolCallResponse::error(format!("Import failed: {}", e)),
        }
    }

    async fn export_subgraph(&self, args: serde_json::Value) -> ToolCallResponse {
        #[derive(Deserialize)]
        struct Args {
            traversal_query: String,
            format: Option<String>,
            include_properties: Option<Vec<String>>,
            #[serde(default)]
            exclude_properties: Vec<String>,
        }

        let args: Args = match serde_json::from_value(args) {
            Ok(a) => a,
            Err(e) => return ToolCallResponse::error(format!("Invalid arguments: {}", e)),
        };
        let format: ExportFormat = match args.format.as_deref().unwrap_or("json").parse() {
            Ok(f) => f,
            Err(e) => return ToolCallResponse::error(format!("{}", e)),
        };

        let options = ExportOptions {
            format,
            include_properties: args.include_properties,
            exclude_properties: args.exclude_properties,
        };

        match self.service.export(&args.traversal_query, &options).await {
            Ok(rendered) => ToolCallResponse::text(rendered),
            Err(e) => ToolCallResponse::error(format!("Export failed: {}", e)),
        }
    }
}

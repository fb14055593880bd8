//! MCP server implementation

use std::sync::Arc;

use gremlin_mcp_core::{GraphClient, GraphService};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::handlers::ToolHandler;
use crate::tools::{get_resources, get_tools, SCHEMA_URI, STATUS_URI};
use crate::transport::{
    Incoming, JsonRpcRequest, JsonRpcResponse, LineTransport, StdioTransport, INTERNAL_ERROR,
    INVALID_PARAMS, METHOD_NOT_FOUND, PARSE_ERROR,
};

const SERVER_NAME: &str = "gremlin-mcp";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
const PROTOCOL_VERSION: &str = "2024-11-05";

/// MCP Server for a Gremlin graph
pub struct McpServer<C> {
    service: Arc<GraphService<C>>,
    tools: ToolHandler<C>,
}

impl<C: GraphClient + 'static> McpServer<C> {
    pub fn new(service: Arc<GraphService<C>>) -> Self {
        Self {
            tools: ToolHandler::new(service.clone()),
            service,
        }
    }

    pub fn service(&self) -> &Arc<GraphService<C>> {
        &self.service
    }

    /// Start the MCP server on stdio
    pub async fn run_stdio(&self) -> anyhow::Result<()> {
        tracing::info!("Starting MCP server on stdio");
        self.serve(StdioTransport::stdio()).await
    }

    /// Serve requests until the reader reaches EOF, then close the graph client.
    pub async fn serve<R, W>(&self, mut transport: LineTransport<R, W>) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            let response = match transport.read_request().await {
                Ok(Some(Incoming::Request(request))) => {
                    tracing::debug!(method = %request.method, "Received request");
                    self.handle_request(request).await
                }
                Ok(Some(Incoming::Malformed(e))) => {
                    tracing::warn!(error = %e, "Malformed request");
                    Some(JsonRpcResponse::error(
                        serde_json::Value::Null,
                        PARSE_ERROR,
                        format!("Parse error: {}", e),
                    ))
                }
                Ok(None) => {
                    tracing::info!("EOF on stdin, shutting down");
                    break;
                }
                Err(e) => {
                    tracing::error!("Failed to read request: {}", e);
                    break;
                }
            };

            if let Some(response) = response {
                if let Err(e) = transport.write_response(&response).await {
                    tracing::error!("Failed to write response: {}", e);
                }
            }
        }

        self.service.client().close().await?;
        Ok(())
    }

    /// Handle a JSON-RPC request (public for SSE transport)
    pub async fn handle_request_public(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        self.handle_request(request).await
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id else {
            tracing::debug!(method = %request.method, "Notification");
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "initialized" | "notifications/initialized" | "ping" => {
                JsonRpcResponse::success(id, serde_json::json!({}))
            }
            "tools/list" => {
                JsonRpcResponse::success(id, serde_json::json!({ "tools": get_tools() }))
            }
            "tools/call" => self.handle_tools_call(id, request.params).await,
            "resources/list" => {
                JsonRpcResponse::success(id, serde_json::json!({ "resources": get_resources() }))
            }
            "resources/read" => self.handle_resources_read(id, request.params).await,
            _ => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        };
        Some(response)
    }

    fn handle_initialize(&self, id: serde_json::Value) -> JsonRpcResponse {
        let result = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {},
                "resources": {}
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION
            }
        });
        JsonRpcResponse::success(id, result)
    }

    async fn handle_tools_call(
        &self,
        id: serde_json::Value,
        params: serde_json::Value,
    ) -> JsonRpcResponse {
        #[derive(Deserialize)]
        struct ToolCallParams {
            name: String,
            #[serde(default)]
            arguments: serde_json::Value,
        }

        let params: ToolCallParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {}", e)),
        };

        let arguments = if params.arguments.is_null() {
            serde_json::json!({})
        } else {
            params.arguments
        };
        let response = self.tools.handle(&params.name, arguments).await;

        match serde_json::to_value(response) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, format!("Serialization error: {}", e)),
        }
    }

    async fn handle_resources_read(
        &self,
        id: serde_json::Value,
        params: serde_json::Value,
    ) -> JsonRpcResponse {
        #[derive(Deserialize)]
        struct ReadParams {
            uri: String,
        }

        let params: ReadParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {}", e)),
        };

        let body = match params.uri.as_str() {
            STATUS_URI => serde_json::to_string_pretty(&self.service.status().await),
            SCHEMA_URI => match self.service.schema().await {
                Ok(schema) => serde_json::to_string_pretty(schema.as_ref()),
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        INTERNAL_ERROR,
                        format!("Schema generation failed: {}", e),
                    )
                }
            },
            other => {
                return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Unknown resource: {}", other))
            }
        };

        match body {
            Ok(text) => JsonRpcResponse::success(
                id,
                serde_json::json!({
                    "contents": [{
                        "uri": params.uri,
                        "mimeType": "application/json",
                        "text": text
                    }]
                }),
            ),
            Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, format!("Serialization error: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gremlin_mcp_backend::MemoryGraph;
    use gremlin_mcp_core::SchemaConfig;
    use serde_json::{json, Value};

    fn server() -> McpServer<MemoryGraph> {
        let graph = MemoryGraph::from_json(
            r#"{
                "vertices": [
                    {"id": 1, "label": "person", "properties": {"status": "active"}},
                    {"id": 2, "label": "company"}
                ],
                "edges": [{"label": "worksAt", "from": 1, "to": 2}]
            }"#,
        )
        .unwrap();
        McpServer::new(Arc::new(GraphService::new(graph, SchemaConfig::default())))
    }

    fn request(id: Option<Value>, method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".into(),
            id,
            method: method.into(),
            params,
        }
    }

    async fn call(server: &McpServer<MemoryGraph>, method: &str, params: Value) -> JsonRpcResponse {
        server
            .handle_request_public(request(Some(json!(1)), method, params))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let response = call(&server(), "initialize", json!({})).await;
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "gremlin-mcp");
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let server = server();
        let response = server
            .handle_request_public(request(None, "notifications/initialized", Value::Null))
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_tools_list() {
        let response = call(&server(), "tools/list", Value::Null).await;
        let tools = response.result.unwrap()["tools"].as_array().unwrap().len();
        assert_eq!(tools, 6);
    }

    #[tokio::test]
    async fn test_tools_call_schema() {
        let response = call(
            &server(),
            "tools/call",
            json!({"name": "get_graph_schema"}),
        )
        .await;
        let result = response.result.unwrap();
        assert!(result.get("isError").is_none());
        let schema: Value =
            serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(
            schema["relationship_patterns"],
            json!([{"left_node": "person", "right_node": "company", "relation": "worksAt"}])
        );
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let server = server();
        let response = call(&server, "tools/call", json!({"arguments": {}})).await;
        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);

        let response = call(&server, "sampling/createMessage", json!({})).await;
        assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);

        let response = call(&server, "resources/read", json!({"uri": "gremlin://nope"})).await;
        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_read_schema_resource_uses_cache() {
        let server = server();
        let response = call(&server, "resources/read", json!({"uri": SCHEMA_URI})).await;
        let contents = &response.result.unwrap()["contents"][0];
        assert_eq!(contents["uri"], SCHEMA_URI);
        assert!(server.service().peek_schema().is_some());

        let response = call(&server, "resources/read", json!({"uri": STATUS_URI})).await;
        let status: Value = serde_json::from_str(
            response.result.unwrap()["contents"][0]["text"].as_str().unwrap(),
        )
        .unwrap();
        assert_eq!(status["schema_cached"], true);
    }

    #[tokio::test]
    async fn test_serve_over_line_transport() {
        let input = concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n",
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
            "garbage\n",
        );
        let mut output = Vec::new();
        server()
            .serve(LineTransport::new(input.as_bytes(), &mut output))
            .await
            .unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["error"]["code"], PARSE_ERROR);
    }
}

//! MCP transport implementations

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};

/// JSON-RPC request
///
/// A request without an `id` is a notification and gets no response.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

impl JsonRpcResponse {
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: serde_json::Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// One line read from the transport
pub enum Incoming {
    Request(JsonRpcRequest),
    /// The line was not a JSON-RPC request
    Malformed(serde_json::Error),
}

/// Line-delimited JSON-RPC over any async reader and writer
pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
}

/// The stdio transport MCP clients spawn the server with
pub type StdioTransport = LineTransport<BufReader<Stdin>, Stdout>;

impl StdioTransport {
    pub fn stdio() -> Self {
        LineTransport::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R: AsyncBufRead + Unpin, W: AsyncWrite + Unpin> LineTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Read the next request, skipping blank lines. `None` on EOF.
    pub async fn read_request(&mut self) -> std::io::Result<Option<Incoming>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                return Ok(None);
            }
            if !line.trim().is_empty() {
                break;
            }
        }

        Ok(Some(match serde_json::from_str(&line) {
            Ok(request) => Incoming::Request(request),
            Err(e) => Incoming::Malformed(e),
        }))
    }

    /// Write a JSON-RPC response as one line
    pub async fn write_response(&mut self, response: &JsonRpcResponse) -> std::io::Result<()> {
        let json = serde_json::to_string(response)?;
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_requests_and_skips_blank_lines() {
        let input = b"\n{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\nnot json\n" as &[u8];
        let mut transport = LineTransport::new(input, Vec::new());

        match transport.read_request().await.unwrap() {
            Some(Incoming::Request(r)) => {
                assert_eq!(r.method, "ping");
                assert_eq!(r.id, Some(serde_json::json!(1)));
            }
            _ => panic!("expected a request"),
        }
        assert!(matches!(
            transport.read_request().await.unwrap(),
            Some(Incoming::Malformed(_))
        ));
        assert!(transport.read_request().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_writes_one_line_per_response() {
        let mut transport = LineTransport::new(&b""[..], Vec::new());
        transport
            .write_response(&JsonRpcResponse::error(serde_json::json!(7), METHOD_NOT_FOUND, "nope"))
            .await
            .unwrap();

        let written = String::from_utf8(transport.writer).unwrap();
        assert_eq!(
            written,
            "{\"jsonrpc\":\"2.0\",\"id\":7,\"error\":{\"code\":-32601,\"message\":\"nope\"}}\n"
        );
    }
}

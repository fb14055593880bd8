//! Gremlin Server client over the HTTP endpoint
//!
//! Scripts are posted as `{"gremlin": ..., "aliases": {"g": <source>}}` to
//! `/gremlin`. The underlying HTTP client is created on first use and rebuilt
//! once it has been idle for longer than the configured timeout. Each
//! traversal is bounded by the request timeout.

use std::time::Duration;

use async_trait::async_trait;
use gremlin_mcp_core::normalize::normalize_results;
use gremlin_mcp_core::{ConnectionConfig, Endpoint, GraphClient, Result, Traversal};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::{BackendError, BackendResult};

#[derive(Debug, Deserialize)]
struct ResponseStatus {
    code: u16,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResponseResult {
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct GremlinResponse {
    status: ResponseStatus,
    result: Option<ResponseResult>,
}

struct Session {
    http: reqwest::Client,
    last_used: Instant,
}

/// Client for a Gremlin Server reachable over HTTP
pub struct GremlinHttpClient {
    config: ConnectionConfig,
    endpoint: Endpoint,
    url: String,
    session: Mutex<Option<Session>>,
}

impl GremlinHttpClient {
    /// Validate the connection settings. No network traffic happens until the
    /// first traversal.
    pub fn new(config: ConnectionConfig) -> BackendResult<Self> {
        let endpoint = config.parse_endpoint().map_err(BackendError::Config)?;
        let scheme = if config.use_ssl { "https" } else { "http" };
        let url = format!("{}://{}:{}/gremlin", scheme, endpoint.host, endpoint.port);

        Ok(Self {
            config,
            endpoint,
            url,
            session: Mutex::new(None),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_http(&self) -> BackendResult<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .pool_idle_timeout(self.config.idle_timeout())
            .build()?)
    }

    /// A client that has been used within the idle timeout, creating one if needed.
    async fn http(&self) -> BackendResult<reqwest::Client> {
        let mut session = self.session.lock().await;
        let idle = self.config.idle_timeout();

        let stale = match session.as_ref() {
            Some(s) => s.last_used.elapsed() >= idle,
            None => true,
        };
        if stale {
            if session.is_some() {
                tracing::info!(url = %self.url, "Connection idle, reconnecting");
            } else {
                tracing::debug!(url = %self.url, "Opening connection");
            }
            *session = Some(Session {
                http: self.build_http()?,
                last_used: Instant::now(),
            });
        }

        match session.as_mut() {
            Some(s) => {
                s.last_used = Instant::now();
                Ok(s.http.clone())
            }
            None => Err(BackendError::Config("connection unavailable".into())),
        }
    }

    fn request_body(&self, script: &str) -> Value {
        json!({
            "gremlin": script,
            "aliases": {"g": self.endpoint.traversal_source},
        })
    }

    async fn submit(&self, script: &str) -> BackendResult<Vec<Value>> {
        let http = self.http().await?;
        let mut request = http.post(&self.url).json(&self.request_body(script));
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_deref());
        }

        tracing::trace!(script, "Submitting traversal");
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(BackendError::Server {
                code: status.as_u16(),
                message: server_message(&body),
            });
        }
        parse_response(&body)
    }
}

/// Extract and normalize the result rows of a Gremlin Server response body.
fn parse_response(body: &str) -> BackendResult<Vec<Value>> {
    let response: GremlinResponse =
        serde_json::from_str(body).map_err(|e| BackendError::Response(e.to_string()))?;

    // 204 is NO_CONTENT: a successful traversal with an empty result.
    if response.status.code == 204 {
        return Ok(Vec::new());
    }
    if response.status.code >= 300 {
        return Err(BackendError::Server {
            code: response.status.code,
            message: response.status.message,
        });
    }

    Ok(response
        .result
        .map(|r| normalize_results(r.data))
        .unwrap_or_default())
}

fn server_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.pointer("/status/message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[async_trait]
impl GraphClient for GremlinHttpClient {
    async fn execute(&self, traversal: &Traversal) -> Result<Vec<Value>> {
        let limit = self.config.request_timeout();
        match tokio::time::timeout(limit, self.submit(&traversal.to_gremlin())).await {
            Ok(rows) => Ok(rows?),
            Err(_) => {
                tracing::warn!(url = %self.url, ?limit, "Traversal timed out");
                Err(BackendError::RequestTimeout(limit).into())
            }
        }
    }

    async fn close(&self) -> Result<()> {
        if self.session.lock().await.take().is_some() {
            tracing::debug!(url = %self.url, "Connection closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str, use_ssl: bool) -> GremlinHttpClient {
        GremlinHttpClient::new(ConnectionConfig {
            endpoint: endpoint.to_string(),
            use_ssl,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_url_from_endpoint() {
        assert_eq!(client("localhost:8182", false).url(), "http://localhost:8182/gremlin");
        assert_eq!(client("db.example:443/g2", true).url(), "https://db.example:443/gremlin");
    }

    #[test]
    fn test_request_body_aliases_source() {
        let body = client("localhost:8182/graph", false).request_body("g.V().count()");
        assert_eq!(body["gremlin"], "g.V().count()");
        assert_eq!(body["aliases"]["g"], "graph");
    }

    #[test]
    fn test_bad_endpoint_rejected() {
        let err = GremlinHttpClient::new(ConnectionConfig {
            endpoint: "no-port".into(),
            ..Default::default()
        });
        assert!(matches!(err, Err(BackendError::Config(_))));
    }

    #[test]
    fn test_parse_graphson_response() {
        let body = r#"{
            "requestId": "x",
            "status": {"message": "", "code": 200, "attributes": {}},
            "result": {"data": {"@type": "g:List", "@value": [
                {"@type": "g:Int64", "@value": 3}
            ]}, "meta": {}}
        }"#;
        assert_eq!(parse_response(body).unwrap(), vec![json!(3)]);
    }

    #[test]
    fn test_parse_error_status() {
        let body = r#"{"status": {"message": "No such property", "code": 597}, "result": null}"#;
        match parse_response(body) {
            Err(BackendError::Server { code, message }) => {
                assert_eq!(code, 597);
                assert_eq!(message, "No such property");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_no_content() {
        let body = r#"{"status": {"code": 204}, "result": {"data": null}}"#;
        assert!(parse_response(body).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stalled_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        // Accept connections and never answer.
        let _server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let c = GremlinHttpClient::new(ConnectionConfig {
            endpoint: format!("127.0.0.1:{}", port),
            request_timeout_secs: 1,
            ..Default::default()
        })
        .unwrap();

        let started = std::time::Instant::now();
        let err = c.execute(&Traversal::Raw("g.V()".into())).await.unwrap_err();
        assert!(matches!(err, gremlin_mcp_core::Error::Connectivity(_)));
        assert!(err.to_string().contains("timed out"));
        assert!(err.is_retryable());
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_close_without_session() {
        let c = client("localhost:8182", false);
        c.close().await.unwrap();
    }
}

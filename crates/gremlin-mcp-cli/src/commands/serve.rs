//! MCP server command

use clap::Args;
use gremlin_mcp_server::McpServer;
use std::sync::Arc;

use crate::AppContext;

#[derive(Args)]
pub struct ServeArgs {
    /// Serve MCP over HTTP/SSE on this address instead of stdio
    #[arg(long, value_name = "ADDR")]
    pub sse: Option<String>,

    /// Bearer token required by the SSE endpoints
    #[arg(long, env = "GREMLIN_MCP_AUTH_TOKEN", hide_env_values = true, requires = "sse")]
    pub auth_token: Option<String>,
}

pub async fn run(args: &ServeArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let server = Arc::new(McpServer::new(ctx.service.clone()));

    match &args.sse {
        Some(addr) => run_sse(server, addr, args.auth_token.clone()).await,
        None => server.run_stdio().await,
    }
}

#[cfg(feature = "sse")]
async fn run_sse<C: gremlin_mcp_core::GraphClient + 'static>(
    server: Arc<McpServer<C>>,
    addr: &str,
    auth_token: Option<String>,
) -> anyhow::Result<()> {
    if auth_token.is_none() && !is_loopback(addr) {
        tracing::warn!(addr, "SSE server exposed without an auth token");
    }
    gremlin_mcp_server::run_sse_server(server, addr, auth_token).await
}

#[cfg(not(feature = "sse"))]
async fn run_sse<C>(
    _server: Arc<McpServer<C>>,
    _addr: &str,
    _auth_token: Option<String>,
) -> anyhow::Result<()> {
    anyhow::bail!("Built without the 'sse' feature; rebuild with --features sse")
}

#[cfg(feature = "sse")]
fn is_loopback(addr: &str) -> bool {
    addr.starts_with("127.") || addr.starts_with("localhost") || addr.starts_with("[::1]")
}

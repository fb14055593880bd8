//! gremlin-mcp - MCP server and CLI for Gremlin-compatible graph databases

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{completions, io, query, schema, serve, status};
use config::{Config, ConnectionArgs, SchemaArgs};
use gremlin_mcp_backend::MemoryGraph;
use gremlin_mcp_core::{GraphClient, GraphService};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "gremlin-mcp")]
#[command(author, version, about = "MCP server and schema explorer for Gremlin graph databases")]
pub struct Cli {
    /// Config file (default: <config dir>/gremlin-mcp/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Serve a graph file from memory instead of connecting to a server
    #[arg(short, long, global = true)]
    pub graph_file: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub schema: SchemaArgs,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }

    /// File settings with flag and environment overrides applied.
    pub fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        self.connection.apply(&mut config.connection);
        self.schema.apply(&mut config.schema);
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the MCP server (stdio unless --sse is given)
    Serve(serve::ServeArgs),
    /// Check the graph connection
    Status,
    /// Print the graph schema
    Schema(schema::SchemaCmdArgs),
    /// Run a Gremlin traversal
    Query(query::QueryArgs),
    /// Import vertices and edges from a file
    Import(io::ImportArgs),
    /// Export traversal results
    Export(io::ExportArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Application context with the graph service
pub struct AppContext {
    pub service: Arc<GraphService<Arc<dyn GraphClient>>>,
}

impl AppContext {
    pub fn new(cli: &Cli) -> anyhow::Result<Self> {
        let config = cli.resolve_config()?;

        let client: Arc<dyn GraphClient> = match &cli.graph_file {
            Some(path) => Arc::new(MemoryGraph::load(path)?),
            None => connect(&config)?,
        };

        Ok(Self {
            service: Arc::new(GraphService::new(client, config.schema)),
        })
    }
}

#[cfg(feature = "http")]
fn connect(config: &Config) -> anyhow::Result<Arc<dyn GraphClient>> {
    let client = gremlin_mcp_backend::GremlinHttpClient::new(config.connection.clone())?;
    tracing::debug!(url = client.url(), "Using Gremlin Server");
    Ok(Arc::new(client))
}

#[cfg(not(feature = "http"))]
fn connect(_config: &Config) -> anyhow::Result<Arc<dyn GraphClient>> {
    anyhow::bail!("Built without the 'http' feature; pass --graph-file to use an in-memory graph")
}

fn init_logging(cli: &Cli) {
    let level = match cli.verbose {
        0 if cli.quiet => "error".to_string(),
        0 => std::env::var("LOG_LEVEL").unwrap_or_else(|_| "warn".to_string()),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    // stdout carries MCP traffic, so logs go to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    tracing::debug!("Starting gremlin-mcp CLI");

    // Commands that never touch the graph
    match &cli.command {
        Commands::Config(args) => return commands::config::run(args, &cli),
        Commands::Completions(args) => return completions::run(args),
        _ => {}
    }

    let ctx = AppContext::new(&cli)?;

    let result = match &cli.command {
        Commands::Serve(args) => serve::run(args, &ctx).await,
        Commands::Status => status::run(&cli, &ctx).await,
        Commands::Schema(args) => schema::run(args, &cli, &ctx).await,
        Commands::Query(args) => query::run(args, &ctx).await,
        Commands::Import(args) => io::run_import(args, &cli, &ctx).await,
        Commands::Export(args) => io::run_export(args, &cli, &ctx).await,
        Commands::Config(_) | Commands::Completions(_) => Ok(()),
    };

    ctx.service.client().close().await?;
    result
}

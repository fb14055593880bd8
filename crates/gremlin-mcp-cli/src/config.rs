//! CLI configuration
//!
//! Settings resolve in order: command-line flag or environment variable,
//! then the TOML config file, then built-in defaults.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use gremlin_mcp_core::{ConnectionConfig, SchemaConfig};
use serde::{Deserialize, Serialize};

/// Default config file location
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gremlin-mcp")
        .join("config.toml")
}

/// Contents of the config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub schema: SchemaConfig,
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing default file yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (config_file_path(), false),
        };

        if !path.exists() {
            if explicit {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = toml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Connection overrides
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Gremlin Server endpoint (host:port[/traversal_source])
    #[arg(long, env = "GREMLIN_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Connect over TLS
    #[arg(long, env = "GREMLIN_USE_SSL", global = true, value_parser = clap::builder::BoolishValueParser::new())]
    pub use_ssl: Option<bool>,

    #[arg(long, env = "GREMLIN_USERNAME", global = true)]
    pub username: Option<String>,

    #[arg(long, env = "GREMLIN_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Seconds before an idle connection is rebuilt
    #[arg(long, env = "GREMLIN_IDLE_TIMEOUT", global = true)]
    pub idle_timeout: Option<u64>,

    /// Seconds a single traversal may run before it is abandoned
    #[arg(long, env = "GREMLIN_REQUEST_TIMEOUT", global = true)]
    pub request_timeout: Option<u64>,
}

/// Schema generation overrides
#[derive(Args, Debug, Clone, Default)]
pub struct SchemaArgs {
    #[arg(long, env = "GREMLIN_SCHEMA_INCLUDE_SAMPLE_VALUES", global = true, value_parser = clap::builder::BoolishValueParser::new())]
    pub include_sample_values: Option<bool>,

    #[arg(long, env = "GREMLIN_SCHEMA_MAX_ENUM_VALUES", global = true)]
    pub max_enum_values: Option<usize>,

    #[arg(long, env = "GREMLIN_SCHEMA_INCLUDE_COUNTS", global = true, value_parser = clap::builder::BoolishValueParser::new())]
    pub include_counts: Option<bool>,

    #[arg(long, env = "GREMLIN_ENUM_DISCOVERY_ENABLED", global = true, value_parser = clap::builder::BoolishValueParser::new())]
    pub enum_discovery: Option<bool>,

    #[arg(long, env = "GREMLIN_ENUM_CARDINALITY_THRESHOLD", global = true)]
    pub enum_threshold: Option<usize>,

    /// Comma separated property keys never sampled
    #[arg(long, env = "GREMLIN_ENUM_PROPERTY_BLACKLIST", global = true)]
    pub enum_blacklist: Option<String>,

    /// Schema generation deadline in milliseconds
    #[arg(long, env = "GREMLIN_SCHEMA_TIMEOUT_MS", global = true)]
    pub schema_timeout_ms: Option<u64>,

    /// Labels analyzed per batch
    #[arg(long = "schema-batch-size", env = "GREMLIN_SCHEMA_BATCH_SIZE", global = true)]
    pub batch_size: Option<usize>,

    #[arg(long, env = "GREMLIN_SCHEMA_CACHE_TTL_SECS", global = true)]
    pub cache_ttl_secs: Option<u64>,
}

impl ConnectionArgs {
    pub fn apply(&self, config: &mut ConnectionConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(use_ssl) = self.use_ssl {
            config.use_ssl = use_ssl;
        }
        if self.username.is_some() {
            config.username = self.username.clone();
        }
        if self.password.is_some() {
            config.password = self.password.clone();
        }
        if let Some(secs) = self.idle_timeout {
            config.idle_timeout_secs = secs;
        }
        if let Some(secs) = self.request_timeout {
            config.request_timeout_secs = secs;
        }
    }
}

impl SchemaArgs {
    pub fn apply(&self, config: &mut SchemaConfig) {
        if let Some(v) = self.include_sample_values {
            config.include_sample_values = v;
        }
        if let Some(v) = self.max_enum_values {
            config.max_enum_values = v;
        }
        if let Some(v) = self.include_counts {
            config.include_counts = v;
        }
        if let Some(v) = self.enum_discovery {
            config.enum_discovery_enabled = v;
        }
        if let Some(v) = self.enum_threshold {
            config.enum_cardinality_threshold = v;
        }
        if let Some(raw) = &self.enum_blacklist {
            config.enum_property_blacklist = SchemaConfig::parse_blacklist(raw);
        }
        if let Some(v) = self.schema_timeout_ms {
            config.timeout_ms = v;
        }
        if let Some(v) = self.batch_size {
            config.batch_size = v;
        }
        if let Some(v) = self.cache_ttl_secs {
            config.cache_ttl_secs = v;
        }
    }
}

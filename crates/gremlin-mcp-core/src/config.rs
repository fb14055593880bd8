//! Schema generation and connection settings
//!
//! Both structs are resolved once by the binary (flags, environment, config
//! file) and handed to the core by reference.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Upper bound on traversals in flight during one schema generation.
pub const MAX_CONCURRENCY: usize = 10;

/// Property keys excluded from sampling unless configured otherwise.
pub const DEFAULT_ENUM_BLACKLIST: &[&str] = &[
    "id",
    "pk",
    "name",
    "description",
    "startDate",
    "endDate",
    "timestamp",
    "createdAt",
    "updatedAt",
];

/// Settings that shape schema generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Attach up to five sample values to each analyzed property.
    pub include_sample_values: bool,

    /// Distinct values fetched per property is capped at this plus one.
    pub max_enum_values: usize,

    /// Issue a count query per label.
    pub include_counts: bool,

    pub enum_discovery_enabled: bool,

    /// A property with at most this many distinct sampled values is an enum.
    pub enum_cardinality_threshold: usize,

    /// Keys that are never sampled; they are reported with type `unknown`.
    pub enum_property_blacklist: BTreeSet<String>,

    pub timeout_ms: u64,

    /// Labels analyzed together per group.
    pub batch_size: usize,

    pub cache_ttl_secs: u64,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            include_sample_values: false,
            max_enum_values: 10,
            include_counts: true,
            enum_discovery_enabled: true,
            enum_cardinality_threshold: 10,
            enum_property_blacklist: DEFAULT_ENUM_BLACKLIST
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeout_ms: 30_000,
            batch_size: 10,
            cache_ttl_secs: 300,
        }
    }
}

impl SchemaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Group size used by the orchestrator (never zero).
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    /// Concurrency ceiling for one generation.
    pub fn concurrency_limit(&self) -> usize {
        self.effective_batch_size().min(MAX_CONCURRENCY)
    }

    pub fn is_blacklisted(&self, key: &str) -> bool {
        self.enum_property_blacklist.contains(key)
    }

    /// Parse a comma separated blacklist, ignoring blank entries.
    pub fn parse_blacklist(raw: &str) -> BTreeSet<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// How to reach the Gremlin Server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// `host:port` optionally followed by `/traversal_source`.
    pub endpoint: String,
    pub use_ssl: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Seconds of inactivity before the connection is dropped and rebuilt.
    pub idle_timeout_secs: u64,
    /// Seconds one traversal may take, from sending it to the last byte of the reply.
    pub request_timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: "localhost:8182".to_string(),
            use_ssl: false,
            username: None,
            password: None,
            idle_timeout_secs: 300,
            request_timeout_secs: 120,
        }
    }
}

/// Parsed form of [`ConnectionConfig::endpoint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub traversal_source: String,
}

impl ConnectionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Split `host:port[/source]` into its parts.
    pub fn parse_endpoint(&self) -> Result<Endpoint, String> {
        let (address, source) = match self.endpoint.split_once('/') {
            Some((address, source)) if !source.is_empty() => (address, source),
            Some((address, _)) => (address, "g"),
            None => (self.endpoint.as_str(), "g"),
        };

        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| format!("Endpoint must be host:port, got '{}'", self.endpoint))?;
        if host.is_empty() {
            return Err(format!("Endpoint host is empty in '{}'", self.endpoint));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| format!("Invalid port '{}' in endpoint '{}'", port, self.endpoint))?;

        Ok(Endpoint {
            host: host.to_string(),
            port,
            traversal_source: source.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_config() {
        let config = SchemaConfig::default();
        assert_eq!(config.max_enum_values, 10);
        assert_eq!(config.enum_cardinality_threshold, 10);
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert!(config.is_blacklisted("id"));
        assert!(!config.is_blacklisted("status"));
    }

    #[test]
    fn test_concurrency_limit_is_capped() {
        let mut config = SchemaConfig {
            batch_size: 25,
            ..Default::default()
        };
        assert_eq!(config.concurrency_limit(), MAX_CONCURRENCY);

        config.batch_size = 0;
        assert_eq!(config.effective_batch_size(), 1);
        assert_eq!(config.concurrency_limit(), 1);
    }

    #[test]
    fn test_parse_blacklist() {
        let parsed = SchemaConfig::parse_blacklist(" id, ,secret,id ");
        assert_eq!(parsed.len(), 2);
        assert!(parsed.contains("secret"));
    }

    #[test]
    fn test_partial_toml_like_json_uses_defaults() {
        let config: SchemaConfig = serde_json::from_str(r#"{"batch_size": 3}"#).unwrap();
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.max_enum_values, 10);
    }

    #[test]
    fn test_parse_endpoint() {
        let mut conn = ConnectionConfig::default();
        let endpoint = conn.parse_endpoint().unwrap();
        assert_eq!(endpoint.host, "localhost");
        assert_eq!(endpoint.port, 8182);
        assert_eq!(endpoint.traversal_source, "g");

        conn.endpoint = "db.internal:8183/social".to_string();
        let endpoint = conn.parse_endpoint().unwrap();
        assert_eq!(endpoint.host, "db.internal");
        assert_eq!(endpoint.port, 8183);
        assert_eq!(endpoint.traversal_source, "social");

        conn.endpoint = "nohost".to_string();
        assert!(conn.parse_endpoint().is_err());
        conn.endpoint = "host:notaport".to_string();
        assert!(conn.parse_endpoint().is_err());
    }
}

//! Server configuration.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use bankledger_ledger::store::redis_store::DEFAULT_KEY_PREFIX;
use bankledger_ledger::GateMode;

/// Account store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// Redis hashes over one shared connection.
    #[default]
    Redis,
    /// Process-local map. Lost on restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(StoreBackend::Redis),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("Unknown store backend: {other}")),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Redis => f.write_str("redis"),
            StoreBackend::Memory => f.write_str("memory"),
        }
    }
}

/// Main server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Node ID, generated at startup when absent.
    pub node_id: Option<String>,
    /// Listen address.
    pub listen_addr: String,
    /// Listen port.
    pub listen_port: u16,
    /// Store backend.
    pub store: StoreBackend,
    /// Redis URL, used by the Redis backend.
    pub redis_url: String,
    /// Prefix of account keys in Redis.
    pub key_prefix: String,
    /// Mutation locking strategy.
    pub gate_mode: GateMode,
    /// In-flight calls allowed per client connection.
    pub concurrency_limit: usize,
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            node_id: None,
            listen_addr: "0.0.0.0".to_string(),
            listen_port: 50051,
            store: StoreBackend::Redis,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            gate_mode: GateMode::Global,
            concurrency_limit: 2,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparsable values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(id) = lookup("BANK_NODE_ID") {
            config.node_id = Some(id);
        }

        if let Some(addr) = lookup("BANK_LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        if let Some(port) = lookup("BANK_LISTEN_PORT") {
            if let Ok(port) = port.parse() {
                config.listen_port = port;
            }
        }

        if let Some(store) = lookup("BANK_STORE") {
            if let Ok(store) = store.parse() {
                config.store = store;
            }
        }

        if let Some(url) = lookup("REDIS_URL") {
            config.redis_url = url;
        }

        if let Some(prefix) = lookup("BANK_KEY_PREFIX") {
            config.key_prefix = prefix;
        }

        if let Some(mode) = lookup("BANK_GATE_MODE") {
            if let Ok(mode) = mode.parse() {
                config.gate_mode = mode;
            }
        }

        if let Some(limit) = lookup("BANK_CONCURRENCY_LIMIT") {
            if let Ok(limit) = limit.parse() {
                config.concurrency_limit = limit;
            }
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Socket address to bind.
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.listen_addr, self.listen_port)
            .parse()
            .map_err(|e| format!("Invalid listen address {}: {e}", self.listen_addr))
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_port == 0 {
            return Err("Listen port cannot be 0".to_string());
        }

        self.socket_addr()?;

        if self.store == StoreBackend::Redis && self.redis_url.is_empty() {
            return Err("Redis URL cannot be empty".to_string());
        }

        if self.concurrency_limit == 0 {
            return Err("Concurrency limit must be at least 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.socket_addr().unwrap().port(), 50051);
        assert_eq!(config.key_prefix, "account:");
    }

    #[test]
    fn test_invalid_config() {
        let mut config = ServerConfig::default();
        config.listen_port = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.concurrency_limit = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.listen_addr = "not an address".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_lookup() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("BANK_LISTEN_PORT", "6000"),
            ("BANK_STORE", "memory"),
            ("BANK_GATE_MODE", "per-account"),
            ("BANK_CONCURRENCY_LIMIT", "16"),
            ("BANK_KEY_PREFIX", "bank:"),
        ]));
        assert_eq!(config.listen_port, 6000);
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.gate_mode, GateMode::PerAccount);
        assert_eq!(config.concurrency_limit, 16);
        assert_eq!(config.key_prefix, "bank:");
    }

    #[test]
    fn test_unparsable_values_keep_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("BANK_LISTEN_PORT", "port"),
            ("BANK_STORE", "postgres"),
        ]));
        assert_eq!(config.listen_port, 50051);
        assert_eq!(config.store, StoreBackend::Redis);
    }
}

//! Client configuration.

use std::time::Duration;

/// Configuration for [`crate::BankClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server URL, `http://` or `https://`.
    pub server_url: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Per-call timeout.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:50051".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Config for a server URL with default timeouts.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("BANK_SERVER_URL") {
            config.server_url = url;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.server_url.is_empty() {
            return Err("Server URL cannot be empty".to_string());
        }

        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(format!(
                "Server URL must start with http:// or https://, got {}",
                self.server_url
            ));
        }

        if self.connect_timeout.is_zero() || self.request_timeout.is_zero() {
            return Err("Timeouts must be positive".to_string());
        }

        Ok(())
    }
}

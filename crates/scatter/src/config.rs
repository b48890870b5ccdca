//! Gateway configuration.
//!
//! Settings can come from a TOML file, from `SCATTER_*` environment
//! variables, or from code via the builder methods. The bot token is kept
//! out of config files and read from `SCATTER_TOKEN` instead.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ScatterError;
use crate::gateway::ReconnectConfig;

/// Production gateway endpoint.
pub const DEFAULT_WS_URL: &str = "wss://scatter.starforge.games/ws";

/// Environment variable holding the bot token.
pub const TOKEN_ENV: &str = "SCATTER_TOKEN";

/// Environment variable overriding the gateway URL.
pub const WS_URL_ENV: &str = "SCATTER_WS_URL";

/// Gateway connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Gateway WebSocket URL.
    pub ws_url: String,
    /// Reconnection backoff.
    pub reconnect: ReconnectConfig,
    /// Optional limit on opening the transport, in milliseconds.
    pub connect_timeout_ms: Option<u64>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            reconnect: ReconnectConfig::default(),
            connect_timeout_ms: None,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScatterError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ScatterError::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self, ScatterError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ScatterError::Config(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `SCATTER_WS_URL` when set.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting configuration is invalid.
    pub fn from_env() -> Result<Self, ScatterError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting configuration is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ScatterError> {
        let mut config = Self::default();
        if let Some(url) = lookup(WS_URL_ENV).filter(|u| !u.is_empty()) {
            config.ws_url = url;
        }
        config.validate()?;
        Ok(config)
    }

    /// Set the gateway URL.
    #[must_use]
    pub fn with_ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = url.into();
        self
    }

    /// Set reconnection behavior.
    #[must_use]
    pub const fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Set the transport connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// The transport connect timeout, if any.
    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), ScatterError> {
        if self.ws_url.is_empty() {
            return Err(ScatterError::Config("ws_url cannot be empty".to_string()));
        }

        if !self.ws_url.starts_with("ws://") && !self.ws_url.starts_with("wss://") {
            return Err(ScatterError::Config(
                "ws_url must start with ws:// or wss://".to_string(),
            ));
        }

        if self.reconnect.initial_delay_ms == 0 {
            return Err(ScatterError::Config(
                "reconnect.initial_delay_ms must be greater than 0".to_string(),
            ));
        }

        if self.reconnect.max_delay_ms < self.reconnect.initial_delay_ms {
            return Err(ScatterError::Config(
                "reconnect.max_delay_ms cannot be less than reconnect.initial_delay_ms"
                    .to_string(),
            ));
        }

        if self.connect_timeout_ms == Some(0) {
            return Err(ScatterError::Config(
                "connect_timeout_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Read the bot token from `SCATTER_TOKEN`.
///
/// # Errors
///
/// Returns an error if the variable is unset or empty.
pub fn token_from_env() -> Result<String, ScatterError> {
    std::env::var(TOKEN_ENV)
        .ok()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ScatterError::Config(format!("{TOKEN_ENV} is not set")))
}

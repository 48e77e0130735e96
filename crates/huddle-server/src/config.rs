use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = "huddle.toml";

/// Top-level server configuration, loaded from `huddle.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub limits: LimitsConfig,
    pub handshake: HandshakeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8766".to_string(),
            limits: LimitsConfig::default(),
            handshake: HandshakeConfig::default(),
        }
    }
}

/// Infrastructure limits (connection caps, buffer sizes, rate limits).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_connections: usize,
    /// Outbound queue depth per player before messages are dropped.
    pub player_message_buffer: usize,
    /// Inbound messages per second allowed per connection (token bucket).
    pub rate_limit_per_sec: f64,
    /// Optional cap on join names, in characters. Unset accepts any
    /// non-empty name.
    pub max_name_len: Option<usize>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_connections: 200,
            player_message_buffer: 256,
            rate_limit_per_sec: 50.0,
            max_name_len: None,
        }
    }
}

/// Join handshake settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HandshakeConfig {
    /// How long a fresh connection may wait before sending its `join`.
    pub join_timeout_secs: u64,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            join_timeout_secs: 10,
        }
    }
}

impl HandshakeConfig {
    pub fn join_timeout(&self) -> Duration {
        Duration::from_secs(self.join_timeout_secs)
    }
}

impl ServerConfig {
    /// Check the configuration before the server binds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::InvalidListenAddr(self.listen_addr.clone()));
        }
        if self.limits.max_connections == 0 {
            return Err(ConfigError::MustBePositive("limits.max_connections"));
        }
        if self.limits.player_message_buffer == 0 {
            return Err(ConfigError::MustBePositive("limits.player_message_buffer"));
        }
        if self.limits.rate_limit_per_sec <= 0.0 {
            return Err(ConfigError::MustBePositive("limits.rate_limit_per_sec"));
        }
        if self.limits.max_name_len == Some(0) {
            return Err(ConfigError::MustBePositive("limits.max_name_len"));
        }
        if self.handshake.join_timeout_secs == 0 {
            return Err(ConfigError::MustBePositive("handshake.join_timeout_secs"));
        }
        Ok(())
    }

    /// Load config from `huddle.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string(CONFIG_FILE) {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from {CONFIG_FILE}");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse {CONFIG_FILE}: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No {CONFIG_FILE} found, using defaults");
                ServerConfig::default()
            },
        };
        config.apply_env_overrides();
        config
    }

    /// Environment variables win over file values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("HUDDLE_LISTEN_ADDR")
            && !addr.is_empty()
        {
            self.listen_addr = addr;
        }
        if let Ok(val) = std::env::var("HUDDLE_MAX_CONNECTIONS")
            && let Ok(n) = val.parse::<usize>()
        {
            self.limits.max_connections = n;
        }
        if let Ok(val) = std::env::var("HUDDLE_RATE_LIMIT")
            && let Ok(n) = val.parse::<f64>()
        {
            self.limits.rate_limit_per_sec = n;
        }
        if let Ok(val) = std::env::var("HUDDLE_MAX_NAME_LEN")
            && let Ok(n) = val.parse::<usize>()
        {
            self.limits.max_name_len = Some(n);
        }
        if let Ok(val) = std::env::var("HUDDLE_JOIN_TIMEOUT_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            self.handshake.join_timeout_secs = n;
        }
    }
}

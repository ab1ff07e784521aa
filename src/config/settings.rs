use std::time::Duration;

use serde::Deserialize;

use crate::utils::error::ConfigError;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;
pub const DEFAULT_INITIAL_RECONNECT_DELAY_MS: u64 = 1000;
pub const DEFAULT_MAX_RECONNECT_DELAY_MS: u64 = 60_000;
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 20;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 30_000;

/// Client configuration.
///
/// Built once through [`ClientConfig::builder`], validated in `build()` and
/// then shared read-only by every component for the lifetime of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    host: String,
    port: u16,
    max_reconnect_attempts: u32,
    initial_reconnect_delay_ms: u64,
    max_reconnect_delay_ms: u64,
    heartbeat_interval_secs: u64,
    connect_timeout_ms: u64,
    auto_reconnect: bool,
}

impl ClientConfig {
    pub fn builder(host: impl Into<String>, port: u16) -> ClientConfigBuilder {
        ClientConfigBuilder::new(host, port)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, as used in log lines.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Consecutive failures tolerated before the client gives up.
    pub fn max_reconnect_attempts(&self) -> u32 {
        self.max_reconnect_attempts
    }

    pub fn initial_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.initial_reconnect_delay_ms)
    }

    pub fn max_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.max_reconnect_delay_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }

    /// Builder seeded with this configuration, for applying overrides.
    pub fn to_builder(&self) -> ClientConfigBuilder {
        ClientConfigBuilder {
            host: self.host.clone(),
            port: self.port,
            max_reconnect_attempts: self.max_reconnect_attempts,
            initial_reconnect_delay_ms: self.initial_reconnect_delay_ms,
            max_reconnect_delay_ms: self.max_reconnect_delay_ms,
            heartbeat_interval_secs: self.heartbeat_interval_secs,
            connect_timeout_ms: self.connect_timeout_ms,
            auto_reconnect: self.auto_reconnect,
        }
    }

    /// Same settings pointed at another server.
    pub fn with_address(&self, host: impl Into<String>, port: u16) -> ClientConfigBuilder {
        let mut builder = self.to_builder();
        builder.host = host.into();
        builder.port = port;
        builder
    }
}

/// Builder for [`ClientConfig`].
///
/// Setters only record values; every check happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    host: String,
    port: u16,
    max_reconnect_attempts: u32,
    initial_reconnect_delay_ms: u64,
    max_reconnect_delay_ms: u64,
    heartbeat_interval_secs: u64,
    connect_timeout_ms: u64,
    auto_reconnect: bool,
}

impl ClientConfigBuilder {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            initial_reconnect_delay_ms: DEFAULT_INITIAL_RECONNECT_DELAY_MS,
            max_reconnect_delay_ms: DEFAULT_MAX_RECONNECT_DELAY_MS,
            heartbeat_interval_secs: DEFAULT_HEARTBEAT_INTERVAL_SECS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            auto_reconnect: true,
        }
    }

    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    pub fn initial_reconnect_delay_ms(mut self, delay_ms: u64) -> Self {
        self.initial_reconnect_delay_ms = delay_ms;
        self
    }

    pub fn max_reconnect_delay_ms(mut self, delay_ms: u64) -> Self {
        self.max_reconnect_delay_ms = delay_ms;
        self
    }

    pub fn heartbeat_interval_secs(mut self, secs: u64) -> Self {
        self.heartbeat_interval_secs = secs;
        self
    }

    pub fn connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }

    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(ConfigError::ZeroHeartbeatInterval);
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::ZeroConnectTimeout);
        }
        if self.initial_reconnect_delay_ms > self.max_reconnect_delay_ms {
            return Err(ConfigError::DelayOrdering {
                initial_ms: self.initial_reconnect_delay_ms,
                max_ms: self.max_reconnect_delay_ms,
            });
        }

        Ok(ClientConfig {
            host: self.host,
            port: self.port,
            max_reconnect_attempts: self.max_reconnect_attempts,
            initial_reconnect_delay_ms: self.initial_reconnect_delay_ms,
            max_reconnect_delay_ms: self.max_reconnect_delay_ms,
            heartbeat_interval_secs: self.heartbeat_interval_secs,
            connect_timeout_ms: self.connect_timeout_ms,
            auto_reconnect: self.auto_reconnect,
        })
    }
}

/// Partial configuration settings loaded from files or environment.
///
/// Every field is optional; missing values fall back to the builder defaults.
#[derive(Debug, Default, Deserialize)]
pub struct PartialSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_reconnect_attempts: Option<u32>,
    pub initial_reconnect_delay_ms: Option<u64>,
    pub max_reconnect_delay_ms: Option<u64>,
    pub heartbeat_interval_secs: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub auto_reconnect: Option<bool>,
}

impl PartialSettings {
    /// Merge with defaults and validate.
    pub fn into_config(self) -> Result<ClientConfig, ConfigError> {
        let mut builder = ClientConfig::builder(
            self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            self.port.unwrap_or(DEFAULT_PORT),
        );

        if let Some(attempts) = self.max_reconnect_attempts {
            builder = builder.max_reconnect_attempts(attempts);
        }
        if let Some(delay) = self.initial_reconnect_delay_ms {
            builder = builder.initial_reconnect_delay_ms(delay);
        }
        if let Some(delay) = self.max_reconnect_delay_ms {
            builder = builder.max_reconnect_delay_ms(delay);
        }
        if let Some(secs) = self.heartbeat_interval_secs {
            builder = builder.heartbeat_interval_secs(secs);
        }
        if let Some(timeout) = self.connect_timeout_ms {
            builder = builder.connect_timeout_ms(timeout);
        }
        if let Some(enabled) = self.auto_reconnect {
            builder = builder.auto_reconnect(enabled);
        }

        builder.build()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            initial_reconnect_delay_ms: DEFAULT_INITIAL_RECONNECT_DELAY_MS,
            max_reconnect_delay_ms: DEFAULT_MAX_RECONNECT_DELAY_MS,
            heartbeat_interval_secs: DEFAULT_HEARTBEAT_INTERVAL_SECS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            auto_reconnect: true,
        }
    }
}

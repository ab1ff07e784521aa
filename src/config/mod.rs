mod settings;

use config::{Config, Environment, File};

use crate::utils::error::ConfigError;

pub use settings::{ClientConfig, ClientConfigBuilder, PartialSettings};
pub use settings::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_HEARTBEAT_INTERVAL_SECS, DEFAULT_HOST,
    DEFAULT_INITIAL_RECONNECT_DELAY_MS, DEFAULT_MAX_RECONNECT_ATTEMPTS,
    DEFAULT_MAX_RECONNECT_DELAY_MS, DEFAULT_PORT,
};

/// Loads the configuration from the default file and environment variables
/// Environment variables use the `STCLIENT_` prefix, e.g. `STCLIENT_PORT=9000`
/// Missing values are merged with defaults and the result is validated
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("STCLIENT")
                .prefix_separator("_")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;

    partial.into_config()
}

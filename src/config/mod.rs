mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{
    BrokerSettings, ConnectorSettings, LoggingSettings, ServerSettings, Settings,
};

/// Environment variables override the config file, e.g.
/// `CHATRELAY__SERVER__PORT=7002` or `CHATRELAY__BROKER__DEDUPE_SUBSCRIPTIONS=false`.
pub const ENV_PREFIX: &str = "CHATRELAY";

/// Loads the configuration from `config/default.{toml,yaml,json}` (optional)
/// and `CHATRELAY__*` environment variables, merged over the defaults.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge(Settings::default()))
}

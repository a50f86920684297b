use serde::Deserialize;

/// Top-level configuration settings for the application.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub connector: ConnectorSettings,
    pub logging: LoggingSettings,
}

/// Where the broker listens. Kept apart from any HTTP listener of the host
/// application.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Configuration settings for the broker.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub max_connections: usize,
    /// When `true`, a repeated subscribe for the same (connection, channel)
    /// is ignored. When `false`, each one adds another subscription and the
    /// connection receives one copy per subscription.
    pub dedupe_subscriptions: bool,
}

/// Client-side connector settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ConnectorSettings {
    pub url: String,
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub connector: Option<PartialConnectorSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub max_connections: Option<usize>,
    pub dedupe_subscriptions: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct PartialConnectorSettings {
    pub url: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 7001,
            },
            broker: BrokerSettings::default(),
            connector: ConnectorSettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            max_connections: 1000,
            dedupe_subscriptions: true,
        }
    }
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:7001".to_string(),
            poll_interval_ms: 200,
            max_attempts: 10,
        }
    }
}

impl PartialSettings {
    /// Fill every missing value from `defaults`.
    pub fn merge(self, defaults: Settings) -> Settings {
        let Settings {
            server,
            broker,
            connector,
            logging,
        } = defaults;

        Settings {
            server: match self.server {
                Some(p) => ServerSettings {
                    host: p.host.unwrap_or(server.host),
                    port: p.port.unwrap_or(server.port),
                },
                None => server,
            },
            broker: match self.broker {
                Some(p) => BrokerSettings {
                    max_connections: p.max_connections.unwrap_or(broker.max_connections),
                    dedupe_subscriptions: p
                        .dedupe_subscriptions
                        .unwrap_or(broker.dedupe_subscriptions),
                },
                None => broker,
            },
            connector: match self.connector {
                Some(p) => ConnectorSettings {
                    url: p.url.unwrap_or(connector.url),
                    poll_interval_ms: p.poll_interval_ms.unwrap_or(connector.poll_interval_ms),
                    max_attempts: p.max_attempts.unwrap_or(connector.max_attempts),
                },
                None => connector,
            },
            logging: match self.logging {
                Some(p) => LoggingSettings {
                    level: p.level.unwrap_or(logging.level),
                },
                None => logging,
            },
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::model::{LatestBy, VerifiedElsewherePolicy};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub matrix: MatrixConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Knobs for matrix evaluation, passed explicitly to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixConfig {
    /// Upper bound on pacticipants shown in an integration network
    pub network_diagram_max_pacticipants: usize,
    /// Used when a query does not say which verification is authoritative
    pub default_latestby: LatestBy,
    /// Used when a query does not say how to count "verified elsewhere"
    pub verified_elsewhere: VerifiedElsewherePolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            network_diagram_max_pacticipants: 50,
            default_latestby: LatestBy::Cvp,
            verified_elsewhere: VerifiedElsewherePolicy::Unknown,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional config file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        config = config.add_source(config::File::with_name("config").required(false));

        // PACT_BROKER_SERVER__PORT=4000, PACT_BROKER_MATRIX__DEFAULT_LATESTBY=cvpv
        config = config.add_source(
            config::Environment::with_prefix("PACT_BROKER")
                .prefix_separator("_")
                .separator("__"),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        Ok(app_config)
    }

    /// Get the server bind address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

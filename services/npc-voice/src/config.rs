use secrecy::SecretString;
use talk_client::protocol::{DEFAULT_SAMPLE_RATE, ENDPOINT_TEMPLATE};
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Debug)]
pub struct Config {
    pub api_key: SecretString,
    pub agent_id: String,
    pub endpoint: String,
    pub output_sample_rate: u32,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let api_key = std::env::var("TALK_API_KEY")
            .map(SecretString::from)
            .map_err(|_| ConfigError::MissingVar("TALK_API_KEY".to_string()))?;

        let agent_id = std::env::var("TALK_AGENT_ID")
            .map_err(|_| ConfigError::MissingVar("TALK_AGENT_ID".to_string()))?;

        let endpoint =
            std::env::var("TALK_ENDPOINT").unwrap_or_else(|_| ENDPOINT_TEMPLATE.to_string());
        if !endpoint.contains("{agentId}") {
            return Err(ConfigError::InvalidValue(
                "TALK_ENDPOINT".to_string(),
                "must contain the {agentId} placeholder".to_string(),
            ));
        }

        let output_sample_rate = match std::env::var("TALK_OUTPUT_SAMPLE_RATE") {
            Ok(raw) => raw.parse::<u32>().map_err(|e| {
                ConfigError::InvalidValue("TALK_OUTPUT_SAMPLE_RATE".to_string(), e.to_string())
            })?,
            Err(_) => DEFAULT_SAMPLE_RATE,
        };
        if output_sample_rate == 0 {
            return Err(ConfigError::InvalidValue(
                "TALK_OUTPUT_SAMPLE_RATE".to_string(),
                "must be positive".to_string(),
            ));
        }

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            api_key,
            agent_id,
            endpoint,
            output_sample_rate,
            log_level,
        })
    }
}

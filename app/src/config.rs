use std::env;

use secrecy::SecretString;
use tracing::Level;

/// Holds everything loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: SecretString,
    pub chat_model: String,
    pub live_model: String,
    pub log_level: Level,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
}

impl Config {
    /// Loads configuration from the environment.
    ///
    /// * `GEMINI_API_KEY`: required.
    /// * `CHAT_MODEL`: optional, defaults to the tutor chat model.
    /// * `LIVE_MODEL`: optional, defaults to the native-audio live model.
    /// * `RUST_LOG`: optional level, defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // A .env file is a development convenience; missing is fine.
        dotenvy::dotenv().ok();

        let api_key = env::var("GEMINI_API_KEY")
            .map(SecretString::from)
            .map_err(|_| ConfigError::MissingVar("GEMINI_API_KEY".to_string()))?;

        let chat_model =
            env::var("CHAT_MODEL").unwrap_or_else(|_| afrolearn_gemini::CHAT_MODEL.to_string());
        let live_model = env::var("LIVE_MODEL").unwrap_or_else(|_| String::new());

        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            api_key,
            chat_model,
            live_model,
            log_level,
        })
    }
}

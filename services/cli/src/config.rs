use realtime_voice_core::{
    options::{ConversationModel, SessionMode, TranscriptionModel, Voice},
    transport::{ApiBase, DEFAULT_API_BASE, TransportKind},
    web_search::DEFAULT_WEB_SEARCH_MODEL,
};
use secrecy::SecretString;
use std::{str::FromStr, time::Duration};
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// May be absent; a key can still be entered at the prompt.
    pub openai_api_key: Option<SecretString>,
    pub api_base: ApiBase,
    pub session_mode: SessionMode,
    pub transport: TransportKind,
    pub conversation_model: Option<ConversationModel>,
    pub transcription_model: Option<TranscriptionModel>,
    pub voice: Option<Voice>,
    pub connect_timeout: Duration,
    pub web_search_model: String,
    pub log_level: Level,
}

/// Reads an optional variable and parses it with `FromStr`.
fn parse_var<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        _ => Ok(None),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);

        let api_base_str =
            std::env::var("OPENAI_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let api_base = ApiBase::parse(&api_base_str)
            .map_err(|e| ConfigError::InvalidValue("OPENAI_API_BASE".to_string(), e.to_string()))?;

        let session_mode = parse_var("REALTIME_SESSION_MODE")?.unwrap_or_default();
        let transport = parse_var("REALTIME_TRANSPORT")?.unwrap_or_default();
        let conversation_model = parse_var("REALTIME_CONVERSATION_MODEL")?;
        let transcription_model = parse_var("REALTIME_TRANSCRIPTION_MODEL")?;
        let voice = parse_var("REALTIME_VOICE")?;

        let connect_timeout = match parse_var::<u64>("REALTIME_CONNECT_TIMEOUT_SECS")? {
            Some(0) => {
                return Err(ConfigError::InvalidValue(
                    "REALTIME_CONNECT_TIMEOUT_SECS".to_string(),
                    "must be at least 1 second".to_string(),
                ));
            }
            Some(secs) => Duration::from_secs(secs),
            None => Duration::from_secs(15),
        };

        let web_search_model = std::env::var("WEB_SEARCH_MODEL")
            .unwrap_or_else(|_| DEFAULT_WEB_SEARCH_MODEL.to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            openai_api_key,
            api_base,
            session_mode,
            transport,
            conversation_model,
            transcription_model,
            voice,
            connect_timeout,
            web_search_model,
            log_level,
        })
    }
}

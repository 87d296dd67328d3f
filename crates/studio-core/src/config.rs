use std::path::PathBuf;

use thiserror::Error;

use crate::config_env::{optional_trimmed_env, parse_u64_env, process_env};

pub(crate) const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub(crate) const DEFAULT_FAST_MODEL: &str = "gemini-2.5-flash";
pub(crate) const DEFAULT_QUALITY_MODEL: &str = "gemini-2.5-pro";
const DEFAULT_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_TARGET_LANGUAGE: &str = "Hindi";
const DEFAULT_PREFERENCES_PATH: &str = ".studio/preferences.json";

/// Env vars consulted, in order, for the deployment-level credential.
pub const AMBIENT_CREDENTIAL_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub api_base_url: String,
    pub fast_model: String,
    pub quality_model: String,
    pub timeout_ms: u64,
    pub target_language: String,
    pub preferences_path: PathBuf,
    pub ambient_credential: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid integer in env var {key}: {value}")]
    ParseInt { key: String, value: String },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to load .env file: {0}")]
    Dotenv(String),
}

impl StudioConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(process_env)
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String> + Copy,
    ) -> Result<Self, ConfigError> {
        let api_base_url = optional_trimmed_env(lookup, "STUDIO_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidConfiguration(
                "STUDIO_API_BASE_URL must start with http:// or https://".to_string(),
            ));
        }

        let timeout_ms = parse_u64_env(lookup, "STUDIO_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?;
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "STUDIO_TIMEOUT_MS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            fast_model: optional_trimmed_env(lookup, "STUDIO_FAST_MODEL")
                .unwrap_or_else(|| DEFAULT_FAST_MODEL.to_string()),
            quality_model: optional_trimmed_env(lookup, "STUDIO_QUALITY_MODEL")
                .unwrap_or_else(|| DEFAULT_QUALITY_MODEL.to_string()),
            timeout_ms,
            target_language: optional_trimmed_env(lookup, "STUDIO_TARGET_LANGUAGE")
                .unwrap_or_else(|| DEFAULT_TARGET_LANGUAGE.to_string()),
            preferences_path: optional_trimmed_env(lookup, "STUDIO_PREFERENCES_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PREFERENCES_PATH)),
            ambient_credential: AMBIENT_CREDENTIAL_VARS
                .iter()
                .find_map(|key| optional_trimmed_env(lookup, key)),
        })
    }
}

/// Loads `.env` from the working directory when present. A missing file is not an error.
pub fn load_dotenv() -> Result<(), ConfigError> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(ConfigError::Dotenv(err.to_string())),
    }
}

//! Configuration management.
//!
//! Settings load from environment variables with sensible defaults; the
//! oracle backend is selected here, at startup, and handed to the rest of
//! the pipeline behind the [`PatchOracle`] trait.
//!
//! # Environment Variables
//!
//! - `BUILDMEND_PROVIDER`: oracle provider (ollama|openai|anthropic|gemini|xai|groq) - default: "ollama"
//! - `BUILDMEND_MODEL`: model name - default: provider-specific
//! - `BUILDMEND_ATTEMPTS`: retry attempts per session - default: "3"
//! - `BUILDMEND_LOG_TAIL`: build-log lines sent to the oracle - default: "120"
//! - `BUILDMEND_TIMEOUT`: oracle request timeout in seconds - default: "60"
//! - `BUILDMEND_API_BASE_URL`: optional endpoint override, read by the genai adapter
//!
//! Provider credentials are read by the genai library itself
//! (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `OLLAMA_HOST`, ...).

use genai::adapter::AdapterKind;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::oracle::{GenAiOracle, PatchOracle};

const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5-coder:7b";
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_LOG_TAIL_LINES: usize = 120;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid provider: {0}. Valid options: ollama, openai, anthropic, gemini, xai, groq")]
    InvalidProvider(String),

    #[error("failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Runtime configuration for a buildmend invocation.
#[derive(Debug, Clone)]
pub struct BuildmendConfig {
    /// Oracle provider.
    pub provider: AdapterKind,
    /// Model name (provider-specific).
    pub model: String,
    /// Retry attempts per remediation session.
    pub max_attempts: u32,
    /// Build-log lines included in the oracle context.
    pub log_tail_lines: usize,
    /// Oracle request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for BuildmendConfig {
    fn default() -> Self {
        Self {
            provider: AdapterKind::Ollama,
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            log_tail_lines: DEFAULT_LOG_TAIL_LINES,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl BuildmendConfig {
    /// Loads configuration from the environment.
    ///
    /// Unset variables fall back to defaults; set-but-invalid values are
    /// errors rather than silent fallbacks.
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider = match env::var("BUILDMEND_PROVIDER") {
            Ok(name) => AdapterKind::from_lower_str(&name.to_lowercase())
                .ok_or(ConfigError::InvalidProvider(name))?,
            Err(_) => AdapterKind::Ollama,
        };

        let model = env::var("BUILDMEND_MODEL").unwrap_or_else(|_| match provider {
            AdapterKind::Ollama => DEFAULT_OLLAMA_MODEL.to_string(),
            _ => "default-model".to_string(),
        });

        Ok(Self {
            provider,
            model,
            max_attempts: parse_env("BUILDMEND_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
            log_tail_lines: parse_env("BUILDMEND_LOG_TAIL", DEFAULT_LOG_TAIL_LINES)?,
            request_timeout_secs: parse_env("BUILDMEND_TIMEOUT", DEFAULT_REQUEST_TIMEOUT_SECS)?,
        })
    }

    /// Creates the configured oracle backend.
    pub fn create_oracle(&self) -> Arc<dyn PatchOracle> {
        Arc::new(GenAiOracle::new(
            self.provider,
            self.model.clone(),
            Duration::from_secs(self.request_timeout_secs),
        ))
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) => value.parse().map_err(|e: T::Err| ConfigError::ParseError {
            field: name.to_string(),
            error: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

//! Runtime configuration for question-relay.
//!
//! Configuration is loaded from an optional JSON file, then overridden by
//! the environment (`OPENAI_BASE_URL`, `OPENAI_MODEL`) and the command line.
//! The provider credential is read separately, once, and never lives in
//! [`Config`] so it cannot leak through `Debug` or serialization.

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Environment variable holding the provider credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable overriding `provider.api_base`.
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

/// Environment variable overriding `provider.model`.
pub const MODEL_ENV: &str = "OPENAI_MODEL";

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "question-relay", about = "Prompt relay for an OpenAI-compatible completion API")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen address, overriding the config file.
    #[arg(long)]
    pub listen: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,

    /// Completion provider configuration.
    pub provider: ProviderConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g. "127.0.0.1:5000").
    pub listen: String,

    /// Single origin allowed by CORS. `None` permits every origin.
    pub allowed_origin: Option<String>,

    /// Largest accepted request body in bytes (0 = unlimited).
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:5000".to_string(),
            allowed_origin: None,
            max_body_bytes: 16 * 1024 * 1024, // 16 MB
        }
    }
}

/// Completion provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of the OpenAI-compatible API, without the trailing endpoint.
    pub api_base: String,

    /// Model identifier sent with every completion request.
    pub model: String,

    /// System instruction preceding the user prompt.
    pub system_prompt: String,

    /// Outbound request timeout in seconds (0 = no timeout).
    pub timeout_secs: u64,

    /// Refuse to start when no credential is present.
    pub require_api_key: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            system_prompt: "You are a helpful assistant.".to_string(),
            timeout_secs: 60,
            require_api_key: false,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Apply `OPENAI_BASE_URL` / `OPENAI_MODEL` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(BASE_URL_ENV).ok(),
            std::env::var(MODEL_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, api_base: Option<String>, model: Option<String>) {
        if let Some(api_base) = non_blank(api_base) {
            self.provider.api_base = api_base;
        }
        if let Some(model) = non_blank(model) {
            self.provider.model = model;
        }
    }

    /// Apply command-line overrides.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(listen) = &cli.listen {
            self.server.listen = listen.clone();
        }
    }
}

/// Read the provider credential from the process environment.
pub fn api_key_from_env() -> Option<SecretString> {
    parse_api_key(std::env::var(API_KEY_ENV).ok())
}

/// Enforce `provider.require_api_key`. Without it a missing credential only
/// warns, and calls fail later with a not-configured provider error.
pub fn check_credential(
    config: &ProviderConfig,
    api_key: Option<&SecretString>,
) -> anyhow::Result<()> {
    if api_key.is_some() {
        return Ok(());
    }
    if config.require_api_key {
        anyhow::bail!("{API_KEY_ENV} is not set and provider.require_api_key is enabled");
    }
    tracing::warn!(
        "{API_KEY_ENV} is not set; generate-question requests will fail until it is provided"
    );
    Ok(())
}

fn parse_api_key(value: Option<String>) -> Option<SecretString> {
    non_blank(value).map(SecretString::new)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

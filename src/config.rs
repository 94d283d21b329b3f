//! Configuration loading.
//!
//! Loads client configuration from `./gg-botapi.toml` (or
//! `$GG_CONFIG_PATH`). Environment variables override file values; file
//! values override defaults.
//!
//! Precedence: env vars > config file > defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::gateway::{BOTAPI_VERSION, DEFAULT_BASE_URL};

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Bot identity settings (`[bot]`).
    pub bot: BotSection,
    /// Botmaster service settings (`[gateway]`).
    pub gateway: GatewaySection,
}

/// Bot identity settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotSection {
    /// The bot's GG number.
    pub number: u64,
    /// Value of the `BotApi-Version` header.
    pub api_version: String,
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            number: 0,
            api_version: BOTAPI_VERSION.to_owned(),
        }
    }
}

/// Botmaster service settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    /// Service root URL, no trailing slash.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout_seconds: 5,
        }
    }
}

impl BotConfig {
    /// Load configuration with precedence: env vars > TOML file >
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or
    /// parsed.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_from_file() -> Result<Self> {
        let path = Self::config_path_with(|key| std::env::var(key).ok());
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                let config: BotConfig =
                    toml::from_str(&contents).context("failed to parse config TOML")?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config file found, using defaults");
                Ok(BotConfig::default())
            }
            Err(e) => Err(anyhow::anyhow!("failed to read config file: {e}")),
        }
    }

    /// Resolve the config file path using a custom env resolver (for
    /// testing).
    pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        match env("GG_CONFIG_PATH") {
            Some(p) => PathBuf::from(p),
            None => PathBuf::from("gg-botapi.toml"),
        }
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function for testability.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("GG_BOT_NUMBER") {
            match v.parse() {
                Ok(n) => self.bot.number = n,
                Err(_) => tracing::warn!(
                    var = "GG_BOT_NUMBER",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("GG_BOTAPI_VERSION") {
            self.bot.api_version = v;
        }
        if let Some(v) = env("GG_GATEWAY_URL") {
            self.gateway.base_url = v;
        }
        if let Some(v) = env("GG_TIMEOUT_SECS") {
            match v.parse() {
                Ok(n) => self.gateway.timeout_seconds = n,
                Err(_) => tracing::warn!(
                    var = "GG_TIMEOUT_SECS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
    }
}

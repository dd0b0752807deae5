//! Handles settings for the application.
//!
//! Configuration is read from an optional `settings` file (any format the
//! `config` crate understands, e.g. `settings.toml`) and from environment
//! variables prefixed with `LEDGER`, using `__` as separator
//! (`LEDGER__SERVER__PORT=3000`). See `settings.toml` for an example.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
    pub upload_limit_bytes: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct Extraction {
    pub api_key: String,
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    pub max_candidates: Option<usize>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Guard {
    pub rate_limit_url: Option<String>,
    pub fail_open: bool,
}

impl Default for Guard {
    fn default() -> Self {
        Self {
            rate_limit_url: None,
            fail_open: true,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Option<Server>,
    pub extraction: Option<Extraction>,
    #[serde(default)]
    pub guard: Guard,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("LEDGER").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

//! Handles settings for the application. Configuration is written in
//! `valigia.toml` and can be overridden with `VALIGIA_*` environment
//! variables.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Database::Sqlite("valigia.db".to_string())
    }
}

/// Remote document database; when present it replaces the local database
/// entirely.
#[derive(Debug, Deserialize)]
pub struct Remote {
    pub base_url: String,
    pub auth_token: Option<String>,
    /// External edits are polled; push channels are out of scope.
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
}

fn default_poll_secs() -> u64 {
    5
}

#[derive(Debug, Default, Deserialize)]
pub struct Storage {
    #[serde(default)]
    pub database: Database,
    pub remote: Option<Remote>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Option<Server>,
    #[serde(default)]
    pub storage: Storage,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("valigia").required(false))
            .add_source(Environment::with_prefix("VALIGIA").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

//! Handles settings for the application. Configuration is written in
//! `settings.toml`; any key can be overridden by a `KOSH_` environment
//! variable (`KOSH_SERVER__PORT=8080`).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    /// Log level for the workspace crates (`info`, `debug`, ...).
    pub level: String,
}

/// Where the data lives.
///
/// ```toml
/// database = "memory"
/// database = { sqlite = "kosh.db" }
/// ```
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
}

#[derive(Debug, Default, Deserialize)]
pub struct Propagation {
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Option<Server>,
    #[serde(default)]
    pub propagation: Propagation,
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("app.level", "info")?
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("KOSH").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

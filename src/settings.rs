use std::path::PathBuf;

use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub session: SessionSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub media_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub ttl_hours: i64,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Layered configuration: code defaults, then an optional `linkdex.toml`,
/// then `LINKDEX__*` environment variables (e.g. `LINKDEX__APPLICATION__PORT`).
pub fn load() -> Result<Settings, config::ConfigError> {
    config::Config::builder()
        .set_default("database.path", "linkdex.db")?
        .set_default("application.host", "0.0.0.0")?
        .set_default("application.port", 8080)?
        .set_default("application.media_dir", "media")?
        .set_default("session.ttl_hours", 72)?
        .add_source(config::File::with_name("linkdex").required(false))
        .add_source(
            config::Environment::with_prefix("LINKDEX")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?
        .try_deserialize()
}

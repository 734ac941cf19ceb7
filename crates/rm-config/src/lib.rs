//! # rm-config
//!
//! Layered runtime configuration for rusty-maint.
//!
//! Sources, lowest priority first:
//! 1. built-in defaults
//! 2. `config/rusty-maint.toml` (optional)
//! 3. environment variables prefixed `RM__`, nested with `__`
//!    (e.g. `RM__SERVER__PORT=9000`, `RM__PUBLIC_BASE_URL=https://...`)
//!
//! A `.env` file in the working directory is loaded into the environment first.

use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "config/rusty-maint";
pub const ENV_PREFIX: &str = "RM";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub qr: QrSettings,
    /// Directory served under `/static`
    pub static_dir: String,
    /// Public origin encoded in every QR link. Required: there is no sane default.
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QrSettings {
    pub output_dir: String,
    pub url_prefix: String,
}

impl Settings {
    /// Loads `.env`, the optional config file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("loaded environment from {}", path.display());
        }
        let builder = defaults()?
            .add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        Self::finish(builder)
    }

    /// Loads defaults overlaid with an inline TOML document.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let builder = defaults()?.add_source(File::from_str(toml, FileFormat::Toml));
        Self::finish(builder)
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }

    fn finish(builder: ConfigBuilder<config::builder::DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = self.public_base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "public_base_url must be an http(s) URL, got {url:?}"
            )));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be at least 1".into()));
        }
        if !self.qr.url_prefix.starts_with('/') {
            return Err(ConfigError::Invalid("qr.url_prefix must start with '/'".into()));
        }
        Ok(())
    }
}

fn defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    Ok(Config::builder()
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080)?
        .set_default("database.url", "sqlite:rusty_maint.db")?
        .set_default("database.max_connections", 5)?
        .set_default("qr.output_dir", "static/qrcodes")?
        .set_default("qr.url_prefix", "/static/qrcodes")?
        .set_default("static_dir", "static")?)
}

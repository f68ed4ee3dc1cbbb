//! Application configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Admin console configuration.
    pub admin: AdminConfig,
    /// Popup widget configuration.
    #[serde(default)]
    pub widget: WidgetConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Persistent store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path of the JSON file backing the long-lived store.
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

/// Admin console configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Static bearer token required on admin endpoints.
    pub token: String,
}

/// Popup widget configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WidgetConfig {
    /// Whether marker reads fail open (unreadable markers count as absent).
    #[serde(default = "default_true")]
    pub open_on_read_error: bool,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            open_on_read_error: true,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./data/store.json")
}

const fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `BEACON_ENV`)
    /// 3. Environment variables with `BEACON_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("BEACON_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("BEACON")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("BEACON")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

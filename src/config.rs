use std::env;
use thiserror::Error;

pub const DEFAULT_MONGO_URI: &str = "mongodb://127.0.0.1:27017";
pub const DEFAULT_DATABASE: &str = "unihome";
pub const DEFAULT_SERVER_SELECTION_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a valid number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Runtime settings, loaded from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub mongo_uri: String,
    pub database: String,
    pub app_name: String,
    pub server_selection_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mongo_uri: DEFAULT_MONGO_URI.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            app_name: "unihome".to_string(),
            server_selection_timeout_secs: DEFAULT_SERVER_SELECTION_TIMEOUT_SECS,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        Ok(Config {
            mongo_uri: lookup("UNIHOME_MONGO_URI").unwrap_or(defaults.mongo_uri),
            database: lookup("UNIHOME_DATABASE").unwrap_or(defaults.database),
            app_name: lookup("UNIHOME_APP_NAME").unwrap_or(defaults.app_name),
            server_selection_timeout_secs: parse_number(
                &lookup,
                "UNIHOME_SERVER_SELECTION_TIMEOUT_SECS",
                defaults.server_selection_timeout_secs,
            )?,
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        None => Ok(default),
    }
}

/// Installs `env_logger`, defaulting to `info` for this crate when `RUST_LOG` is unset.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("unihome=info"))
        .try_init();
}

//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `WIGVANA_STORE` - `postgres` (default) or `memory`
//! - `DATABASE_URL` - `PostgreSQL` connection string, required for `postgres`
//! - `DATABASE_MAX_CONNECTIONS` - pool size (default: 10)
//! - `HOST` - bind address (default: 0.0.0.0)
//! - `PORT` - listen port (default: 8083)
//! - `NATS_URL` - optional event bus
//! - `LOG_FORMAT` - `text` (default) or `json`
//! - `CORS_PERMISSIVE` - allow any origin (default: true)
//! - `RUST_LOG` - log filter (default: `wigvana=info,tower_http=debug`)

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend { Postgres, Memory }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat { #[default] Text, Json }

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: SecretString,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store: StoreBackend,
    /// Present whenever `store` is [`StoreBackend::Postgres`].
    pub database: Option<DatabaseConfig>,
    pub host: IpAddr,
    pub port: u16,
    pub nats_url: Option<String>,
    pub log_format: LogFormat,
    pub cors_permissive: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let invalid = |key: &str, e: &dyn std::fmt::Display| ConfigError::InvalidEnvVar(key.to_string(), e.to_string());

        let store = match get("WIGVANA_STORE").as_deref().unwrap_or("postgres") {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => return Err(invalid("WIGVANA_STORE", &format!("unknown backend `{other}`"))),
        };

        let database = match store {
            StoreBackend::Memory => None,
            StoreBackend::Postgres => {
                let url = get("DATABASE_URL").ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;
                let max_connections = get("DATABASE_MAX_CONNECTIONS")
                    .map_or(Ok(10), |v| v.parse::<u32>())
                    .map_err(|e| invalid("DATABASE_MAX_CONNECTIONS", &e))?;
                Some(DatabaseConfig { url: SecretString::from(url), max_connections })
            }
        };

        let host = get("HOST").as_deref().unwrap_or("0.0.0.0").parse::<IpAddr>().map_err(|e| invalid("HOST", &e))?;
        let port = get("PORT").as_deref().unwrap_or("8083").parse::<u16>().map_err(|e| invalid("PORT", &e))?;

        let log_format = match get("LOG_FORMAT").as_deref().unwrap_or("text") {
            "text" => LogFormat::Text,
            "json" => LogFormat::Json,
            other => return Err(invalid("LOG_FORMAT", &format!("expected `text` or `json`, got `{other}`"))),
        };

        let cors_permissive = get("CORS_PERMISSIVE").as_deref().map_or(Ok(true), parse_bool).map_err(|e| invalid("CORS_PERMISSIVE", &e))?;

        Ok(Self { store, database, host, port, nats_url: get("NATS_URL"), log_format, cors_permissive })
    }

    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wigvana=info,tower_http=debug"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(format!("expected a boolean, got `{other}`")),
    }
}

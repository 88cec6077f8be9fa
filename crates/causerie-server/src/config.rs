//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use causerie_shared::constants::DEFAULT_HTTP_PORT;

/// Secret used when `MESSAGE_SECRET` is unset.  Development only.
const DEV_MESSAGE_SECRET: &str = "causerie-dev-secret";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Filesystem path of the conversations database.
    /// Env: `DB_PATH`
    /// Default: `./causerie.db`
    pub db_path: PathBuf,

    /// Secret the message cipher key is derived from.
    /// Env: `MESSAGE_SECRET`
    /// Default: a fixed dev-only value (a warning is logged).
    pub message_secret: String,

    /// Human-readable name for this server instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"Causerie"`
    pub instance_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            db_path: PathBuf::from("./causerie.db"),
            message_secret: DEV_MESSAGE_SECRET.to_string(),
            instance_name: "Causerie".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(
                    value = %addr,
                    "Invalid HTTP_ADDR, using default"
                );
            }
        }

        if let Ok(path) = std::env::var("DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        match std::env::var("MESSAGE_SECRET") {
            Ok(secret) if !secret.is_empty() => config.message_secret = secret,
            _ => {
                tracing::warn!("MESSAGE_SECRET not set, using dev-only default");
            }
        }

        if let Ok(name) = std::env::var("INSTANCE_NAME") {
            config.instance_name = name;
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.db_path, PathBuf::from("./causerie.db"));
        assert_eq!(config.message_secret, DEV_MESSAGE_SECRET);
    }
}

//! Configuration module for the yutai backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;
use crate::models::VoucherTypes;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (optional for a single-user install)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Catalog location override: a directory URL, or a manifest/payload JSON URL
    pub catalog_base: Option<String>,
    /// Application base path used to derive the default catalog location
    pub base_path: String,
    /// Origin that relative catalog locations are resolved against
    pub catalog_origin: String,
    /// Background sync period; zero disables the loop
    pub sync_interval: Duration,
    /// Transport timeout for manifest and payload requests
    pub sync_timeout: Duration,
    /// Allowed voucher categories for holdings
    pub voucher_types: VoucherTypes,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let api_psk = env::var("YUTAI_API_PSK").ok().filter(|s| !s.is_empty());

        let db_path = env::var("YUTAI_DB_PATH")
            .unwrap_or_else(|_| "./data/yutai.sqlite".to_string())
            .into();

        let bind_addr = env::var("YUTAI_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid YUTAI_BIND_ADDR: {}", e)))?;

        let log_level = env::var("YUTAI_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let catalog_base = env::var("YUTAI_CATALOG_BASE")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let base_path = env::var("YUTAI_BASE_PATH").unwrap_or_default();

        let catalog_origin = env::var("YUTAI_CATALOG_ORIGIN")
            .unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());

        let sync_interval = Duration::from_secs(parse_secs("YUTAI_SYNC_INTERVAL_SECS", 900)?);
        let sync_timeout = Duration::from_secs(parse_secs("YUTAI_SYNC_TIMEOUT_SECS", 15)?);

        let voucher_types = match env::var("YUTAI_VOUCHER_TYPES") {
            Ok(list) => {
                let types = VoucherTypes::parse_list(&list);
                if types.is_empty() {
                    return Err(AppError::Config(
                        "YUTAI_VOUCHER_TYPES must list at least one type".to_string(),
                    ));
                }
                types
            }
            Err(_) => VoucherTypes::default(),
        };

        Ok(Self {
            api_psk,
            db_path,
            bind_addr,
            log_level,
            catalog_base,
            base_path,
            catalog_origin,
            sync_interval,
            sync_timeout,
            voucher_types,
        })
    }
}

fn parse_secs(name: &str, default: u64) -> Result<u64, AppError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

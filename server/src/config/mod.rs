use std::env;
use std::net::SocketAddr;

use thiserror::Error;

use crate::services::CivilZone;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::{add_security_headers, log_security_mode};

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/parking";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_CIVIL_TZ_OFFSET: &str = "+05:30";
pub(crate) const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub storage: StorageBackend,
    /// Civil timezone used for all reservation duration math.
    pub civil_zone: CivilZone,
    pub seed_demo_data: bool,
    /// Enables HSTS.
    pub production: bool,
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let bind_addr = get("BIND_ADDR", DEFAULT_BIND_ADDR);
        let storage = get("STORAGE_BACKEND", "postgres");
        let civil_zone = get("CIVIL_TZ_OFFSET", DEFAULT_CIVIL_TZ_OFFSET);
        let seed = get("SEED_DEMO_DATA", "false");

        Ok(Self {
            database_url: get("DATABASE_URL", DEFAULT_DATABASE_URL),
            bind_addr: bind_addr.parse().map_err(|_| ConfigError::Invalid {
                key: "BIND_ADDR",
                value: bind_addr.clone(),
            })?,
            max_connections: match lookup("DATABASE_MAX_CONNECTIONS") {
                None => DEFAULT_MAX_CONNECTIONS,
                Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                    key: "DATABASE_MAX_CONNECTIONS",
                    value: value.clone(),
                })?,
            },
            storage: match storage.to_lowercase().as_str() {
                "postgres" => StorageBackend::Postgres,
                "memory" => StorageBackend::Memory,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "STORAGE_BACKEND",
                        value: storage,
                    })
                }
            },
            civil_zone: civil_zone.parse().map_err(|_| ConfigError::Invalid {
                key: "CIVIL_TZ_OFFSET",
                value: civil_zone.clone(),
            })?,
            seed_demo_data: parse_flag(&seed).ok_or_else(|| ConfigError::Invalid {
                key: "SEED_DEMO_DATA",
                value: seed.clone(),
            })?,
            production: get("RUST_ENV", "development").eq_ignore_ascii_case("production"),
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS)
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr.port(), 3001);
        assert_eq!(cfg.max_connections, 5);
        assert_eq!(cfg.storage, StorageBackend::Postgres);
        assert_eq!(cfg.civil_zone.offset().local_minus_utc(), 19800);
        assert!(!cfg.seed_demo_data);
        assert!(!cfg.production);
        assert_eq!(cfg.cors_allowed_origins.len(), 2);
    }

    #[test]
    fn overrides() {
        let cfg = config(&[
            ("STORAGE_BACKEND", "Memory"),
            ("CIVIL_TZ_OFFSET", "-08:00"),
            ("SEED_DEMO_DATA", "yes"),
            ("RUST_ENV", "production"),
            ("CORS_ALLOWED_ORIGINS", "https://parking.example, "),
        ])
        .unwrap();
        assert_eq!(cfg.storage, StorageBackend::Memory);
        assert_eq!(cfg.civil_zone.offset().local_minus_utc(), -8 * 3600);
        assert!(cfg.seed_demo_data);
        assert!(cfg.production);
        assert_eq!(cfg.cors_allowed_origins, vec!["https://parking.example"]);
    }

    #[test]
    fn invalid_values_are_reported() {
        for (key, value) in [
            ("CIVIL_TZ_OFFSET", "Asia/Kolkata"),
            ("STORAGE_BACKEND", "sqlite"),
            ("BIND_ADDR", "localhost"),
            ("DATABASE_MAX_CONNECTIONS", "many"),
            ("SEED_DEMO_DATA", "maybe"),
        ] {
            match config(&[(key, value)]) {
                Err(ConfigError::Invalid { key: k, value: v }) => {
                    assert_eq!(k, key);
                    assert_eq!(v, value);
                }
                Ok(_) => panic!("{key}={value} should be rejected"),
            }
        }
    }
}

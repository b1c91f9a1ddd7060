//! Application configuration
//!
//! Values come from the environment (and `.env`, via `dotenvy`), with defaults for
//! everything so the server starts on a bare machine.

use chrono::{FixedOffset, Offset, Utc};
use log::warn;
use std::env;
use std::str::FromStr;

const DEFAULT_DATABASE_URL: &str = "sqlite:dashboard.db?mode=rwc";
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// sqlx connection string for the SQLite database
    pub database_url: String,
    /// Address the HTTP server listens on
    pub bind_address: String,
    pub cors_origins: CorsOrigins,
    /// Timezone used for day bucketing and for evaluating the bot schedule
    pub utc_offset: FixedOffset,
    /// Replace the chat store with demo data on startup
    pub seed_on_startup: bool,
    /// Directory holding the built dashboard bundle, served as the fallback route
    pub static_dir: Option<String>,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_owned(),
            bind_address: DEFAULT_BIND_ADDRESS.to_owned(),
            cors_origins: CorsOrigins::Any,
            utc_offset: utc(),
            seed_on_startup: false,
            static_dir: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl AppConfig {
    /// Loads `.env` if present and reads the process environment.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    ///
    /// Recognised keys: `DATABASE_URL`, `BIND_ADDRESS`, `CORS_ORIGINS`,
    /// `STATS_UTC_OFFSET`, `SEED_TEST_DATA`, `STATIC_DIR`, `MAX_UPLOAD_BYTES`.
    /// Unparseable values are logged and replaced by the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(url) = lookup("DATABASE_URL") {
            cfg.database_url = url;
        }
        if let Some(addr) = lookup("BIND_ADDRESS") {
            cfg.bind_address = addr;
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            cfg.cors_origins = parse_cors_origins(&origins);
        }
        if let Some(offset) = lookup("STATS_UTC_OFFSET") {
            cfg.utc_offset = parse_or_default("STATS_UTC_OFFSET", &offset, cfg.utc_offset);
        }
        if let Some(seed) = lookup("SEED_TEST_DATA") {
            cfg.seed_on_startup = parse_or_default("SEED_TEST_DATA", &seed, cfg.seed_on_startup);
        }
        if let Some(dir) = lookup("STATIC_DIR").filter(|d| !d.trim().is_empty()) {
            cfg.static_dir = Some(dir);
        }
        if let Some(limit) = lookup("MAX_UPLOAD_BYTES") {
            cfg.max_upload_bytes =
                parse_or_default("MAX_UPLOAD_BYTES", &limit, cfg.max_upload_bytes);
        }

        cfg
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

fn parse_cors_origins(raw: &str) -> CorsOrigins {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_owned)
        .collect();

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        CorsOrigins::Any
    } else {
        CorsOrigins::List(origins)
    }
}

fn parse_or_default<T: FromStr>(key: &str, raw: &str, default: T) -> T {
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!("ignoring invalid value {raw:?} for {key}");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let cfg = AppConfig::from_lookup(|_| None);
        assert_eq!(cfg.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(cfg.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(cfg.cors_origins, CorsOrigins::Any);
        assert_eq!(cfg.utc_offset.local_minus_utc(), 0);
        assert!(!cfg.seed_on_startup);
        assert!(cfg.static_dir.is_none());
    }

    #[test]
    fn test_reads_all_keys() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("BIND_ADDRESS", "127.0.0.1:8001"),
            ("CORS_ORIGINS", "http://localhost:3000, https://admin.example.by"),
            ("STATS_UTC_OFFSET", "+03:00"),
            ("SEED_TEST_DATA", "true"),
            ("STATIC_DIR", "frontend/build"),
            ("MAX_UPLOAD_BYTES", "1024"),
        ]));

        assert_eq!(cfg.database_url, "sqlite::memory:");
        assert_eq!(cfg.bind_address, "127.0.0.1:8001");
        assert_eq!(
            cfg.cors_origins,
            CorsOrigins::List(vec![
                "http://localhost:3000".to_owned(),
                "https://admin.example.by".to_owned()
            ])
        );
        assert_eq!(cfg.utc_offset.local_minus_utc(), 3 * 3600);
        assert!(cfg.seed_on_startup);
        assert_eq!(cfg.static_dir.as_deref(), Some("frontend/build"));
        assert_eq!(cfg.max_upload_bytes, 1024);
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("STATS_UTC_OFFSET", "Europe/Minsk"),
            ("SEED_TEST_DATA", "yes please"),
            ("MAX_UPLOAD_BYTES", "-1"),
        ]));

        assert_eq!(cfg.utc_offset.local_minus_utc(), 0);
        assert!(!cfg.seed_on_startup);
        assert_eq!(cfg.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn test_wildcard_origin_wins() {
        assert_eq!(parse_cors_origins("http://a, *"), CorsOrigins::Any);
        assert_eq!(parse_cors_origins(" , "), CorsOrigins::Any);
    }
}

//! Server configuration from the environment.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DATABASE_URL` | `postgres://localhost/ideaboard` |
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `3000` |
//! | `OBJECT_STORE_PATH` | `./data/files` |
//! | `PUBLIC_FILES_URL` | `http://localhost:{PORT}/files` |
//! | `CORS_ALLOWED_ORIGINS` | `http://localhost:3000` (comma separated) |
//! | `MAX_UPLOAD_BYTES` | `10485760` |
//! | `DB_MAX_CONNECTIONS` | `10` |
//! | `RUN_MIGRATIONS` | `true` |

use std::str::FromStr;

use ideaboard_core::{Error, Result};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub object_store_path: String,
    pub public_files_url: String,
    pub cors_allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
    pub db_max_connections: u32,
    pub run_migrations: bool,
}

fn parse_var<T: FromStr>(name: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} must be a number, got '{}'", name, value))),
    }
}

fn parse_bool(name: &str, raw: Option<String>, default: bool) -> Result<bool> {
    match raw.as_deref().map(str::trim) {
        None => Ok(default),
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(Error::Config(format!(
            "{} must be true or false, got '{}'",
            name, other
        ))),
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = parse_var("PORT", lookup("PORT"), DEFAULT_PORT)?;
        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "postgres://localhost/ideaboard".to_string()),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            object_store_path: lookup("OBJECT_STORE_PATH")
                .unwrap_or_else(|| "./data/files".to_string()),
            public_files_url: lookup("PUBLIC_FILES_URL")
                .unwrap_or_else(|| format!("http://localhost:{}/files", port)),
            cors_allowed_origins,
            max_upload_bytes: parse_var(
                "MAX_UPLOAD_BYTES",
                lookup("MAX_UPLOAD_BYTES"),
                DEFAULT_MAX_UPLOAD_BYTES,
            )?,
            db_max_connections: parse_var(
                "DB_MAX_CONNECTIONS",
                lookup("DB_MAX_CONNECTIONS"),
                ideaboard_db::pool::DEFAULT_MAX_CONNECTIONS,
            )?,
            run_migrations: parse_bool("RUN_MIGRATIONS", lookup("RUN_MIGRATIONS"), true)?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ApiConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:3000");
        assert_eq!(cfg.public_files_url, "http://localhost:3000/files");
        assert_eq!(cfg.cors_allowed_origins, vec!["http://localhost:3000"]);
        assert_eq!(cfg.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert!(cfg.run_migrations);
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("PORT", "8080"),
            ("CORS_ALLOWED_ORIGINS", "https://a.test, https://b.test,"),
            ("RUN_MIGRATIONS", "false"),
            ("DB_MAX_CONNECTIONS", "4"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.public_files_url, "http://localhost:8080/files");
        assert_eq!(cfg.cors_allowed_origins, vec!["https://a.test", "https://b.test"]);
        assert!(!cfg.run_migrations);
        assert_eq!(cfg.db_max_connections, 4);
    }

    #[test]
    fn test_invalid_numbers_are_config_errors() {
        assert!(matches!(config(&[("PORT", "http")]), Err(Error::Config(_))));
        assert!(matches!(
            config(&[("MAX_UPLOAD_BYTES", "-1")]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            config(&[("RUN_MIGRATIONS", "maybe")]),
            Err(Error::Config(_))
        ));
    }
}

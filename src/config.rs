//! Environment configuration. `.env` is loaded by `main` before this runs.

use anyhow::{Context, Result};
use std::env;

const DEFAULT_PORT: u16 = 8083;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// Postgres connection string; the in-memory store is used when absent.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub jwt_secret: String,
    pub nats_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match non_empty("PORT") {
            Some(p) => p.parse().with_context(|| format!("PORT is not a valid port: {p}"))?,
            None => DEFAULT_PORT,
        };
        let max_connections = match non_empty("DATABASE_MAX_CONNECTIONS") {
            Some(n) => n.parse().with_context(|| format!("DATABASE_MAX_CONNECTIONS is not a number: {n}"))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        let jwt_secret = non_empty("JWT_SECRET").context("JWT_SECRET must be set")?;

        Ok(Self {
            port,
            database_url: non_empty("DATABASE_URL"),
            max_connections,
            jwt_secret,
            nats_url: non_empty("NATS_URL"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.port, 8083);
        assert_eq!(config.max_connections, 10);
        assert!(config.database_url.is_none());
        assert!(config.nats_url.is_none());
    }

    #[test]
    fn test_secret_is_required_and_port_validated() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("JWT_SECRET", "x"), ("PORT", "http")])).is_err());
        let config = Config::from_lookup(lookup(&[("JWT_SECRET", "x"), ("PORT", "9000"), ("DATABASE_URL", " ")])).unwrap();
        assert_eq!(config.port, 9000);
        assert!(config.database_url.is_none());
    }
}

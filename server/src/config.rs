//! Runtime configuration, read from the environment.

use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Add an `X-DB-Query-Count` header to every response (TRACK_DB_QUERY_COUNT=1)
    pub track_db_query_count: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let bind_addr = env::var("BIND_ADDR").ok();

        Ok(Self {
            database_url,
            bind_addr: parse_bind_addr(bind_addr.as_deref())?,
            track_db_query_count: flag_enabled(env::var("TRACK_DB_QUERY_COUNT").ok().as_deref()),
        })
    }
}

fn parse_bind_addr(value: Option<&str>) -> Result<SocketAddr> {
    let value = value.unwrap_or(DEFAULT_BIND_ADDR);
    value
        .parse()
        .with_context(|| format!("BIND_ADDR is not a valid socket address: {}", value))
}

fn flag_enabled(value: Option<&str>) -> bool {
    matches!(value, Some("1") | Some("true"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bind_addr() {
        let addr = parse_bind_addr(None).unwrap();
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_custom_bind_addr() {
        let addr = parse_bind_addr(Some("127.0.0.1:8080")).unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn test_invalid_bind_addr() {
        assert!(parse_bind_addr(Some("localhost")).is_err());
    }

    #[test]
    fn test_flag_enabled() {
        assert!(flag_enabled(Some("1")));
        assert!(flag_enabled(Some("true")));
        assert!(!flag_enabled(Some("0")));
        assert!(!flag_enabled(None));
    }
}

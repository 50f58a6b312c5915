use std::net::SocketAddr;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub secret: String,
    pub bind_addr: SocketAddr,
    pub db_max_connections: u32,
    pub token_ttl_hours: i64,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

impl Config {
    /// Reads the configuration from the environment, after loading `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://farm_market.db?mode=rwc".to_owned());
        let secret = std::env::var("SECRET").map_err(|_| ConfigError::Missing("SECRET"))?;
        if secret.is_empty() {
            return Err(ConfigError::Missing("SECRET"));
        }

        Ok(Config {
            database_url,
            secret,
            bind_addr: parse_var("BIND_ADDR", "0.0.0.0:3000")?,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", "5")?,
            token_ttl_hours: parse_var("TOKEN_TTL_HOURS", "24")?,
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = std::env::var(key).unwrap_or_else(|_| default.to_owned());
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_var_falls_back_to_default() {
        let port: u32 = parse_var("FARM_MARKET_TEST_UNSET_VAR", "42").unwrap();
        assert_eq!(port, 42);
    }

    #[test]
    fn parse_var_reports_bad_values() {
        let err = parse_var::<u32>("FARM_MARKET_TEST_UNSET_VAR", "lots").unwrap_err();
        assert!(err.to_string().contains("lots"));
    }
}

//! Process configuration, read from the environment and an optional `.env` file.

use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use thiserror::Error;
use tracing::debug;
use warble_common::{
    snowflake::{ProcessId, WorkerId},
    util::PositiveDuration,
};
use warble_core::{DEFAULT_FEED_WINDOW_DAYS, EngineConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("FEED_WINDOW_DAYS must be positive")]
    FeedWindow,
    #[error("TOKEN_LIFETIME_DAYS must be positive")]
    TokenLifetime,
}

fn default_max_connections() -> u32 {
    10
}

fn default_feed_window_days() -> u32 {
    DEFAULT_FEED_WINDOW_DAYS
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct Env {
    pub server_address: IpAddr,
    pub server_port: u16,
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,
    #[serde(default)]
    pub worker_id: WorkerId,
    #[serde(default)]
    pub process_id: ProcessId,
    #[serde(default = "default_feed_window_days")]
    pub feed_window_days: u32,
    /// Unset means tokens never expire.
    pub token_lifetime_days: Option<u32>,
}

impl Env {
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if e.not_found() {
                debug!("No .env file found");
            } else {
                return Err(e.into());
            }
        }

        Ok(envy::from_env()?)
    }

    #[must_use]
    pub fn socket_address(&self) -> SocketAddr {
        SocketAddr::new(self.server_address, self.server_port)
    }

    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let feed_window =
            PositiveDuration::days(self.feed_window_days).ok_or(ConfigError::FeedWindow)?;
        let token_lifetime = self
            .token_lifetime_days
            .map(|days| PositiveDuration::days(days).ok_or(ConfigError::TokenLifetime))
            .transpose()?;

        Ok(EngineConfig {
            feed_window,
            token_lifetime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn env(vars: &[(&str, &str)]) -> Result<Env, envy::Error> {
        envy::from_iter(
            vars.iter()
                .map(|(key, value)| ((*key).to_owned(), (*value).to_owned())),
        )
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("SERVER_ADDRESS", "127.0.0.1"),
        ("SERVER_PORT", "8080"),
        ("DATABASE_URL", "postgres://localhost/warble"),
    ];

    #[test]
    fn defaults_apply() {
        let env = env(&REQUIRED).unwrap();

        assert_eq!(env.database_max_connections, 10);
        assert_eq!(env.worker_id.get(), 0);
        assert_eq!(env.feed_window_days, 30);
        assert_eq!(env.socket_address().port(), 8080);

        let config = env.engine_config().unwrap();
        assert_eq!(config.feed_window.get(), Duration::days(30));
        assert_eq!(config.token_lifetime, None);
    }

    #[test]
    fn token_lifetime_is_read() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("TOKEN_LIFETIME_DAYS", "7"));
        let config = env(&vars).unwrap().engine_config().unwrap();

        assert_eq!(
            config.token_lifetime.map(|lifetime| lifetime.get()),
            Some(Duration::days(7))
        );
    }

    #[test]
    fn zero_feed_window_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("FEED_WINDOW_DAYS", "0"));
        let env = env(&vars).unwrap();

        assert!(matches!(env.engine_config(), Err(ConfigError::FeedWindow)));
    }

    #[test]
    fn out_of_range_worker_id_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("WORKER_ID", "200"));

        assert!(env(&vars).is_err());
    }

    #[test]
    fn missing_database_url_is_rejected() {
        assert!(env(&REQUIRED[..2]).is_err());
    }
}

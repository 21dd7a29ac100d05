// ============================================================================
// Gateway Config - Centralized configuration management
// ============================================================================
//
// Configuration for the API gateway process. Everything is loaded from
// environment variables (optionally seeded from a .env file) with defaults
// suitable for a local docker-compose stack.
//
// ============================================================================

mod constants;
mod kafka;
mod redis;
mod session;

pub use constants::{SECONDS_PER_DAY, SECONDS_PER_HOUR, SECONDS_PER_MINUTE};
pub use kafka::KafkaConfig;
pub use redis::RedisKeyPrefixes;
pub use session::{KeyIssuerConfig, SessionConfig};

use anyhow::{Context, Result};
use constants::*;
use std::str::FromStr;

/// Output format for the tracing subscriber
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" | "plain" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("Unknown LOG_FORMAT '{}', expected 'text' or 'json'", other),
        }
    }
}

/// Main configuration structure for the gateway
#[derive(Clone, Debug)]
pub struct Config {
    /// Shared store URL (redis:// or rediss://)
    pub redis_url: String,
    pub port: u16,
    pub bind_address: String,
    pub rust_log: String,
    pub log_format: LogFormat,

    // Sub-configurations
    pub kafka: KafkaConfig,
    pub key_issuer: KeyIssuerConfig,
    pub session: SessionConfig,
    pub redis_key_prefixes: RedisKeyPrefixes,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let port = env_parse("PORT", DEFAULT_PORT);
        let host = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_HOST.to_string());

        let log_format = std::env::var("LOG_FORMAT")
            .ok()
            .map(|f| f.parse::<LogFormat>())
            .transpose()?
            .unwrap_or(LogFormat::Text);

        let config = Self {
            redis_url: std::env::var("REDIS_URL").context("REDIS_URL must be set")?,
            port,
            bind_address: format!("{}:{}", host, port),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_format,
            kafka: KafkaConfig::from_env(),
            key_issuer: KeyIssuerConfig::from_env(),
            session: SessionConfig::from_env(),
            redis_key_prefixes: RedisKeyPrefixes::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(self.redis_url.starts_with("redis://") || self.redis_url.starts_with("rediss://")) {
            anyhow::bail!("REDIS_URL must start with redis:// or rediss://");
        }
        if self.key_issuer.max_attempts == 0 {
            anyhow::bail!("BOOTSTRAP_MAX_ATTEMPTS must be at least 1");
        }
        if self.kafka.broker_list().is_empty() {
            anyhow::bail!("KAFKA_BROKERS must list at least one broker");
        }
        if self.redis_key_prefixes.session.is_empty() {
            tracing::warn!("REDIS_KEY_PREFIX_SESSION is empty, session keys will be unprefixed");
        }
        Ok(())
    }
}

/// Parse an environment variable, falling back to `default` when unset or unparsable
pub(crate) fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

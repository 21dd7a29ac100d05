// ============================================================================
// Session & Key Bootstrap Configuration
// ============================================================================

use std::time::Duration;

use crate::constants::*;
use crate::env_parse;

/// TTL policy for session records in the shared store
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// TTL used when a session is created with an expiry already in the past
    pub fallback_ttl_secs: u64,
    /// TTL given to a session rewritten as expired on its first late validity check
    pub expired_ttl_secs: u64,
}

impl SessionConfig {
    pub(crate) fn from_env() -> Self {
        Self {
            fallback_ttl_secs: env_parse(
                "SESSION_FALLBACK_TTL_SECS",
                DEFAULT_SESSION_FALLBACK_TTL_SECS,
            ),
            expired_ttl_secs: env_parse(
                "SESSION_EXPIRED_TTL_SECS",
                DEFAULT_SESSION_EXPIRED_TTL_SECS,
            ),
        }
    }

    pub fn fallback_ttl(&self) -> Duration {
        Duration::from_secs(self.fallback_ttl_secs)
    }

    pub fn expired_ttl(&self) -> Duration {
        Duration::from_secs(self.expired_ttl_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            fallback_ttl_secs: DEFAULT_SESSION_FALLBACK_TTL_SECS,
            expired_ttl_secs: DEFAULT_SESSION_EXPIRED_TTL_SECS,
        }
    }
}

/// Where the verification key comes from at startup, and how hard to try
#[derive(Clone, Debug)]
pub struct KeyIssuerConfig {
    /// Base URL of the identity service
    pub base_url: String,
    /// Path of the "current public key" endpoint
    pub public_key_path: String,
    /// HTTP timeout per fetch
    pub timeout_secs: u64,
    /// Total fetch attempts before startup is aborted
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub retry_delay_ms: u64,
}

impl KeyIssuerConfig {
    pub(crate) fn from_env() -> Self {
        Self {
            base_url: std::env::var("KEY_ISSUER_URL")
                .unwrap_or_else(|_| DEFAULT_KEY_ISSUER_URL.to_string()),
            public_key_path: std::env::var("KEY_ISSUER_PUBLIC_KEY_PATH")
                .unwrap_or_else(|_| DEFAULT_KEY_ISSUER_PUBLIC_KEY_PATH.to_string()),
            timeout_secs: env_parse("KEY_ISSUER_TIMEOUT_SECS", DEFAULT_KEY_ISSUER_TIMEOUT_SECS),
            max_attempts: env_parse("BOOTSTRAP_MAX_ATTEMPTS", DEFAULT_BOOTSTRAP_MAX_ATTEMPTS),
            retry_delay_ms: env_parse(
                "BOOTSTRAP_RETRY_DELAY_MS",
                DEFAULT_BOOTSTRAP_RETRY_DELAY_MS,
            ),
        }
    }

    /// Full URL of the current-key endpoint
    pub fn public_key_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.public_key_path
        )
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for KeyIssuerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_KEY_ISSUER_URL.to_string(),
            public_key_path: DEFAULT_KEY_ISSUER_PUBLIC_KEY_PATH.to_string(),
            timeout_secs: DEFAULT_KEY_ISSUER_TIMEOUT_SECS,
            max_attempts: DEFAULT_BOOTSTRAP_MAX_ATTEMPTS,
            retry_delay_ms: DEFAULT_BOOTSTRAP_RETRY_DELAY_MS,
        }
    }
}

// ============================================================================
// Bootstrap Loader
// ============================================================================
//
// Fills the SigningKeyManager from the key issuer before the gateway starts
// serving. Fixed-delay retry, no delay after the final attempt. Exhausting
// the attempts is fatal: without a key no request can be authenticated.
//
// ============================================================================

use async_trait::async_trait;
use gateway_config::KeyIssuerConfig;
use gateway_error::{AppError, AppResult};
use gateway_metrics::KEY_BOOTSTRAP_ATTEMPTS_TOTAL;
use std::time::Duration;
use tracing::{info, warn};

use super::keys::{SigningKeyManager, VerificationKey};

/// Source of the issuer's current public key
#[async_trait]
pub trait KeyIssuer: Send + Sync {
    async fn fetch_current_key(&self) -> AppResult<VerificationKey>;
}

#[derive(Debug, Clone)]
pub struct BootstrapLoader {
    max_attempts: u32,
    retry_delay: Duration,
}

impl BootstrapLoader {
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    pub fn from_config(config: &KeyIssuerConfig) -> Self {
        Self::new(config.max_attempts, config.retry_delay())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Fetch the current key and install it as version 0.
    ///
    /// Fails with `IssuerUnavailable` carrying the attempt count once every
    /// attempt has failed.
    pub async fn load(&self, issuer: &dyn KeyIssuer, keys: &SigningKeyManager) -> AppResult<()> {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match issuer.fetch_current_key().await {
                Ok(key) => {
                    KEY_BOOTSTRAP_ATTEMPTS_TOTAL.with_label_values(&["success"]).inc();
                    info!(
                        attempt = attempt,
                        key_fingerprint = %key.fingerprint(),
                        "Fetched public key from key issuer"
                    );
                    keys.set_initial_key(key);
                    return Ok(());
                }
                Err(e) => {
                    KEY_BOOTSTRAP_ATTEMPTS_TOTAL.with_label_values(&["failure"]).inc();
                    warn!(
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Failed to fetch public key from key issuer"
                    );
                    last_error = Some(e);

                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(AppError::IssuerUnavailable {
            attempts: self.max_attempts,
            reason: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempt made".to_string()),
        })
    }
}

// ============================================================================
// Session Registry
// ============================================================================
//
// Tracks which bearer tokens are currently accepted for which user.
//
// Key layout:  {prefix}{user_id}:{sha256(token) as lowercase hex}
// Value:       JSON {user_id, status, created_at, expires_at}
//
// The raw token never reaches the store. Status only moves away from Active;
// rewrites that change status keep the record's remaining TTL, except the
// lazy expiry rewrite which shortens it.
//
// ============================================================================

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use gateway_config::{RedisKeyPrefixes, SessionConfig};
use gateway_error::{AppError, AppResult};
use gateway_metrics::{
    SESSION_SWEEP_RECORDS_TOTAL, SESSION_SWEEPS_FAILED_TOTAL, SESSIONS_CREATED_TOTAL,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::store::{KeyScan, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Revoked,
    Expired,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Revoked => write!(f, "revoked"),
            SessionStatus::Expired => write!(f, "expired"),
        }
    }
}

/// Stored session record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Result of a bulk revocation sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Keys returned by the scan
    pub scanned: usize,
    /// Records rewritten as revoked
    pub revoked: usize,
    /// Records already inactive, or gone before they could be rewritten
    pub skipped: usize,
    /// Records that could not be read, decoded or rewritten
    pub failed: usize,
}

/// Lowercase hex SHA-256 of a bearer token (64 characters)
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Short digest prefix, safe to put in logs
fn log_digest(digest: &str) -> &str {
    digest.get(..8).unwrap_or(digest)
}

/// Session registry over the shared store. Cheap to clone.
#[derive(Clone)]
pub struct SessionRegistry {
    store: Arc<dyn SessionStore>,
    prefix: String,
    config: SessionConfig,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("prefix", &self.prefix)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SessionRegistry {
    pub fn new(
        store: Arc<dyn SessionStore>,
        prefixes: &RedisKeyPrefixes,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            prefix: prefixes.session.clone(),
            config,
        }
    }

    /// Registry with the default `session:` prefix and TTL policy
    pub fn with_defaults(store: Arc<dyn SessionStore>) -> Self {
        Self::new(store, &RedisKeyPrefixes::default(), SessionConfig::default())
    }

    fn key_for_digest(&self, user_id: Uuid, digest: &str) -> String {
        format!("{}{}:{}", self.prefix, user_id, digest)
    }

    /// Store key of the session for `(user_id, token)`
    pub fn session_key(&self, user_id: Uuid, token: &str) -> String {
        self.key_for_digest(user_id, &token_digest(token))
    }

    fn user_pattern(&self, user_id: Uuid) -> String {
        format!("{}{}:*", self.prefix, user_id)
    }

    fn all_sessions_pattern(&self) -> String {
        format!("{}*", self.prefix)
    }

    /// Record a freshly authenticated session.
    ///
    /// The store TTL follows the token's expiry; an expiry that is already in
    /// the past gets the fallback TTL instead of a dead key.
    pub async fn create(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<Session> {
        let now = Utc::now();
        let session = Session {
            user_id,
            status: SessionStatus::Active,
            created_at: now,
            expires_at,
        };

        let ttl = match (expires_at - now).to_std() {
            Ok(ttl) if !ttl.is_zero() => ttl,
            _ => self.config.fallback_ttl(),
        };

        let digest = token_digest(token);
        let key = self.key_for_digest(user_id, &digest);
        let value = serde_json::to_string(&session)?;
        self.store.set_with_ttl(&key, &value, ttl).await?;
        SESSIONS_CREATED_TOTAL.inc();

        info!(
            user_id = %user_id,
            token_digest = %log_digest(&digest),
            ttl_secs = ttl.as_secs(),
            "Created session"
        );
        Ok(session)
    }

    /// Load the session for `(user_id, token)`; `NotFound` when there is none
    pub async fn get(&self, user_id: Uuid, token: &str) -> AppResult<Session> {
        let key = self.session_key(user_id, token);
        self.load(&key, user_id).await
    }

    async fn load(&self, key: &str, user_id: Uuid) -> AppResult<Session> {
        let data = self
            .store
            .get(key)
            .await?
            .ok_or_else(|| AppError::not_found("session not found"))?;

        let session: Session = serde_json::from_str(&data)?;
        // A record filed under another user's prefix is not this user's session
        if session.user_id != user_id {
            warn!(user_id = %user_id, "Session record user mismatch");
            return Err(AppError::not_found("session not found"));
        }
        Ok(session)
    }

    /// Mark one session revoked, keeping its remaining TTL
    pub async fn revoke(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        let digest = token_digest(token);
        let key = self.key_for_digest(user_id, &digest);

        let mut session = self.load(&key, user_id).await?;
        session.status = SessionStatus::Revoked;

        let value = serde_json::to_string(&session)?;
        if !self.store.set_keep_ttl(&key, &value).await? {
            // Expired between the read and the write
            return Err(AppError::not_found("session not found"));
        }

        info!(user_id = %user_id, token_digest = %log_digest(&digest), "Revoked session");
        Ok(())
    }

    /// Revoke every session of one user.
    ///
    /// Per-record failures are logged and skipped; only a failure of the scan
    /// itself is returned.
    pub async fn revoke_all(&self, user_id: Uuid) -> AppResult<SweepReport> {
        let report = self.sweep(self.user_pattern(user_id)).await?;
        info!(
            user_id = %user_id,
            revoked = report.revoked,
            skipped = report.skipped,
            failed = report.failed,
            "Revoked all user sessions"
        );
        Ok(report)
    }

    /// Revoke every session of every user, as required after a key rotation
    pub async fn revoke_every_session(&self) -> AppResult<SweepReport> {
        let report = self.sweep(self.all_sessions_pattern()).await?;
        info!(
            scanned = report.scanned,
            revoked = report.revoked,
            skipped = report.skipped,
            failed = report.failed,
            "Revoked all sessions"
        );
        Ok(report)
    }

    async fn sweep(&self, pattern: String) -> AppResult<SweepReport> {
        let mut scan = KeyScan::new(self.store.as_ref(), pattern);
        let mut report = SweepReport::default();

        while let Some(keys) = scan
            .next_batch()
            .await
            .inspect_err(|_| SESSION_SWEEPS_FAILED_TOTAL.inc())?
        {
            for key in keys {
                report.scanned += 1;
                let result = match self.revoke_key(&key).await {
                    Ok(true) => {
                        report.revoked += 1;
                        "revoked"
                    }
                    Ok(false) => {
                        report.skipped += 1;
                        "skipped"
                    }
                    Err(e) => {
                        warn!(key = %key, error = %e, "Failed to revoke session, continuing sweep");
                        report.failed += 1;
                        "failed"
                    }
                };
                SESSION_SWEEP_RECORDS_TOTAL.with_label_values(&[result]).inc();
            }
        }

        Ok(report)
    }

    /// Rewrite one record as revoked. Ok(false) when there was nothing to do.
    async fn revoke_key(&self, key: &str) -> AppResult<bool> {
        let Some(data) = self.store.get(key).await? else {
            return Ok(false);
        };

        let mut session: Session = serde_json::from_str(&data)?;
        if !session.is_active() {
            return Ok(false);
        }

        session.status = SessionStatus::Revoked;
        let value = serde_json::to_string(&session)?;
        self.store.set_keep_ttl(key, &value).await
    }

    /// Whether `(user_id, token)` is an active, unexpired session.
    ///
    /// `NotFound` is returned as an error, not as `false`. A session found
    /// past its expiry is rewritten as expired with a short TTL.
    pub async fn is_valid(&self, user_id: Uuid, token: &str) -> AppResult<bool> {
        let digest = token_digest(token);
        let key = self.key_for_digest(user_id, &digest);
        let mut session = self.load(&key, user_id).await?;

        if !session.is_active() {
            debug!(
                user_id = %user_id,
                token_digest = %log_digest(&digest),
                status = %session.status,
                "Session not active"
            );
            return Ok(false);
        }

        if session.is_past_expiry(Utc::now()) {
            session.status = SessionStatus::Expired;
            let value = serde_json::to_string(&session)?;
            self.store
                .set_with_ttl(&key, &value, self.config.expired_ttl())
                .await?;
            info!(
                user_id = %user_id,
                token_digest = %log_digest(&digest),
                "Session expired"
            );
            return Ok(false);
        }

        Ok(true)
    }
}

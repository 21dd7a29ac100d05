// ============================================================================
// Token Verification
// ============================================================================
//
// A request is authenticated when its bearer token
//   1. verifies (RS256) against the key currently held by SigningKeyManager,
//   2. carries a `user_id` claim and an unexpired `exp`,
//   3. maps to an active session in the SessionRegistry.
//
// Every failure is an authentication failure for the caller; the cause is
// only logged.
//
// ============================================================================

use chrono::{DateTime, Utc};
use gateway_error::{AppError, AppResult};
use jsonwebtoken::{Algorithm, Validation, decode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::key_management::SigningKeyManager;
use crate::sessions::{Session, SessionRegistry};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub exp: i64,
}

/// Caller identity attached to authenticated requests
#[derive(Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub permissions: Vec<String>,
    token: String,
}

impl AuthenticatedUser {
    /// Bearer token the request was authenticated with
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for AuthenticatedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedUser")
            .field("user_id", &self.user_id)
            .field("permissions", &self.permissions)
            .finish_non_exhaustive()
    }
}

pub struct TokenVerifier {
    keys: Arc<SigningKeyManager>,
    sessions: SessionRegistry,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(keys: Arc<SigningKeyManager>, sessions: SessionRegistry) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 0;
        Self {
            keys,
            sessions,
            validation,
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Check signature and claims against the current key only
    pub fn decode_claims(&self, token: &str) -> AppResult<Claims> {
        let key = self
            .keys
            .get_current_key()
            .ok_or_else(|| AppError::auth("no verification key loaded"))?;

        let data = decode::<Claims>(token, key.decoding_key(), &self.validation)?;
        Ok(data.claims)
    }

    /// Full request authentication: signature, claims and session state
    pub async fn verify(&self, token: &str) -> AppResult<AuthenticatedUser> {
        let claims = self.decode_claims(token)?;

        if !self.sessions.is_valid(claims.user_id, token).await? {
            return Err(AppError::auth("session is not active"));
        }

        Ok(AuthenticatedUser {
            user_id: claims.user_id,
            permissions: claims.permissions,
            token: token.to_string(),
        })
    }

    /// Record the session for a freshly issued token, expiring with it
    pub async fn open_session(&self, token: &str) -> AppResult<Session> {
        let claims = self.decode_claims(token)?;
        self.create_session(&claims, token).await
    }

    /// Login: drop the user's earlier sessions, then record this one.
    ///
    /// Failing to revoke earlier sessions is logged, not returned; the new
    /// session is still recorded.
    pub async fn login(&self, token: &str) -> AppResult<Session> {
        let claims = self.decode_claims(token)?;

        if let Err(e) = self.sessions.revoke_all(claims.user_id).await {
            warn!(
                user_id = %claims.user_id,
                error = %e,
                "Failed to revoke earlier sessions at login"
            );
        }

        self.create_session(&claims, token).await
    }

    async fn create_session(&self, claims: &Claims, token: &str) -> AppResult<Session> {
        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0)
            .ok_or_else(|| AppError::auth("exp claim out of range"))?;
        self.sessions.create(claims.user_id, token, expires_at).await
    }
}

// ============================================================================
// Redis Configuration
// ============================================================================

/// Redis key prefixes configuration
#[derive(Clone, Debug)]
pub struct RedisKeyPrefixes {
    /// Prefix for session keys: "session:{user_id}:{token_digest}"
    pub session: String,
}

impl RedisKeyPrefixes {
    pub(crate) fn from_env() -> Self {
        Self {
            session: std::env::var("REDIS_KEY_PREFIX_SESSION")
                .unwrap_or_else(|_| "session:".to_string()),
        }
    }
}

impl Default for RedisKeyPrefixes {
    fn default() -> Self {
        Self {
            session: "session:".to_string(),
        }
    }
}

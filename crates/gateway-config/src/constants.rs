// ============================================================================
// Configuration Constants
// ============================================================================

// Default listener
pub(crate) const DEFAULT_PORT: u16 = 8084;
pub(crate) const DEFAULT_BIND_HOST: &str = "0.0.0.0";

// Key Issuer (identity service)
pub(crate) const DEFAULT_KEY_ISSUER_URL: &str = "http://localhost:8082";
pub(crate) const DEFAULT_KEY_ISSUER_PUBLIC_KEY_PATH: &str = "/api/v1/keys/public";
pub(crate) const DEFAULT_KEY_ISSUER_TIMEOUT_SECS: u64 = 10;

// Bootstrap retry policy: fixed delay, no delay after the final attempt
pub(crate) const DEFAULT_BOOTSTRAP_MAX_ATTEMPTS: u32 = 10;
pub(crate) const DEFAULT_BOOTSTRAP_RETRY_DELAY_MS: u64 = 1000;

// Session TTLs
pub(crate) const DEFAULT_SESSION_FALLBACK_TTL_SECS: u64 = SECONDS_PER_DAY as u64;
// Expired sessions stay readable just long enough to be observed
pub(crate) const DEFAULT_SESSION_EXPIRED_TTL_SECS: u64 = SECONDS_PER_MINUTE as u64;

// Rotation consumer
pub(crate) const DEFAULT_KAFKA_RECONNECT_DELAY_SECS: u64 = 5;

// Time conversion constants
pub const SECONDS_PER_MINUTE: i64 = 60;
pub const SECONDS_PER_HOUR: i64 = 3600;
pub const SECONDS_PER_DAY: i64 = 86400;

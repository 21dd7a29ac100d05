// ============================================================================
// Gateway Shared - session & signing key rotation core
// ============================================================================
//
// Module map:
//   store           key-value seam over the shared store (Redis or in-memory)
//   sessions        SessionRegistry: per-token session records
//   key_management  SigningKeyManager, bootstrap loader, rotation handler
//   kafka           rotation event consumer
//   clients         key issuer HTTP client
//   auth            bearer token verification
//   gateway         axum middleware and session routes
//
// ============================================================================

pub mod auth;
pub mod clients;
pub mod gateway;
pub mod kafka;
pub mod key_management;
pub mod sessions;
pub mod store;

pub use auth::{AuthenticatedUser, Claims, TokenVerifier};
pub use key_management::{
    BootstrapLoader, KeyIssuer, KeyRotationHandler, RotationOutcome, SigningKeyManager,
    VerificationKey,
};
pub use sessions::{Session, SessionRegistry, SessionStatus, SweepReport, token_digest};
pub use store::{MemoryStore, SessionStore};

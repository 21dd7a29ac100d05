// Signing key lifecycle: startup fetch, in-process copy, rotation events

pub mod bootstrap;
pub mod keys;
pub mod rotation;

pub use bootstrap::{BootstrapLoader, KeyIssuer};
pub use keys::{KeyUpdate, SigningKeyManager, VerificationKey};
pub use rotation::{KeyRotationHandler, RejectReason, RotationOutcome};

// ============================================================================
// Signing Key Manager - in-process copy of the token verification key
// ============================================================================
//
// One instance per process, shared by reference (Arc) between the request
// path and the rotation consumer. The key and its version live in a single
// struct behind one lock, so a reader always gets a pair that was written
// together. Writers parse outside the lock; the critical section is a swap.
//
// ============================================================================

use gateway_error::{AppError, AppResult};
use gateway_metrics::SIGNING_KEY_VERSION;
use jsonwebtoken::DecodingKey;
use parking_lot::RwLock;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info};

const PUBLIC_KEY_PEM_LABEL: &str = "-----BEGIN PUBLIC KEY-----";

/// RSA public key ready for RS256 verification
pub struct VerificationKey {
    public_key: RsaPublicKey,
    decoding_key: DecodingKey,
    fingerprint: String,
}

impl VerificationKey {
    /// Parse an SPKI `PUBLIC KEY` PEM block holding an RSA key.
    ///
    /// Other PEM types (including PKCS#1 `RSA PUBLIC KEY`) and non-RSA
    /// algorithms are rejected with `InvalidKeyFormat`.
    pub fn from_pem(pem: &str) -> AppResult<Self> {
        let pem = pem.trim();
        if !pem.starts_with(PUBLIC_KEY_PEM_LABEL) {
            return Err(AppError::invalid_key("expected a PUBLIC KEY PEM block"));
        }

        let public_key = RsaPublicKey::from_public_key_pem(pem)
            .map_err(|e| AppError::invalid_key(format!("not an RSA public key: {}", e)))?;
        Ok(Self::from_rsa(public_key))
    }

    /// Build from the raw modulus and public exponent
    pub fn from_components(modulus: BigUint, exponent: BigUint) -> AppResult<Self> {
        let public_key = RsaPublicKey::new(modulus, exponent)
            .map_err(|e| AppError::invalid_key(format!("invalid RSA parameters: {}", e)))?;
        Ok(Self::from_rsa(public_key))
    }

    pub fn from_rsa(public_key: RsaPublicKey) -> Self {
        let n = public_key.n().to_bytes_be();
        let e = public_key.e().to_bytes_be();

        let mut hasher = Sha256::new();
        hasher.update(&n);
        hasher.update(&e);
        let fingerprint = hex::encode(&hasher.finalize()[..8]);

        Self {
            decoding_key: DecodingKey::from_rsa_raw_components(&n, &e),
            public_key,
            fingerprint,
        }
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// Short hex identifier of the key, for logs
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn modulus_bits(&self) -> usize {
        self.public_key.n().bits()
    }
}

impl PartialEq for VerificationKey {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key
    }
}

impl Eq for VerificationKey {}

impl std::fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationKey")
            .field("fingerprint", &self.fingerprint)
            .field("bits", &self.modulus_bits())
            .finish()
    }
}

/// What `update_key` did with a well-formed key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUpdate {
    /// The key was swapped in. `previous_version` is None when no key was loaded.
    Applied { previous_version: Option<i64> },
    /// Same version, same key: nothing changed
    Duplicate,
}

#[derive(Debug, Default)]
struct KeyState {
    current: Option<Arc<VerificationKey>>,
    version: i64,
}

/// Thread-safe holder of the current verification key and its version
#[derive(Debug, Default)]
pub struct SigningKeyManager {
    state: RwLock<KeyState>,
}

impl SigningKeyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current key, or None before bootstrap
    pub fn get_current_key(&self) -> Option<Arc<VerificationKey>> {
        self.state.read().current.clone()
    }

    pub fn get_key_version(&self) -> i64 {
        self.state.read().version
    }

    pub fn has_key(&self) -> bool {
        self.state.read().current.is_some()
    }

    /// Key and version as written together
    pub fn snapshot(&self) -> Option<(Arc<VerificationKey>, i64)> {
        let state = self.state.read();
        state.current.clone().map(|key| (key, state.version))
    }

    /// Install the bootstrap key at version 0
    pub fn set_initial_key(&self, key: VerificationKey) {
        let fingerprint = key.fingerprint().to_string();
        {
            let mut state = self.state.write();
            state.current = Some(Arc::new(key));
            state.version = 0;
        }
        SIGNING_KEY_VERSION.set(0);
        info!(key_fingerprint = %fingerprint, "Initial signing key loaded");
    }

    /// Replace the key from a rotation event.
    ///
    /// Malformed input fails with `InvalidKeyFormat` and leaves the loaded
    /// key untouched. Re-applying the loaded `(key, version)` is a no-op.
    /// Any other well-formed key is written, whatever its version: the issuer
    /// restarts its counter, so a lower version can still be the newest key.
    pub fn update_key(&self, pem: &str, version: i64) -> AppResult<KeyUpdate> {
        let key = VerificationKey::from_pem(pem)?;

        let outcome = {
            let mut state = self.state.write();
            let loaded = state
                .current
                .as_deref()
                .map(|current| (*current == key, state.version));

            match loaded {
                Some((true, current)) if version == current => KeyUpdate::Duplicate,
                previous => {
                    state.current = Some(Arc::new(key));
                    state.version = version;
                    KeyUpdate::Applied {
                        previous_version: previous.map(|(_, v)| v),
                    }
                }
            }
        };

        match outcome {
            KeyUpdate::Applied { previous_version } => {
                SIGNING_KEY_VERSION.set(version);
                info!(
                    key_version = version,
                    previous_version = ?previous_version,
                    "Signing key updated"
                );
            }
            KeyUpdate::Duplicate => debug!(key_version = version, "Signing key already current"),
        }
        Ok(outcome)
    }
}

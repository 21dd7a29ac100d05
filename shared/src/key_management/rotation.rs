// ============================================================================
// Key Rotation Handler
// ============================================================================
//
// Applies one rotation event: decode, swap the verification key, then sweep
// every session. Nothing here returns an error to the consumer loop; every
// outcome is logged and the message is committed regardless.
//
// A failed sweep does not roll back the key swap. Tokens signed by the old
// key already fail verification; the sweep is cleanup. The version whose
// sweep failed is remembered, and a redelivery of the same event runs the
// sweep again.
//
// ============================================================================

use gateway_metrics::KEY_ROTATIONS_TOTAL;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::keys::{KeyUpdate, SigningKeyManager};
use crate::kafka::KeyRotationEvent;
use crate::sessions::{SessionRegistry, SweepReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Message had no payload
    EmptyPayload,
    /// Payload is not a rotation event
    Decode,
    /// Event carried a malformed or non-RSA key
    InvalidKey,
}

/// What processing one rotation message did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOutcome {
    /// New key installed. `sweep` is None when the session sweep failed.
    Applied {
        version: i64,
        sweep: Option<SweepReport>,
    },
    /// Key and version already loaded
    Duplicate { version: i64 },
    /// Redelivery of an event whose sweep had failed; the sweep ran again
    SweepRetried {
        version: i64,
        sweep: Option<SweepReport>,
    },
    /// Poison message; the loaded key stays authoritative
    Rejected(RejectReason),
}

impl RotationOutcome {
    fn metric_label(&self) -> &'static str {
        match self {
            RotationOutcome::Applied { .. } => "applied",
            RotationOutcome::Duplicate { .. } => "duplicate",
            RotationOutcome::SweepRetried { .. } => "resweep",
            RotationOutcome::Rejected(_) => "rejected",
        }
    }
}

#[derive(Clone)]
pub struct KeyRotationHandler {
    keys: Arc<SigningKeyManager>,
    sessions: SessionRegistry,
    /// Version of the loaded key when its sweep has not completed
    pending_sweep: Arc<Mutex<Option<i64>>>,
}

impl KeyRotationHandler {
    pub fn new(keys: Arc<SigningKeyManager>, sessions: SessionRegistry) -> Self {
        Self {
            keys,
            sessions,
            pending_sweep: Arc::new(Mutex::new(None)),
        }
    }

    pub fn keys(&self) -> &Arc<SigningKeyManager> {
        &self.keys
    }

    /// Process one raw message payload
    pub async fn process_key_update(&self, payload: Option<&[u8]>) -> RotationOutcome {
        let outcome = self.decode_and_apply(payload).await;
        KEY_ROTATIONS_TOTAL
            .with_label_values(&[outcome.metric_label()])
            .inc();
        outcome
    }

    async fn decode_and_apply(&self, payload: Option<&[u8]>) -> RotationOutcome {
        let Some(payload) = payload else {
            warn!("Key update message has no payload, skipping");
            return RotationOutcome::Rejected(RejectReason::EmptyPayload);
        };

        let event = match KeyRotationEvent::from_slice(payload) {
            Ok(event) => event,
            Err(e) => {
                error!(error = %e, "Failed to decode key update message, skipping");
                return RotationOutcome::Rejected(RejectReason::Decode);
            }
        };

        self.apply(&event).await
    }

    /// Apply a decoded rotation event
    pub async fn apply(&self, event: &KeyRotationEvent) -> RotationOutcome {
        info!(
            service_name = %event.service_name,
            key_version = event.key_version,
            "Received public key update"
        );

        let update = match self.keys.update_key(&event.public_key_pem, event.key_version) {
            Ok(update) => update,
            Err(e) => {
                error!(
                    service_name = %event.service_name,
                    key_version = event.key_version,
                    error = %e,
                    "Rejected public key update, keeping current key"
                );
                return RotationOutcome::Rejected(RejectReason::InvalidKey);
            }
        };

        let version = event.key_version;
        let sweep_pending = *self.pending_sweep.lock() == Some(version);
        match update {
            KeyUpdate::Duplicate if sweep_pending => {
                warn!(
                    key_version = version,
                    "Retrying session sweep for redelivered key update"
                );
                RotationOutcome::SweepRetried {
                    version,
                    sweep: self.sweep(version).await,
                }
            }
            KeyUpdate::Duplicate => RotationOutcome::Duplicate { version },
            KeyUpdate::Applied { .. } => RotationOutcome::Applied {
                version,
                sweep: self.sweep(version).await,
            },
        }
    }

    /// Revoke every session after the key moved to `version`
    async fn sweep(&self, version: i64) -> Option<SweepReport> {
        let result = self.sessions.revoke_every_session().await;
        let sweep = match result {
            Ok(report) => Some(report),
            Err(e) => {
                error!(
                    key_version = version,
                    error = %e,
                    "Session sweep after key rotation failed"
                );
                None
            }
        };
        *self.pending_sweep.lock() = sweep.is_none().then_some(version);
        sweep
    }
}

//! Prometheus metrics for the API gateway
//!
//! Counters for the parts of the gateway that otherwise only show up in logs:
//! - Signing key bootstrap and rotation
//! - Session creation and revocation sweeps
//! - Key update consumer health

use anyhow::Result;
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, TextEncoder, opts, register_int_counter,
    register_int_counter_vec, register_int_gauge,
};

// ============================================================================
// Signing Key Metrics
// ============================================================================

/// Key update messages by outcome (applied, duplicate, resweep, rejected)
pub static KEY_ROTATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!(
            "gateway_key_rotations_total",
            "Key update messages processed, by outcome"
        ),
        &["outcome"]
    )
    .expect("Failed to register KEY_ROTATIONS_TOTAL metric")
});

/// Version of the verification key currently loaded
pub static SIGNING_KEY_VERSION: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(opts!(
        "gateway_signing_key_version",
        "Version of the currently loaded verification key"
    ))
    .expect("Failed to register SIGNING_KEY_VERSION metric")
});

/// Bootstrap fetches from the key issuer by result (success, failure)
pub static KEY_BOOTSTRAP_ATTEMPTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!(
            "gateway_key_bootstrap_attempts_total",
            "Attempts to fetch the initial key from the key issuer"
        ),
        &["result"]
    )
    .expect("Failed to register KEY_BOOTSTRAP_ATTEMPTS_TOTAL metric")
});

// ============================================================================
// Session Metrics
// ============================================================================

/// Sessions recorded
pub static SESSIONS_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "gateway_sessions_created_total",
        "Total number of sessions recorded"
    ))
    .expect("Failed to register SESSIONS_CREATED_TOTAL metric")
});

/// Records visited by revocation sweeps, by result (revoked, skipped, failed)
pub static SESSION_SWEEP_RECORDS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!(
            "gateway_session_sweep_records_total",
            "Session records visited by revocation sweeps, by result"
        ),
        &["result"]
    )
    .expect("Failed to register SESSION_SWEEP_RECORDS_TOTAL metric")
});

/// Sweeps aborted because the key scan failed
pub static SESSION_SWEEPS_FAILED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "gateway_session_sweeps_failed_total",
        "Revocation sweeps aborted by a key scan failure"
    ))
    .expect("Failed to register SESSION_SWEEPS_FAILED_TOTAL metric")
});

// ============================================================================
// Consumer Metrics
// ============================================================================

/// Times the key update consumer had to subscribe again after an error
pub static KAFKA_CONSUMER_RESUBSCRIBES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "gateway_kafka_consumer_resubscribes_total",
        "Key update consumer restarts after subscription or broker errors"
    ))
    .expect("Failed to register KAFKA_CONSUMER_RESUBSCRIBES_TOTAL metric")
});

/// Offset commits that failed
pub static KAFKA_COMMIT_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "gateway_kafka_commit_failures_total",
        "Key update offset commits that failed"
    ))
    .expect("Failed to register KAFKA_COMMIT_FAILURES_TOTAL metric")
});

// ============================================================================
// Metrics Collection
// ============================================================================

/// Gather all registered metrics and encode as Prometheus text format
pub fn gather_metrics() -> Result<String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode(&metric_families, &mut buffer)?;

    Ok(String::from_utf8(buffer)?)
}

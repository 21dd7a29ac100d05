// ============================================================================
// Session Registry Property Tests
// ============================================================================
//
// Round-trip, revocation monotonicity, lazy expiry and bulk revoke
// resilience over the in-memory store.
//
// ============================================================================

use chrono::{Duration, Utc};
use gateway_shared::{SessionRegistry, SessionStatus, SessionStore, token_digest};
use std::sync::Arc;
use uuid::Uuid;

use test_utils::*;

#[tokio::test]
async fn test_session_round_trip() {
    let gateway = test_gateway();
    let user = Uuid::new_v4();

    gateway
        .sessions
        .create(user, "token-1", Utc::now() + Duration::hours(2))
        .await
        .unwrap();
    let session = gateway.sessions.get(user, "token-1").await.unwrap();

    assert_eq!(session.status, SessionStatus::Active);
    assert_eq!(session.user_id, user);
}

#[tokio::test]
async fn test_revocation_survives_restart() {
    let gateway = test_gateway();
    let user = Uuid::new_v4();
    gateway
        .sessions
        .create(user, "token-1", Utc::now() + Duration::hours(2))
        .await
        .unwrap();
    gateway.sessions.revoke(user, "token-1").await.unwrap();

    // A new process sees the same store
    let restarted = SessionRegistry::with_defaults(Arc::new(gateway.store.clone()));
    for _ in 0..3 {
        assert!(!restarted.is_valid(user, "token-1").await.unwrap());
    }

    // Revoking again is allowed and stays revoked
    restarted.revoke(user, "token-1").await.unwrap();
    assert!(!restarted.is_valid(user, "token-1").await.unwrap());
}

#[tokio::test]
async fn test_lazy_expiry() {
    let gateway = test_gateway();
    let user = Uuid::new_v4();
    gateway
        .sessions
        .create(user, "token-1", Utc::now() - Duration::seconds(1))
        .await
        .unwrap();

    assert!(!gateway.sessions.is_valid(user, "token-1").await.unwrap());
    assert_eq!(
        gateway.sessions.get(user, "token-1").await.unwrap().status,
        SessionStatus::Expired
    );
}

#[tokio::test]
async fn test_bulk_revoke_with_corrupted_record() {
    let gateway = test_gateway();
    let user = Uuid::new_v4();
    let exp = Utc::now() + Duration::hours(1);

    for token in ["a", "b", "c"] {
        gateway.sessions.create(user, token, exp).await.unwrap();
    }
    let corrupted = format!("session:{}:{}", user, token_digest("b"));
    gateway
        .store
        .set_with_ttl(&corrupted, "\u{0}garbage", std::time::Duration::from_secs(600))
        .await
        .unwrap();

    let report = gateway.sessions.revoke_all(user).await.unwrap();
    assert_eq!(report.revoked, 2);
    assert_eq!(report.failed, 1);

    for token in ["a", "c"] {
        assert_eq!(
            gateway.sessions.get(user, token).await.unwrap().status,
            SessionStatus::Revoked
        );
    }
}

#[tokio::test]
async fn test_not_found_is_distinct_from_invalid() {
    let gateway = test_gateway();
    let user = Uuid::new_v4();

    let err = gateway.sessions.is_valid(user, "never-created").await.unwrap_err();
    assert!(err.is_not_found());

    gateway
        .sessions
        .create(user, "revoked", Utc::now() + Duration::hours(1))
        .await
        .unwrap();
    gateway.sessions.revoke(user, "revoked").await.unwrap();
    assert!(!gateway.sessions.is_valid(user, "revoked").await.unwrap());
}

#[tokio::test]
async fn test_concurrent_creates_and_sweep() {
    let gateway = test_gateway();
    let user = Uuid::new_v4();
    let exp = Utc::now() + Duration::hours(1);

    let creators: Vec<_> = (0..10)
        .map(|i| {
            let sessions = gateway.sessions.clone();
            tokio::spawn(async move {
                sessions.create(user, &format!("t{i}"), exp).await.unwrap();
            })
        })
        .collect();
    let sweep = {
        let sessions = gateway.sessions.clone();
        tokio::spawn(async move { sessions.revoke_all(user).await })
    };

    for creator in creators {
        creator.await.unwrap();
    }
    sweep.await.unwrap().unwrap();

    // Whatever the sweep missed, a second one catches
    gateway.sessions.revoke_all(user).await.unwrap();
    for i in 0..10 {
        assert!(!gateway.sessions.is_valid(user, &format!("t{i}")).await.unwrap());
    }
}

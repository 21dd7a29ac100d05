use super::*;
use crate::store::MemoryStore;
use chrono::Duration as ChronoDuration;
use std::time::Duration;

fn registry() -> (SessionRegistry, MemoryStore) {
    let store = MemoryStore::new();
    let registry = SessionRegistry::with_defaults(Arc::new(store.clone()));
    (registry, store)
}

#[test]
fn test_token_digest_is_lowercase_hex_sha256() {
    let digest = token_digest("abc");
    assert_eq!(
        digest,
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert_eq!(token_digest("").len(), 64);
}

#[test]
fn test_session_key_layout() {
    let (registry, _) = registry();
    let user = Uuid::new_v4();
    assert_eq!(
        registry.session_key(user, "abc"),
        format!("session:{}:{}", user, token_digest("abc"))
    );
}

#[test]
fn test_status_serializes_lowercase() {
    let session = Session {
        user_id: Uuid::nil(),
        status: SessionStatus::Revoked,
        created_at: Utc::now(),
        expires_at: Utc::now(),
    };
    let json: serde_json::Value = serde_json::to_value(&session).unwrap();
    assert_eq!(json["status"], "revoked");
    assert!(json.get("user_id").is_some());
    assert!(json.get("created_at").is_some());
    assert!(json.get("expires_at").is_some());
}

#[tokio::test]
async fn test_create_then_get() {
    let (registry, store) = registry();
    let user = Uuid::new_v4();
    let expires_at = Utc::now() + ChronoDuration::hours(1);

    let created = registry.create(user, "T1", expires_at).await.unwrap();
    assert_eq!(created.status, SessionStatus::Active);

    let loaded = registry.get(user, "T1").await.unwrap();
    assert_eq!(loaded, created);

    // Raw token is not part of the stored record or key
    let key = registry.session_key(user, "T1");
    assert!(!key.contains("T1"));
    let ttl = store.ttl(&key).unwrap();
    assert!(ttl <= Duration::from_secs(3600));
    assert!(ttl > Duration::from_secs(3500));
}

#[tokio::test]
async fn test_create_with_past_expiry_uses_fallback_ttl() {
    let (registry, store) = registry();
    let user = Uuid::new_v4();

    registry
        .create(user, "T1", Utc::now() - ChronoDuration::minutes(5))
        .await
        .unwrap();

    let ttl = store.ttl(&registry.session_key(user, "T1")).unwrap();
    assert!(ttl > Duration::from_secs(86_000));
}

#[tokio::test]
async fn test_get_unknown_is_not_found() {
    let (registry, _) = registry();
    let err = registry.get(Uuid::new_v4(), "nope").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_get_other_users_token_is_not_found() {
    let (registry, _) = registry();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    registry
        .create(alice, "T1", Utc::now() + ChronoDuration::hours(1))
        .await
        .unwrap();

    assert!(registry.get(bob, "T1").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_record_with_mismatched_user_is_not_found() {
    let (registry, store) = registry();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    // Bob's record filed under Alice's key
    let forged = Session {
        user_id: bob,
        status: SessionStatus::Active,
        created_at: Utc::now(),
        expires_at: Utc::now() + ChronoDuration::hours(1),
    };
    store
        .set_with_ttl(
            &registry.session_key(alice, "T1"),
            &serde_json::to_string(&forged).unwrap(),
            Duration::from_secs(60),
        )
        .await
        .unwrap();

    assert!(registry.get(alice, "T1").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_revoke_keeps_ttl() {
    let (registry, store) = registry();
    let user = Uuid::new_v4();
    registry
        .create(user, "T1", Utc::now() + ChronoDuration::hours(1))
        .await
        .unwrap();
    let key = registry.session_key(user, "T1");
    let ttl_before = store.ttl(&key).unwrap();

    registry.revoke(user, "T1").await.unwrap();

    let session = registry.get(user, "T1").await.unwrap();
    assert_eq!(session.status, SessionStatus::Revoked);
    let ttl_after = store.ttl(&key).unwrap();
    assert!(ttl_after <= ttl_before);
    assert!(ttl_after > Duration::from_secs(3500));
    assert!(!registry.is_valid(user, "T1").await.unwrap());
}

#[tokio::test]
async fn test_revoke_missing_is_not_found() {
    let (registry, _) = registry();
    let err = registry.revoke(Uuid::new_v4(), "T1").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_revoke_all_only_touches_one_user() {
    let (registry, _) = registry();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let exp = Utc::now() + ChronoDuration::hours(1);

    registry.create(alice, "A1", exp).await.unwrap();
    registry.create(alice, "A2", exp).await.unwrap();
    registry.create(bob, "B1", exp).await.unwrap();

    let report = registry.revoke_all(alice).await.unwrap();
    assert_eq!(report.revoked, 2);
    assert_eq!(report.failed, 0);

    assert!(!registry.is_valid(alice, "A1").await.unwrap());
    assert!(!registry.is_valid(alice, "A2").await.unwrap());
    assert!(registry.is_valid(bob, "B1").await.unwrap());
}

#[tokio::test]
async fn test_revoke_all_with_no_sessions() {
    let (registry, _) = registry();
    let report = registry.revoke_all(Uuid::new_v4()).await.unwrap();
    assert_eq!(report, SweepReport::default());
}

#[tokio::test]
async fn test_revoke_all_skips_inactive_and_survives_bad_records() {
    let store = MemoryStore::with_page_size(2);
    let registry = SessionRegistry::with_defaults(Arc::new(store.clone()));
    let user = Uuid::new_v4();
    let exp = Utc::now() + ChronoDuration::hours(1);

    for token in ["T1", "T2", "T3", "T4"] {
        registry.create(user, token, exp).await.unwrap();
    }
    registry.revoke(user, "T2").await.unwrap();

    // Undecodable record and unreadable record
    let corrupt = format!("session:{}:{}", user, "0".repeat(64));
    store
        .set_with_ttl(&corrupt, "{not json", Duration::from_secs(60))
        .await
        .unwrap();
    store.fail_key(&registry.session_key(user, "T3"));

    let report = registry.revoke_all(user).await.unwrap();
    assert_eq!(report.scanned, 5);
    assert_eq!(report.revoked, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 2);

    assert!(!registry.is_valid(user, "T1").await.unwrap());
    assert!(!registry.is_valid(user, "T4").await.unwrap());
}

#[tokio::test]
async fn test_revoke_all_propagates_scan_failure() {
    let (registry, store) = registry();
    store.fail_scans(true);
    let err = registry.revoke_all(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::StoreUnavailable(_)));
}

#[tokio::test]
async fn test_revoke_every_session_covers_all_users() {
    let (registry, _) = registry();
    let exp = Utc::now() + ChronoDuration::hours(1);
    let users: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
    for user in &users {
        registry.create(*user, "T", exp).await.unwrap();
    }

    let report = registry.revoke_every_session().await.unwrap();
    assert_eq!(report.revoked, 5);

    for user in &users {
        assert_eq!(
            registry.get(*user, "T").await.unwrap().status,
            SessionStatus::Revoked
        );
    }
}

#[tokio::test]
async fn test_is_valid_active_session() {
    let (registry, _) = registry();
    let user = Uuid::new_v4();
    registry
        .create(user, "T1", Utc::now() + ChronoDuration::hours(1))
        .await
        .unwrap();
    assert!(registry.is_valid(user, "T1").await.unwrap());
}

#[tokio::test]
async fn test_is_valid_missing_is_not_found_error() {
    let (registry, _) = registry();
    let err = registry.is_valid(Uuid::new_v4(), "T1").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_is_valid_marks_past_expiry_as_expired() {
    let (registry, store) = registry();
    let user = Uuid::new_v4();
    registry
        .create(user, "T1", Utc::now() - ChronoDuration::seconds(1))
        .await
        .unwrap();

    assert!(!registry.is_valid(user, "T1").await.unwrap());

    let session = registry.get(user, "T1").await.unwrap();
    assert_eq!(session.status, SessionStatus::Expired);
    let ttl = store.ttl(&registry.session_key(user, "T1")).unwrap();
    assert!(ttl <= Duration::from_secs(60));

    // Stays invalid, and a rotation sweep leaves it alone
    assert!(!registry.is_valid(user, "T1").await.unwrap());
    let report = registry.revoke_every_session().await.unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(
        registry.get(user, "T1").await.unwrap().status,
        SessionStatus::Expired
    );
}

#[tokio::test]
async fn test_is_valid_store_failure_propagates() {
    let (registry, store) = registry();
    let user = Uuid::new_v4();
    store.fail_key(&registry.session_key(user, "T1"));
    let err = registry.is_valid(user, "T1").await.unwrap_err();
    assert!(matches!(err, AppError::StoreUnavailable(_)));
}

#[tokio::test]
async fn test_custom_prefix() {
    let store = MemoryStore::new();
    let prefixes = RedisKeyPrefixes {
        session: "gw:sess:".to_string(),
    };
    let registry = SessionRegistry::new(
        Arc::new(store.clone()),
        &prefixes,
        SessionConfig::default(),
    );
    let user = Uuid::new_v4();
    registry
        .create(user, "T1", Utc::now() + ChronoDuration::hours(1))
        .await
        .unwrap();

    assert!(store
        .raw(&format!("gw:sess:{}:{}", user, token_digest("T1")))
        .is_some());
    assert_eq!(registry.revoke_every_session().await.unwrap().revoked, 1);
}

#[tokio::test]
async fn test_sweep_results_are_counted() {
    let (registry, store) = registry();
    let revoked = SESSION_SWEEP_RECORDS_TOTAL.with_label_values(&["revoked"]);
    let before_revoked = revoked.get();
    let before_aborted = SESSION_SWEEPS_FAILED_TOTAL.get();

    let user = Uuid::new_v4();
    registry
        .create(user, "T1", Utc::now() + ChronoDuration::hours(1))
        .await
        .unwrap();
    registry.revoke_all(user).await.unwrap();
    assert!(revoked.get() > before_revoked);

    store.fail_scans(true);
    assert!(registry.revoke_all(user).await.is_err());
    assert!(SESSION_SWEEPS_FAILED_TOTAL.get() > before_aborted);
}

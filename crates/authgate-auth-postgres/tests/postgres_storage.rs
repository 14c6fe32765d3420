//! Integration tests against a live PostgreSQL.
//!
//! Set `AUTHGATE_TEST_DATABASE_URL` to run them; they are skipped otherwise.

use std::sync::Arc;

use authgate_auth::storage::RefreshTokenStorage;
use authgate_auth::types::RefreshTokenRecord;
use authgate_auth_postgres::{PoolSettings, PostgresAuthStorage};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

async fn storage() -> Option<PostgresAuthStorage> {
    let url = std::env::var("AUTHGATE_TEST_DATABASE_URL").ok()?;
    let storage = PostgresAuthStorage::connect(&url, PoolSettings::default())
        .await
        .expect("connect to test database");
    storage.ensure_schema().await.expect("ensure schema");
    Some(storage)
}

fn record(user_id: Uuid) -> RefreshTokenRecord {
    let now = OffsetDateTime::now_utc();
    RefreshTokenRecord::new(
        user_id,
        RefreshTokenRecord::hash_token(&RefreshTokenRecord::generate_secret()),
        "integration-test",
        "127.0.0.1",
        now,
        now + Duration::days(1),
    )
}

#[tokio::test]
async fn test_create_find_and_revoke() {
    let Some(storage) = storage().await else {
        return;
    };
    let tokens = storage.refresh_token_storage();
    let record = record(Uuid::new_v4());

    tokens.create(&record).await.unwrap();
    let found = tokens.find_by_hash(&record.token_hash).await.unwrap().unwrap();
    assert_eq!(found.id, record.id);
    assert!(!found.revoked);

    assert!(tokens.revoke(record.id).await.unwrap());
    assert!(!tokens.revoke(record.id).await.unwrap());

    let found = tokens.find_by_hash(&record.token_hash).await.unwrap().unwrap();
    assert!(found.revoked);
    assert!(found.revoked_at.is_some());
}

#[tokio::test]
async fn test_duplicate_hash_is_rejected() {
    let Some(storage) = storage().await else {
        return;
    };
    let tokens = storage.refresh_token_storage();
    let first = record(Uuid::new_v4());
    let mut second = record(first.user_id);
    second.token_hash = first.token_hash.clone();

    tokens.create(&first).await.unwrap();
    assert!(tokens.create(&second).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_revoke_has_single_winner() {
    let Some(storage) = storage().await else {
        return;
    };
    let tokens = Arc::new(storage.refresh_token_storage());
    let record = record(Uuid::new_v4());
    tokens.create(&record).await.unwrap();
    let id = record.id;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let tokens = tokens.clone();
            tokio::spawn(async move { tokens.revoke(id).await.unwrap() })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn test_revoke_all_and_list_active() {
    let Some(storage) = storage().await else {
        return;
    };
    let tokens = storage.refresh_token_storage();
    let user_id = Uuid::new_v4();

    tokens.create(&record(user_id)).await.unwrap();
    tokens.create(&record(user_id)).await.unwrap();
    assert_eq!(tokens.list_active_for_user(user_id).await.unwrap().len(), 2);

    assert_eq!(tokens.revoke_all_for_user(user_id).await.unwrap(), 2);
    assert!(tokens.list_active_for_user(user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rotate_consumes_parent_once() {
    let Some(storage) = storage().await else {
        return;
    };
    let tokens = storage.refresh_token_storage();
    let parent = record(Uuid::new_v4());
    tokens.create(&parent).await.unwrap();

    let now = OffsetDateTime::now_utc();
    let child = parent.rotate(
        RefreshTokenRecord::hash_token(&RefreshTokenRecord::generate_secret()),
        "integration-test",
        "127.0.0.1",
        now,
    );
    assert!(tokens.rotate(parent.id, &child).await.unwrap());

    let stored = tokens.find_by_hash(&child.token_hash).await.unwrap().unwrap();
    assert_eq!(stored.parent_id, Some(parent.id));
    assert!(!stored.revoked);

    // Parent already consumed: the second child is not stored
    let late = parent.rotate(
        RefreshTokenRecord::hash_token(&RefreshTokenRecord::generate_secret()),
        "integration-test",
        "127.0.0.1",
        now,
    );
    assert!(!tokens.rotate(parent.id, &late).await.unwrap());
    assert!(tokens.find_by_hash(&late.token_hash).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rotate_and_revoke_all_leave_nothing_active() {
    let Some(storage) = storage().await else {
        return;
    };
    let tokens = Arc::new(storage.refresh_token_storage());

    for _ in 0..10 {
        let parent = record(Uuid::new_v4());
        tokens.create(&parent).await.unwrap();
        let child = parent.rotate(
            RefreshTokenRecord::hash_token(&RefreshTokenRecord::generate_secret()),
            "integration-test",
            "127.0.0.1",
            OffsetDateTime::now_utc(),
        );
        let user_id = parent.user_id;

        let rotating = {
            let tokens = tokens.clone();
            tokio::spawn(async move { tokens.rotate(parent.id, &child).await.unwrap() })
        };
        let revoking = {
            let tokens = tokens.clone();
            tokio::spawn(async move { tokens.revoke_all_for_user(user_id).await.unwrap() })
        };
        rotating.await.unwrap();
        revoking.await.unwrap();

        assert!(tokens.list_active_for_user(user_id).await.unwrap().is_empty());
    }
}

//! SQLite call log tests

use autodial_cd::db::{init_database_pool, init_tables, SqliteCallLog};
use autodial_cd::models::{AttemptState, CallAttempt, FailureReason, PhoneNumber};
use autodial_cd::services::CallLogStore;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

async fn memory_pool() -> SqlitePool {
    // One connection so every query sees the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_tables(&pool).await.unwrap();
    pool
}

fn number(raw: &str) -> PhoneNumber {
    PhoneNumber::parse(raw, None).unwrap()
}

fn connected(raw: &str, detail: &str) -> CallAttempt {
    let now = Utc::now();
    let mut attempt = CallAttempt::new(number(raw), now);
    attempt.begin_dialing(now).unwrap();
    attempt.mark_connected(Some(detail.to_string()), now).unwrap();
    attempt
}

fn failed(raw: &str, reason: FailureReason) -> CallAttempt {
    let now = Utc::now();
    let mut attempt = CallAttempt::new(number(raw), now);
    if reason != FailureReason::Cancelled {
        attempt.begin_dialing(now).unwrap();
    }
    attempt.mark_failed(reason, now).unwrap();
    attempt
}

#[tokio::test]
async fn test_records_read_back_in_dial_order() {
    let store = SqliteCallLog::new(memory_pool().await);
    let id = Uuid::new_v4();

    let first = connected("18005551234", "voicemail");
    let second = failed("+442079460958", FailureReason::Transport("busy signal".into()));
    let third = failed("18004443333", FailureReason::Cancelled);

    store.record(id, 2, &third).await.unwrap();
    store.record(id, 0, &first).await.unwrap();
    store.record(id, 1, &second).await.unwrap();

    let log = store.campaign_log(id).await.unwrap();
    assert_eq!(log.len(), 3);

    assert_eq!(log[0].number.as_str(), "18005551234");
    assert_eq!(log[0].state, AttemptState::Connected);
    assert_eq!(log[0].detail.as_deref(), Some("voicemail"));
    assert!(log[0].started_at.is_some());

    assert_eq!(log[1].number.as_str(), "+442079460958");
    assert_eq!(
        log[1].failure_reason,
        Some(FailureReason::Transport("busy signal".into()))
    );

    assert_eq!(log[2].failure_reason, Some(FailureReason::Cancelled));
    assert!(log[2].started_at.is_none());
    assert!(log[2].ended_at.is_some());
}

#[tokio::test]
async fn test_timestamps_survive_storage() {
    let store = SqliteCallLog::new(memory_pool().await);
    let id = Uuid::new_v4();
    let attempt = connected("18005551234", "call answered");

    store.record(id, 0, &attempt).await.unwrap();
    let log = store.campaign_log(id).await.unwrap();

    assert_eq!(log[0].queued_at.timestamp_millis(), attempt.queued_at.timestamp_millis());
    assert_eq!(
        log[0].ended_at.map(|t| t.timestamp_millis()),
        attempt.ended_at.map(|t| t.timestamp_millis())
    );
}

#[tokio::test]
async fn test_campaigns_are_kept_apart() {
    let store = SqliteCallLog::new(memory_pool().await);
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    store.record(a, 0, &connected("18005551234", "call answered")).await.unwrap();
    store.record(b, 0, &connected("18004443333", "call answered")).await.unwrap();
    store.record(b, 1, &connected("18002223333", "call answered")).await.unwrap();

    assert_eq!(store.campaign_log(a).await.unwrap().len(), 1);
    assert_eq!(store.campaign_log(b).await.unwrap().len(), 2);
    assert!(store.campaign_log(Uuid::new_v4()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_same_position_upserts() {
    let store = SqliteCallLog::new(memory_pool().await);
    let id = Uuid::new_v4();

    store
        .record(id, 0, &failed("18005551234", FailureReason::Transport("no answer".into())))
        .await
        .unwrap();
    store.record(id, 0, &connected("18005551234", "call answered")).await.unwrap();

    let log = store.campaign_log(id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].state, AttemptState::Connected);
    assert!(log[0].failure_reason.is_none());
}

#[tokio::test]
async fn test_file_database_created_and_reopened() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("calls.db");
    let id = Uuid::new_v4();

    {
        let pool = init_database_pool(&path).await.unwrap();
        SqliteCallLog::new(pool.clone())
            .record(id, 0, &connected("18005551234", "call answered"))
            .await
            .unwrap();
        pool.close().await;
    }
    assert!(path.exists());

    let pool = init_database_pool(&path).await.unwrap();
    let log = SqliteCallLog::new(pool).campaign_log(id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].number.as_str(), "18005551234");
}

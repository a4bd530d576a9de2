//! Sync sub-state tests: opt-in attempt counting, flag-gated sync
//! timestamps, error overwrite semantics, bucket counts, and the sync queue.

use sqlx::PgPool;

use opac_db::models::ill_request::{CreateIllRequest, SyncCounts, UpdateSyncStatus};
use opac_db::models::status::{RequestType, SyncStatus};
use opac_db::IllRequestRepo;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_request(barcode: &str, title: &str) -> CreateIllRequest {
    CreateIllRequest {
        request_type: RequestType::Borrow,
        patron_id: None,
        patron_barcode: barcode.to_string(),
        patron_name: None,
        title: title.to_string(),
        author: None,
        isbn: None,
        source: None,
        notes: None,
        needed_by: None,
        priority: None,
        provider: None,
        provider_request_id: None,
        sync_status: None,
        created_by: None,
    }
}

fn sync_update(status: SyncStatus) -> UpdateSyncStatus {
    UpdateSyncStatus {
        sync_status: status,
        provider: None,
        provider_request_id: None,
        sync_error: None,
        increment_attempts: false,
        mark_synced_at: false,
        updated_by: None,
    }
}

// ---------------------------------------------------------------------------
// Test: attempt counting is opt-in and exact
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn test_sync_attempts_increment_is_opt_in(pool: PgPool) {
    let repo = IllRequestRepo::new(pool);
    let id = repo.create(&new_request("s1", "Dune")).await.unwrap();

    // Two updates without the flag leave the counter alone.
    for _ in 0..2 {
        repo.update_sync_status(id, &sync_update(SyncStatus::Failed))
            .await
            .unwrap();
    }
    let row = repo.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(row.sync_attempts, 0);

    // Two updates with the flag add exactly two.
    for _ in 0..2 {
        repo.update_sync_status(
            id,
            &UpdateSyncStatus {
                increment_attempts: true,
                ..sync_update(SyncStatus::Failed)
            },
        )
        .await
        .unwrap();
    }
    let row = repo.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(row.sync_attempts, 2);
}

// ---------------------------------------------------------------------------
// Test: last_synced_at is flag-gated and only advances
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn test_last_synced_at_flag_gated(pool: PgPool) {
    let repo = IllRequestRepo::new(pool);
    let id = repo.create(&new_request("s2", "Hyperion")).await.unwrap();

    // A synced status alone does not imply a sync timestamp.
    repo.update_sync_status(id, &sync_update(SyncStatus::Synced))
        .await
        .unwrap();
    let row = repo.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(row.sync_status, "synced");
    assert!(row.last_synced_at.is_none());

    // The flag sets it.
    repo.update_sync_status(
        id,
        &UpdateSyncStatus {
            mark_synced_at: true,
            ..sync_update(SyncStatus::Synced)
        },
    )
    .await
    .unwrap();
    let first = repo
        .find_by_id(id)
        .await
        .unwrap()
        .unwrap()
        .last_synced_at
        .expect("last_synced_at should be set");

    // A later un-flagged update keeps it; a flagged one only advances it.
    repo.update_sync_status(id, &sync_update(SyncStatus::Pending))
        .await
        .unwrap();
    let row = repo.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(row.last_synced_at, Some(first));

    repo.update_sync_status(
        id,
        &UpdateSyncStatus {
            mark_synced_at: true,
            ..sync_update(SyncStatus::Synced)
        },
    )
    .await
    .unwrap();
    let row = repo.find_by_id(id).await.unwrap().unwrap();
    assert!(row.last_synced_at.unwrap() >= first);
}

// ---------------------------------------------------------------------------
// Test: sync_error is overwritten on every call, None included
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn test_sync_error_overwritten_verbatim(pool: PgPool) {
    let repo = IllRequestRepo::new(pool);
    let id = repo.create(&new_request("s3", "Solaris")).await.unwrap();

    repo.update_sync_status(
        id,
        &UpdateSyncStatus {
            sync_error: Some("provider timeout".to_string()),
            increment_attempts: true,
            ..sync_update(SyncStatus::Failed)
        },
    )
    .await
    .unwrap();
    let row = repo.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(row.sync_error.as_deref(), Some("provider timeout"));

    // A successful follow-up passes None, which clears the message.
    repo.update_sync_status(
        id,
        &UpdateSyncStatus {
            mark_synced_at: true,
            ..sync_update(SyncStatus::Synced)
        },
    )
    .await
    .unwrap();
    let row = repo.find_by_id(id).await.unwrap().unwrap();
    assert!(row.sync_error.is_none());
    // The attempt counter never resets.
    assert_eq!(row.sync_attempts, 1);
}

// ---------------------------------------------------------------------------
// Test: provider identity is keep-if-absent
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn test_provider_fields_kept_when_absent(pool: PgPool) {
    let repo = IllRequestRepo::new(pool);
    let id = repo.create(&new_request("s4", "Ubik")).await.unwrap();

    repo.update_sync_status(
        id,
        &UpdateSyncStatus {
            provider: Some("oclc-worldshare".to_string()),
            provider_request_id: Some("WS-11520".to_string()),
            mark_synced_at: true,
            updated_by: Some(9),
            ..sync_update(SyncStatus::Synced)
        },
    )
    .await
    .unwrap();

    // A later status-only update must not lose the provider identity.
    repo.update_sync_status(id, &sync_update(SyncStatus::Pending))
        .await
        .unwrap();

    let row = repo.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(row.provider.as_deref(), Some("oclc-worldshare"));
    assert_eq!(row.provider_request_id.as_deref(), Some("WS-11520"));
    assert_eq!(row.updated_by, Some(9));
}

// ---------------------------------------------------------------------------
// Test: not-found returns false
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn test_update_sync_nonexistent_returns_false(pool: PgPool) {
    let repo = IllRequestRepo::new(pool);
    let updated = repo
        .update_sync_status(999_999_999, &sync_update(SyncStatus::Pending))
        .await
        .unwrap();
    assert!(!updated);
}

// ---------------------------------------------------------------------------
// Test: sync counts cover every bucket
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn test_sync_counts_cover_all_buckets(pool: PgPool) {
    let repo = IllRequestRepo::new(pool);

    // Empty table: all buckets present, all zero.
    assert_eq!(repo.sync_counts().await.unwrap(), SyncCounts::default());

    // Three defaults land in `manual`.
    let a = repo.create(&new_request("s5", "Foundation")).await.unwrap();
    let b = repo.create(&new_request("s5", "Second Foundation")).await.unwrap();
    repo.create(&new_request("s5", "Foundation and Empire"))
        .await
        .unwrap();
    assert_eq!(
        repo.sync_counts().await.unwrap(),
        SyncCounts {
            manual: 3,
            ..Default::default()
        }
    );

    // Moving rows between buckets moves the counts.
    repo.update_sync_status(a, &sync_update(SyncStatus::Pending))
        .await
        .unwrap();
    repo.update_sync_status(b, &sync_update(SyncStatus::Failed))
        .await
        .unwrap();
    assert_eq!(
        repo.sync_counts().await.unwrap(),
        SyncCounts {
            manual: 1,
            pending: 1,
            synced: 0,
            failed: 1,
        }
    );
}

// ---------------------------------------------------------------------------
// Test: sync queue listing
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn test_sync_queue_scoped_and_ordered(pool: PgPool) {
    let repo = IllRequestRepo::new(pool);
    let a = repo.create(&new_request("s6", "Roadside Picnic")).await.unwrap();
    let b = repo.create(&new_request("s6", "Hard to Be a God")).await.unwrap();
    repo.create(&new_request("s6", "The Doomed City")).await.unwrap();

    repo.update_sync_status(a, &sync_update(SyncStatus::Pending))
        .await
        .unwrap();
    repo.update_sync_status(b, &sync_update(SyncStatus::Pending))
        .await
        .unwrap();

    let queue = repo
        .list_sync_queue(SyncStatus::Pending, None)
        .await
        .unwrap();
    assert_eq!(queue.len(), 2);
    // b was touched last, so it leads the queue.
    assert_eq!(queue[0].id, b);
    assert_eq!(queue[1].id, a);
    assert!(queue.iter().all(|r| r.sync_status == "pending"));

    // The limit clamps exactly like `list`.
    let clamped = repo
        .list_sync_queue(SyncStatus::Pending, Some(0))
        .await
        .unwrap();
    assert_eq!(clamped.len(), 1);

    let empty = repo
        .list_sync_queue(SyncStatus::Failed, None)
        .await
        .unwrap();
    assert!(empty.is_empty());
}

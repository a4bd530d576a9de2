//! Self-healing schema bootstrap for the ILL request tracker.
//!
//! The table is provisioned at runtime rather than through a migration run:
//! external integrations write to the same database on their own schedule,
//! so every statement here must be safe to re-run against a database in any
//! prior shape. Pre-existing installations that predate the sync columns are
//! upgraded additively and backfilled.

use std::sync::Arc;

use sqlx::{PgConnection, PgPool};
use tokio::sync::OnceCell;

/// Table creation, current shape. Enumerated columns are CHECK-constrained;
/// new rows default to `status='new'`, `priority='normal'`,
/// `sync_status='manual'`.
const CREATE_TABLE: &str = "\
    CREATE TABLE IF NOT EXISTS library.ill_requests ( \
        id BIGSERIAL PRIMARY KEY, \
        request_type TEXT NOT NULL CHECK (request_type IN ('borrow', 'lend')), \
        status TEXT NOT NULL DEFAULT 'new' CHECK (status IN \
            ('new', 'requested', 'in_transit', 'received', 'completed', 'canceled')), \
        priority TEXT NOT NULL DEFAULT 'normal' CHECK (priority IN ('low', 'normal', 'high')), \
        patron_id BIGINT, \
        patron_barcode TEXT NOT NULL, \
        patron_name TEXT, \
        title TEXT NOT NULL, \
        author TEXT, \
        isbn TEXT, \
        source TEXT, \
        notes TEXT, \
        needed_by DATE, \
        provider TEXT, \
        provider_request_id TEXT, \
        sync_status TEXT NOT NULL DEFAULT 'manual' CHECK (sync_status IN \
            ('manual', 'pending', 'synced', 'failed')), \
        sync_error TEXT, \
        sync_attempts INTEGER NOT NULL DEFAULT 0, \
        last_synced_at TIMESTAMPTZ, \
        requested_at TIMESTAMPTZ NOT NULL DEFAULT NOW(), \
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(), \
        created_by BIGINT, \
        updated_by BIGINT \
    )";

/// Indexes and additive upgrades, in application order. Installations created
/// before the provider sync feature get the six sync columns added here
/// (nullable, no CHECK) and their defaults backfilled.
const UPGRADES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_ill_requests_status \
     ON library.ill_requests (status, requested_at DESC, id DESC)",
    "CREATE INDEX IF NOT EXISTS idx_ill_requests_patron_barcode \
     ON library.ill_requests (patron_barcode)",
    "ALTER TABLE library.ill_requests ADD COLUMN IF NOT EXISTS provider TEXT",
    "ALTER TABLE library.ill_requests ADD COLUMN IF NOT EXISTS provider_request_id TEXT",
    "ALTER TABLE library.ill_requests ADD COLUMN IF NOT EXISTS sync_status TEXT",
    "ALTER TABLE library.ill_requests ADD COLUMN IF NOT EXISTS sync_error TEXT",
    "ALTER TABLE library.ill_requests ADD COLUMN IF NOT EXISTS sync_attempts INTEGER",
    "ALTER TABLE library.ill_requests ADD COLUMN IF NOT EXISTS last_synced_at TIMESTAMPTZ",
    "UPDATE library.ill_requests SET sync_status = 'manual' WHERE sync_status IS NULL",
    "UPDATE library.ill_requests SET sync_attempts = 0 WHERE sync_attempts IS NULL",
    "CREATE INDEX IF NOT EXISTS idx_ill_requests_sync_status \
     ON library.ill_requests (sync_status, updated_at DESC, id DESC)",
];

/// One-shot "schema is ready" latch, injected into repository constructors.
///
/// Cloning shares the latch, so every repository built from the same guard
/// bootstraps at most once per process. A fresh guard (a fresh simulated
/// process) re-runs the bootstrap, which is harmless: every statement is
/// idempotent. A failed bootstrap leaves the latch unset and the next call
/// retries from scratch.
#[derive(Clone, Default)]
pub struct SchemaGuard {
    ready: Arc<OnceCell<()>>,
}

impl SchemaGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure the `library.ill_requests` table, its indexes, and any missing
    /// columns exist. Memoized per guard; concurrent callers coalesce.
    pub async fn ensure(&self, pool: &PgPool) -> Result<(), sqlx::Error> {
        self.ready
            .get_or_try_init(|| bootstrap(pool))
            .await
            .map(|_| ())
    }
}

/// Run the full bootstrap inside a single transaction. Any failure rolls the
/// whole thing back and propagates.
async fn bootstrap(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    ensure_library_schema(&mut tx).await?;
    sqlx::query(CREATE_TABLE).execute(&mut *tx).await?;
    for statement in UPGRADES {
        sqlx::query(statement).execute(&mut *tx).await?;
    }

    tx.commit().await?;
    tracing::debug!("ill_requests schema ready");
    Ok(())
}

/// Assert the containing `library` schema exists before touching the table.
async fn ensure_library_schema(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query("CREATE SCHEMA IF NOT EXISTS library")
        .execute(conn)
        .await?;
    Ok(())
}

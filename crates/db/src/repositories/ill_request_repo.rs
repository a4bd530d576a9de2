//! Repository for the `library.ill_requests` table.
//!
//! Workflow status and sync status are independent axes over the same row,
//! updated through two separate operations. Neither axis enforces a
//! transition table; the CHECK constraints gate spelling only.

use sqlx::PgPool;

use opac_core::types::DbId;

use crate::error::DbError;
use crate::models::ill_request::{
    CreateIllRequest, IllRequest, IllRequestListParams, SyncCounts, UpdateIllRequest,
    UpdateSyncStatus,
};
use crate::models::status::SyncStatus;
use crate::schema::SchemaGuard;

/// Column list for `ill_requests` queries. The sync columns are read through
/// COALESCE so rows written before an in-place upgrade finished backfilling
/// still decode.
const COLUMNS: &str = "\
    id, request_type, status, priority, \
    patron_id, patron_barcode, patron_name, \
    title, author, isbn, source, notes, needed_by, \
    provider, provider_request_id, \
    COALESCE(sync_status, 'manual') AS sync_status, sync_error, \
    COALESCE(sync_attempts, 0) AS sync_attempts, last_synced_at, \
    requested_at, updated_at, created_by, updated_by";

/// Maximum page size for request listing.
const MAX_LIMIT: i64 = 500;

/// Minimum page size; smaller requested limits are clamped up, not rejected.
const MIN_LIMIT: i64 = 1;

/// Default page size for request listing.
const DEFAULT_LIMIT: i64 = 100;

/// Provides CRUD and sync-state operations for interlibrary loan requests.
pub struct IllRequestRepo {
    pool: PgPool,
    schema: SchemaGuard,
}

impl IllRequestRepo {
    /// Build a repository with its own schema guard.
    pub fn new(pool: PgPool) -> Self {
        Self::with_guard(pool, SchemaGuard::new())
    }

    /// Build a repository sharing an existing schema guard, so several
    /// repositories (or several handlers) bootstrap at most once.
    pub fn with_guard(pool: PgPool, schema: SchemaGuard) -> Self {
        Self { pool, schema }
    }

    async fn ensure(&self) -> Result<(), DbError> {
        self.schema.ensure(&self.pool).await?;
        Ok(())
    }

    /// List requests, newest first (`requested_at DESC, id DESC` for a
    /// stable order under equal timestamps), optionally filtered by
    /// workflow status. The limit is clamped to [1, 500], defaulting to 100.
    pub async fn list(
        &self,
        params: &IllRequestListParams,
    ) -> Result<Vec<IllRequest>, DbError> {
        self.ensure().await?;
        let limit = clamp_limit(params.limit);

        let rows = match params.status {
            Some(status) => {
                let query = format!(
                    "SELECT {COLUMNS} FROM library.ill_requests \
                     WHERE status = $1 \
                     ORDER BY requested_at DESC, id DESC \
                     LIMIT $2"
                );
                sqlx::query_as::<_, IllRequest>(&query)
                    .bind(status.as_str())
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let query = format!(
                    "SELECT {COLUMNS} FROM library.ill_requests \
                     ORDER BY requested_at DESC, id DESC \
                     LIMIT $1"
                );
                sqlx::query_as::<_, IllRequest>(&query)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows)
    }

    /// Find a request by its ID.
    pub async fn find_by_id(&self, id: DbId) -> Result<Option<IllRequest>, DbError> {
        self.ensure().await?;
        let query = format!("SELECT {COLUMNS} FROM library.ill_requests WHERE id = $1");
        let row = sqlx::query_as::<_, IllRequest>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// List all requests for a patron barcode, newest first.
    pub async fn list_by_patron(&self, barcode: &str) -> Result<Vec<IllRequest>, DbError> {
        self.ensure().await?;
        let query = format!(
            "SELECT {COLUMNS} FROM library.ill_requests \
             WHERE patron_barcode = $1 \
             ORDER BY requested_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, IllRequest>(&query)
            .bind(barcode)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Insert a new request, returning the generated ID.
    ///
    /// The workflow status is always `new`; callers cannot seed it.
    /// `priority` defaults to `normal` and the sync sub-state to
    /// `manual` / 0 attempts unless the caller supplies seed values (used
    /// when importing rows already known to the provider). The actor id is
    /// recorded as both `created_by` and `updated_by`.
    pub async fn create(&self, input: &CreateIllRequest) -> Result<DbId, DbError> {
        self.ensure().await?;
        let id: Option<DbId> = sqlx::query_scalar(
            "INSERT INTO library.ill_requests \
                 (request_type, status, priority, \
                  patron_id, patron_barcode, patron_name, \
                  title, author, isbn, source, notes, needed_by, \
                  provider, provider_request_id, sync_status, sync_attempts, \
                  created_by, updated_by) \
             VALUES ($1, 'new', COALESCE($2, 'normal'), \
                     $3, $4, $5, \
                     $6, $7, $8, $9, $10, $11, \
                     $12, $13, COALESCE($14, 'manual'), 0, \
                     $15, $15) \
             RETURNING id",
        )
        .bind(input.request_type.as_str())
        .bind(input.priority.map(|p| p.as_str()))
        .bind(input.patron_id)
        .bind(&input.patron_barcode)
        .bind(&input.patron_name)
        .bind(&input.title)
        .bind(&input.author)
        .bind(&input.isbn)
        .bind(&input.source)
        .bind(&input.notes)
        .bind(input.needed_by)
        .bind(&input.provider)
        .bind(&input.provider_request_id)
        .bind(input.sync_status.map(|s| s.as_str()))
        .bind(input.created_by)
        .fetch_optional(&self.pool)
        .await?;

        id.ok_or(DbError::CreationFailed)
    }

    /// Patch the workflow-facing fields of a request. Only non-`None`
    /// fields in `input` are applied; `updated_at` is stamped regardless.
    ///
    /// Returns `true` if a row with that `id` existed and was touched,
    /// `false` otherwise.
    pub async fn update_request(
        &self,
        id: DbId,
        input: &UpdateIllRequest,
    ) -> Result<bool, DbError> {
        self.ensure().await?;
        let result = sqlx::query(
            "UPDATE library.ill_requests SET \
                 status = COALESCE($2, status), \
                 priority = COALESCE($3, priority), \
                 source = COALESCE($4, source), \
                 notes = COALESCE($5, notes), \
                 needed_by = COALESCE($6, needed_by), \
                 updated_by = COALESCE($7, updated_by), \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(input.status.map(|s| s.as_str()))
        .bind(input.priority.map(|p| p.as_str()))
        .bind(&input.source)
        .bind(&input.notes)
        .bind(input.needed_by)
        .bind(input.updated_by)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update the sync sub-state of a request.
    ///
    /// `sync_error` is written verbatim (passing `None` clears it), while
    /// `provider`, `provider_request_id`, and `updated_by` keep their prior
    /// value when absent. `sync_attempts` grows by one only when
    /// `increment_attempts` is set, and `last_synced_at` advances only when
    /// `mark_synced_at` is set; both live inside the single UPDATE so
    /// concurrent calls cannot lose an increment.
    ///
    /// Returns `true` if a row with that `id` existed and was touched,
    /// `false` otherwise.
    pub async fn update_sync_status(
        &self,
        id: DbId,
        input: &UpdateSyncStatus,
    ) -> Result<bool, DbError> {
        self.ensure().await?;
        let result = sqlx::query(
            "UPDATE library.ill_requests SET \
                 sync_status = $2, \
                 provider = COALESCE($3, provider), \
                 provider_request_id = COALESCE($4, provider_request_id), \
                 sync_error = $5, \
                 sync_attempts = COALESCE(sync_attempts, 0) + \
                     CASE WHEN $6 THEN 1 ELSE 0 END, \
                 last_synced_at = CASE WHEN $7 THEN NOW() ELSE last_synced_at END, \
                 updated_by = COALESCE($8, updated_by), \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(input.sync_status.as_str())
        .bind(&input.provider)
        .bind(&input.provider_request_id)
        .bind(&input.sync_error)
        .bind(input.increment_attempts)
        .bind(input.mark_synced_at)
        .bind(input.updated_by)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List requests in a given sync bucket, most recently touched first.
    /// The limit is clamped like [`Self::list`].
    pub async fn list_sync_queue(
        &self,
        sync_status: SyncStatus,
        limit: Option<i64>,
    ) -> Result<Vec<IllRequest>, DbError> {
        self.ensure().await?;
        let query = format!(
            "SELECT {COLUMNS} FROM library.ill_requests \
             WHERE sync_status = $1 \
             ORDER BY updated_at DESC, id DESC \
             LIMIT $2"
        );
        let rows = sqlx::query_as::<_, IllRequest>(&query)
            .bind(sync_status.as_str())
            .bind(clamp_limit(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Count requests per sync bucket for the operations dashboard.
    ///
    /// Every bucket is present in the result, zero when empty. Status values
    /// outside the enumeration (possible on upgraded installations, where
    /// the column carries no CHECK constraint) are skipped.
    pub async fn sync_counts(&self) -> Result<SyncCounts, DbError> {
        self.ensure().await?;
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT COALESCE(sync_status, 'manual') AS sync_status, COUNT(*) AS count \
             FROM library.ill_requests \
             GROUP BY 1",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = SyncCounts::default();
        for (value, count) in rows {
            match SyncStatus::parse(&value) {
                Some(SyncStatus::Manual) => counts.manual += count,
                Some(SyncStatus::Pending) => counts.pending += count,
                Some(SyncStatus::Synced) => counts.synced += count,
                Some(SyncStatus::Failed) => counts.failed += count,
                None => {
                    tracing::warn!(sync_status = %value, "ignoring unrecognized sync status");
                }
            }
        }
        Ok(counts)
    }
}

/// Clamp a requested page size to [1, 500], defaulting to 100.
fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(MIN_LIMIT, MAX_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::clamp_limit;

    #[test]
    fn limit_clamps_to_bounds() {
        assert_eq!(clamp_limit(None), 100);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(-5)), 1);
        assert_eq!(clamp_limit(Some(250)), 250);
        assert_eq!(clamp_limit(Some(10_000)), 500);
    }
}

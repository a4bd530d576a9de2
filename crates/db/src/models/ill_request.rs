//! Interlibrary loan request models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use opac_core::types::{Date, DbId, Timestamp};

use super::status::{Priority, RequestStatus, RequestType, SyncStatus};

// ---------------------------------------------------------------------------
// Entity struct (database row)
// ---------------------------------------------------------------------------

/// A row from the `library.ill_requests` table.
///
/// The enumerated columns are stored as their raw database text. On
/// installations upgraded in place, the ALTER-added sync columns carry no
/// CHECK constraint, so decoding stays permissive and typed interpretation
/// happens at the call site via [`super::status`].
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct IllRequest {
    pub id: DbId,
    pub request_type: String,
    pub status: String,
    pub priority: String,
    pub patron_id: Option<DbId>,
    pub patron_barcode: String,
    pub patron_name: Option<String>,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub needed_by: Option<Date>,
    pub provider: Option<String>,
    pub provider_request_id: Option<String>,
    pub sync_status: String,
    pub sync_error: Option<String>,
    pub sync_attempts: i32,
    pub last_synced_at: Option<Timestamp>,
    pub requested_at: Timestamp,
    pub updated_at: Timestamp,
    pub created_by: Option<DbId>,
    pub updated_by: Option<DbId>,
}

// ---------------------------------------------------------------------------
// DTOs (request payloads)
// ---------------------------------------------------------------------------

/// DTO for creating a new request.
///
/// Carries no workflow status field: every request starts as `new`. The sync
/// seed fields exist for pre-populating rows imported from an external
/// provider; when absent the row starts `manual` with zero attempts.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateIllRequest {
    pub request_type: RequestType,
    pub patron_id: Option<DbId>,
    pub patron_barcode: String,
    pub patron_name: Option<String>,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub needed_by: Option<Date>,
    pub priority: Option<Priority>,
    pub provider: Option<String>,
    pub provider_request_id: Option<String>,
    pub sync_status: Option<SyncStatus>,
    /// Actor recorded as both `created_by` and `updated_by`.
    pub created_by: Option<DbId>,
}

/// DTO for updating the workflow-facing fields of a request.
///
/// Only non-`None` fields are applied; everything else keeps its prior
/// value. `updated_at` is stamped on every call regardless.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateIllRequest {
    pub status: Option<RequestStatus>,
    pub priority: Option<Priority>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub needed_by: Option<Date>,
    pub updated_by: Option<DbId>,
}

/// DTO for updating the sync sub-state of a request.
///
/// Unlike the other optional fields, `sync_error` is written verbatim on
/// every call: callers pass the current failure message, or `None` to clear
/// a previous one.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSyncStatus {
    pub sync_status: SyncStatus,
    pub provider: Option<String>,
    pub provider_request_id: Option<String>,
    pub sync_error: Option<String>,
    /// When true, `sync_attempts` grows by exactly one.
    #[serde(default)]
    pub increment_attempts: bool,
    /// When true, `last_synced_at` is set to the database's current time.
    #[serde(default)]
    pub mark_synced_at: bool,
    pub updated_by: Option<DbId>,
}

/// Query parameters for listing requests.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IllRequestListParams {
    /// Filter by workflow status. When absent, all statuses are returned.
    pub status: Option<RequestStatus>,
    /// Maximum number of results. Defaults to 100, clamped to [1, 500].
    pub limit: Option<i64>,
}

/// Per-bucket request counts for the sync dashboard.
///
/// Every bucket is always present; empty buckets count zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncCounts {
    pub manual: i64,
    pub pending: i64,
    pub synced: i64,
    pub failed: i64,
}

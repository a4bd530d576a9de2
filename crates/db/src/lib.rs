//! Database access layer for the OPAC backend.
//!
//! Currently covers the interlibrary loan request tracker: the
//! `library.ill_requests` table, its self-healing schema bootstrap, and the
//! repository operations the ILL route handlers are built on.

use sqlx::postgres::PgPoolOptions;

pub mod error;
pub mod models;
pub mod repositories;
pub mod schema;

pub use error::DbError;
pub use repositories::IllRequestRepo;
pub use schema::SchemaGuard;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Cheap liveness probe against the pool.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

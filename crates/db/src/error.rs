/// Errors surfaced by the repository layer.
///
/// This layer does no recovery or retry of its own; database errors pass
/// through unchanged for upstream handlers to map into responses.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The INSERT returned no row. Should be unreachable under normal
    /// database operation.
    #[error("failed to create interlibrary loan request")]
    CreationFailed,
}

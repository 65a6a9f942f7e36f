//! Storage-specific error type wrapping sqlx errors.

use homebox_domain::error::HomeboxError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to (de)serialize a stored JSON value.
    #[error("JSON serialization error")]
    Json(#[from] serde_json::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for HomeboxError {
    fn from(err: StorageError) -> Self {
        tracing::error!(error = ?err, "storage failure");
        Self::internal(err)
    }
}

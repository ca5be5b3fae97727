//! Error types for the PostgreSQL storage backend.

use medrec_storage::StorageError;
use sqlx_core::error::Error as SqlxError;

/// PostgreSQL error code for not-null violations (23502).
pub const PG_NOT_NULL_VIOLATION: &str = "23502";

/// PostgreSQL error code for foreign key violations (23503).
pub const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

/// PostgreSQL error code for unique violations (23505).
pub const PG_UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL error code for check constraint violations (23514).
pub const PG_CHECK_VIOLATION: &str = "23514";

/// PostgreSQL error code for undefined table (42P01).
pub const PG_UNDEFINED_TABLE: &str = "42P01";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

/// Maps a sqlx error raised while working on `resource_type`.
///
/// Constraint violations become `Integrity` or `Conflict`; pool and I/O
/// failures become `Connection`; anything else is `Internal`.
pub fn classify(resource_type: &str, err: SqlxError) -> StorageError {
    match &err {
        SqlxError::Database(db_err) => {
            let detail = match db_err.constraint() {
                Some(constraint) => format!("{} ({constraint})", db_err.message()),
                None => db_err.message().to_string(),
            };
            match db_err.code().as_deref() {
                Some(PG_UNIQUE_VIOLATION) => StorageError::conflict(resource_type, detail),
                Some(PG_FOREIGN_KEY_VIOLATION | PG_NOT_NULL_VIOLATION | PG_CHECK_VIOLATION) => {
                    StorageError::integrity(resource_type, detail)
                }
                _ => StorageError::internal(format!("database error: {detail}")),
            }
        }
        SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_) | SqlxError::Tls(_) => {
            StorageError::connection(err.to_string())
        }
        _ => StorageError::internal(err.to_string()),
    }
}

/// Errors raised while setting up the backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx_core::error::Error),

    /// Schema provisioning failed.
    #[error("Provisioning error for schema {schema}: {message}")]
    Provision { schema: String, message: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn provision(schema: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provision {
            schema: schema.into(),
            message: message.into(),
        }
    }
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(e) => classify("database", e),
            PostgresError::Provision { schema, message } => {
                StorageError::internal(format!("provisioning {schema} failed: {message}"))
            }
            PostgresError::Config { message } => {
                StorageError::internal(format!("Configuration error: {message}"))
            }
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PostgresError::config("invalid URL");
        assert!(err.to_string().contains("Configuration error"));

        let err = PostgresError::provision("tenant_acme", "permission denied");
        assert!(err.to_string().contains("tenant_acme"));
    }

    #[test]
    fn test_pool_errors_are_connection_errors() {
        let err = classify("Patient", SqlxError::PoolTimedOut);
        assert!(matches!(err, StorageError::Connection { .. }));
    }

    #[test]
    fn test_decode_errors_are_internal() {
        let err = classify("Patient", SqlxError::ColumnNotFound("gender".into()));
        assert!(matches!(err, StorageError::Internal { .. }));
        assert!(!has_pg_error_code(&SqlxError::PoolClosed, PG_UNIQUE_VIOLATION));
    }

    #[test]
    fn test_conversion_to_storage_error() {
        let storage_err: StorageError = PostgresError::config("test error").into();
        assert!(matches!(storage_err, StorageError::Internal { .. }));
    }
}

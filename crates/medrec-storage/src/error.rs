//! Storage error types for the MedRec storage abstraction layer.

use std::fmt;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No row matches the key within the tenant.
    #[error("{resource_type}/{id} not found")]
    NotFound {
        /// The resource type that was looked up.
        resource_type: String,
        /// The key that did not resolve.
        id: String,
    },

    /// A uniqueness constraint rejected the write.
    #[error("{resource_type} conflict: {message}")]
    Conflict {
        resource_type: String,
        message: String,
    },

    /// A foreign key, not-null or check constraint rejected the write.
    #[error("{resource_type} violates referential integrity: {message}")]
    Integrity {
        resource_type: String,
        message: String,
    },

    /// The caller supplied data the store cannot accept.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// The tenant has no provisioned schema.
    #[error("Unknown tenant: {tenant}")]
    UnknownTenant { tenant: String },

    /// Failed to reach the database.
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// An internal storage error occurred.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl StorageError {
    #[must_use]
    pub fn not_found(resource_type: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            id: id.to_string(),
        }
    }

    #[must_use]
    pub fn conflict(resource_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            resource_type: resource_type.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn integrity(resource_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Integrity {
            resource_type: resource_type.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unknown_tenant(tenant: impl Into<String>) -> Self {
        Self::UnknownTenant {
            tenant: tenant.into(),
        }
    }

    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity { .. })
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns the error category for logging and status mapping.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } | Self::UnknownTenant { .. } => ErrorCategory::NotFound,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::Integrity { .. } | Self::InvalidInput { .. } => ErrorCategory::Validation,
            Self::Connection { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    NotFound,
    Conflict,
    Validation,
    Infrastructure,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

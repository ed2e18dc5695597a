//! Error types
//!
//! Three layers: [`StoreError`] is what a store adapter reports, [`CompositionError`]
//! rejects malformed pagination/order/search input, and [`CrudError`] is the single
//! normalized shape the CRUD engine hands back to its callers.

use std::fmt;
use thiserror::Error;

/// Failure reported by a store adapter
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Transaction is already closed")]
    TransactionClosed,

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            other => StoreError::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<crate::validation::ValidationError> for StoreError {
    fn from(err: crate::validation::ValidationError) -> Self {
        StoreError::Validation(err.to_string())
    }
}

/// Malformed wire-level pagination input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositionError {
    #[error("Order directive '{0}' must have the form 'path:direction'")]
    MalformedOrderDirective(String),

    #[error("Order directive '{0}' has an empty path segment")]
    EmptyOrderPath(String),

    #[error("Searchable path '{0}' has an empty segment")]
    EmptySearchablePath(String),
}

/// The operation a [`CrudError`] originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrudOperation {
    Create,
    FindAll,
    FindOne,
    FindOneBy,
    Update,
    Delete,
    SoftDelete,
    Restore,
    Count,
    GroupBy,
}

impl CrudOperation {
    /// Fixed caller-facing message; never carries backend details
    pub fn failure_message(&self) -> &'static str {
        match self {
            CrudOperation::Create => "Error creating record",
            CrudOperation::FindAll => "Error fetching records",
            CrudOperation::FindOne | CrudOperation::FindOneBy => "Error fetching record",
            CrudOperation::Update => "Error updating record",
            CrudOperation::Delete => "Error deleting record",
            CrudOperation::SoftDelete => "Error soft deleting record",
            CrudOperation::Restore => "Error restoring record",
            CrudOperation::Count => "Error counting records",
            CrudOperation::GroupBy => "Error grouping records",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CrudOperation::Create => "create",
            CrudOperation::FindAll => "find_all",
            CrudOperation::FindOne => "find_one",
            CrudOperation::FindOneBy => "find_one_by",
            CrudOperation::Update => "update",
            CrudOperation::Delete => "delete",
            CrudOperation::SoftDelete => "soft_delete",
            CrudOperation::Restore => "restore",
            CrudOperation::Count => "count",
            CrudOperation::GroupBy => "group_by",
        }
    }
}

impl fmt::Display for CrudOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by every CRUD engine operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrudError {
    #[error("{message}")]
    BackendOperation {
        operation: CrudOperation,
        message: &'static str,
    },

    #[error(transparent)]
    Composition(#[from] CompositionError),

    #[error("Operation '{operation}' requires an active transaction")]
    TransactionRequired { operation: CrudOperation },

    #[error("{}", .operation.failure_message())]
    Decode { operation: CrudOperation },
}

impl CrudError {
    pub fn backend(operation: CrudOperation) -> Self {
        CrudError::BackendOperation {
            operation,
            message: operation.failure_message(),
        }
    }

    pub fn operation(&self) -> Option<CrudOperation> {
        match self {
            CrudError::BackendOperation { operation, .. }
            | CrudError::TransactionRequired { operation }
            | CrudError::Decode { operation } => Some(*operation),
            CrudError::Composition(_) => None,
        }
    }

    /// Whether the caller can fix the request and retry
    pub fn is_client_error(&self) -> bool {
        matches!(self, CrudError::Composition(_))
    }
}

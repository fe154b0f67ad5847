use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::store::StoreError;

/// Closed set of failures every service operation can return
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{message}")]
    Validation {
        message: String,
        field_errors: BTreeMap<String, String>,
    },

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Conflict(#[from] StateConflict),

    #[error(transparent)]
    Dependency(#[from] DependencyError),
}

/// The requested transition is not allowed from the current state
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateConflict {
    #[error("Invitation has already been used")]
    AlreadyUsed,

    #[error("Invitation expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },

    #[error("Insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: i64, requested: i64 },

    #[error("A user with email '{email}' already exists")]
    DuplicateUser { email: String },
}

#[derive(Debug, Error)]
pub enum DependencyError {
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("{operation} failed: {source}")]
    Store {
        operation: &'static str,
        source: StoreError,
    },
}

impl DependencyError {
    /// Timeouts may succeed on a later attempt; store failures are fatal to the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DependencyError::Timeout { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Unauthenticated,
    Authz,
    NotFound,
    StateConflict,
    Dependency,
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Validation { .. } => ErrorKind::Validation,
            ServiceError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            ServiceError::Forbidden(_) => ErrorKind::Authz,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::Conflict(_) => ErrorKind::StateConflict,
            ServiceError::Dependency(_) => ErrorKind::Dependency,
        }
    }

    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut field_errors = BTreeMap::new();
        field_errors.insert(field.to_string(), message.clone());

        ServiceError::Validation {
            message,
            field_errors,
        }
    }
}

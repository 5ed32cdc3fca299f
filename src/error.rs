//! Error types for fitcheck services

use thiserror::Error;
use uuid::Uuid;

use crate::api::StoreError;
use crate::models::ValidationError;

/// Failure of a service-level operation
#[derive(Debug, Error)]
pub enum Error {
    /// The data source failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Input was rejected before any request was made
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The default collection cannot be renamed or deleted
    #[error("collection {0} is the default collection")]
    DefaultCollection(Uuid),

    /// Nothing matched the request
    #[error("{kind} not found: {key}")]
    NotFound {
        /// What was looked up
        kind: &'static str,
        /// Lookup key, rendered
        key: String,
    },
}

impl Error {
    pub(crate) fn not_found(kind: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            kind,
            key: key.to_string(),
        }
    }
}

/// Result alias for service operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

use thiserror::Error;

/// Errors returned by a [`crate::store::Store`].
///
/// A store is only ever allowed to report `NotFound` or `ConflictExists` as
/// domain-meaningful outcomes; every other underlying failure (a dropped
/// connection, a malformed row, a timed-out query) collapses to `Transient`.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No banner matches the requested selector, or it exists but is inactive or
    /// logically deleted for the purposes of the operation that asked.
    #[error("banner not found")]
    NotFound,

    /// A uniqueness-constraint violation on (feature_id, tag_id).
    #[error("a banner already exists for this feature/tag pair")]
    ConflictExists,

    /// The underlying store failed in a way with no domain meaning.
    #[error("store operation failed: {0}")]
    Transient(String),
}

impl PartialEq for StoreError {
    fn eq(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Self::NotFound, Self::NotFound) | (Self::ConflictExists, Self::ConflictExists)
        ) || matches!((self, other), (Self::Transient(_), Self::Transient(_)))
    }
}

/// The domain error taxonomy surfaced by `banner-service` and mapped to HTTP
/// status codes by `banner-server`.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// No banner matches the specified selector, or it is inactive/deleted.
    #[error("banner not found")]
    NotFound,

    /// A uniqueness-constraint violation on (feature_id, tag_id).
    #[error("a banner already exists for this feature/tag pair")]
    ConflictExists,

    /// Input was malformed: bad JSON, wrong type, a missing required field.
    #[error("invalid request: {0}")]
    Validation(String),

    /// An underlying store or cache failure with no domain meaning.
    #[error("internal error")]
    Transient(String),
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => Self::NotFound,
            StoreError::ConflictExists => Self::ConflictExists,
            StoreError::Transient(message) => Self::Transient(message),
        }
    }
}

impl PartialEq for ServiceError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotFound, Self::NotFound) => true,
            (Self::ConflictExists, Self::ConflictExists) => true,
            (Self::Validation(l), Self::Validation(r)) => l == r,
            (Self::Transient(_), Self::Transient(_)) => true,
            _ => false,
        }
    }
}

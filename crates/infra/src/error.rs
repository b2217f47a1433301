//! Error types for the storage gateways and the services built on them.
//!
//! Gateways report [`StoreError`]. The ledger and the catalog service translate
//! those (and [`DomainError`]s from the pure layer) into their own caller-facing
//! enums, [`LedgerError`] and [`CatalogError`].

use thiserror::Error;

use shelfkeep_core::{DomainError, Resource};

/// Failures reported by a storage gateway.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The stored version moved since it was read.
    #[error("concurrent modification: {0}")]
    Conflict(String),

    /// A uniqueness constraint rejected the write (duplicate ISBN, location name, ...).
    #[error("duplicate value: {0}")]
    Duplicate(String),

    /// The write referenced a book or location that does not exist.
    #[error("referenced {0} does not exist")]
    MissingReference(Resource),

    /// A check constraint rejected the write.
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// A stored row could not be mapped back into the domain.
    #[error("corrupt stored data: {0}")]
    Corrupt(String),

    /// The backend could not be reached or failed internally.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub(crate) fn poisoned() -> Self {
        StoreError::Backend("in-memory store lock poisoned".to_string())
    }
}

/// Failures of inventory ledger operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{0} not found")]
    NotFound(Resource),

    #[error("insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: i64, requested: i64 },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage failure: {0}")]
    Store(StoreError),
}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::MissingReference(resource) => LedgerError::NotFound(resource),
            other => LedgerError::Store(other),
        }
    }
}

impl From<DomainError> for LedgerError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                LedgerError::Validation(msg)
            }
            DomainError::NotFound(resource) => LedgerError::NotFound(resource),
            DomainError::InsufficientStock {
                available,
                requested,
            } => LedgerError::InsufficientStock {
                available,
                requested,
            },
            DomainError::Conflict(msg) => LedgerError::Store(StoreError::Conflict(msg)),
        }
    }
}

/// Failures of catalog (book / location) management operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("{0} not found")]
    NotFound(Resource),

    /// Duplicate ISBN or location name.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage failure: {0}")]
    Store(StoreError),
}

impl From<StoreError> for CatalogError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Duplicate(msg) => CatalogError::Conflict(msg),
            StoreError::MissingReference(resource) => CatalogError::NotFound(resource),
            other => CatalogError::Store(other),
        }
    }
}

impl From<DomainError> for CatalogError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                CatalogError::Validation(msg)
            }
            DomainError::NotFound(resource) => CatalogError::NotFound(resource),
            DomainError::Conflict(msg) => CatalogError::Conflict(msg),
            DomainError::InsufficientStock { .. } => CatalogError::Validation(value.to_string()),
        }
    }
}

//! Storage and service-boundary errors.

use thiserror::Error;

use storefront_core::{DomainError, ErrorKind, ProductId};

/// Failure reported by a storage backend (in-memory or Postgres).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// A conditional decrement found the product but not enough stock.
    #[error(
        "stock condition failed for product {product_id}: available {available}, requested {requested}"
    )]
    StockConditionFailed {
        product_id: ProductId,
        available: i64,
        requested: i64,
    },

    /// A stock change of zero, which the store refuses.
    #[error("invalid stock change: {0}")]
    InvalidStockChange(String),

    /// Another transaction holds an uncommitted write on the same record, or
    /// the database aborted the transaction to keep it serializable.
    #[error("write conflict: {0}")]
    WriteConflict(String),

    #[error("no active transaction")]
    NoActiveTransaction,

    /// A uniqueness or check constraint rejected the write.
    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("timed out: {0}")]
    Timeout(String),

    /// A stored row could not be turned back into a domain value.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::WriteConflict(_))
    }
}

/// The single error type returned by application services.
///
/// Each variant corresponds to one [`ErrorKind`]; transport adapters only need
/// [`ServiceError::kind`] to pick a status code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("invalid domain state: {0}")]
    InvalidDomainState(String),

    #[error(
        "insufficient stock for product {product_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
        requested: i64,
    },

    /// A concurrent writer won; the same request may be retried.
    #[error("concurrent update detected, please try again ({0})")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::InvalidDomainState(_) => ErrorKind::InvalidDomainState,
            ServiceError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            ServiceError::Conflict(_) => ErrorKind::Conflict,
            ServiceError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                ServiceError::Validation(msg)
            }
            DomainError::InsufficientStock {
                product_id,
                available,
                requested,
            } => ServiceError::InsufficientStock {
                product_id,
                available,
                requested,
            },
            err @ (DomainError::ConsumerNotFound(_) | DomainError::ProductNotFound(_)) => {
                ServiceError::NotFound(err.to_string())
            }
            err @ (DomainError::InvalidAmount(_)
            | DomainError::InvalidQuantity(_)
            | DomainError::InvalidPrice(_)
            | DomainError::InvalidStock(_)
            | DomainError::InvariantViolation(_)) => {
                ServiceError::InvalidDomainState(err.to_string())
            }
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::ProductNotFound(id) => ServiceError::from(DomainError::ProductNotFound(id)),
            StoreError::StockConditionFailed {
                product_id,
                available,
                requested,
            } => ServiceError::InsufficientStock {
                product_id,
                available,
                requested,
            },
            StoreError::InvalidStockChange(msg) => ServiceError::Validation(msg),
            StoreError::WriteConflict(msg) => ServiceError::Conflict(msg),
            StoreError::Constraint(msg) => ServiceError::InvalidDomainState(msg),
            err @ (StoreError::NoActiveTransaction
            | StoreError::Timeout(_)
            | StoreError::Corrupt(_)
            | StoreError::Backend(_)) => ServiceError::Internal(err.to_string()),
        }
    }
}

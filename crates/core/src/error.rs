//! Domain error model.

use thiserror::Error;

use crate::id::{CustomerId, ProductId};

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, missing references, stock). Infrastructure concerns belong
/// elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input (rejected before any state change).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A monetary amount would be negative or is otherwise unusable.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A line-item quantity is not strictly positive.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// A product price is outside the accepted range.
    #[error("invalid price: {0}")]
    InvalidPrice(String),

    /// A stock level or stock movement is outside the accepted range.
    #[error("invalid stock: {0}")]
    InvalidStock(String),

    /// Any other aggregate invariant (e.g. an order without items).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A sale asked for more units than are available.
    #[error(
        "insufficient stock for product {product_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
        requested: i64,
    },

    #[error("consumer {0} not found")]
    ConsumerNotFound(CustomerId),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    pub fn invalid_quantity(msg: impl Into<String>) -> Self {
        Self::InvalidQuantity(msg.into())
    }

    pub fn invalid_price(msg: impl Into<String>) -> Self {
        Self::InvalidPrice(msg.into())
    }

    pub fn invalid_stock(msg: impl Into<String>) -> Self {
        Self::InvalidStock(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Coarse classification used at transport boundaries.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation(_) | DomainError::InvalidId(_) => ErrorKind::Validation,
            DomainError::InvalidAmount(_)
            | DomainError::InvalidQuantity(_)
            | DomainError::InvalidPrice(_)
            | DomainError::InvalidStock(_)
            | DomainError::InvariantViolation(_) => ErrorKind::InvalidDomainState,
            DomainError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            DomainError::ConsumerNotFound(_) | DomainError::ProductNotFound(_) => {
                ErrorKind::NotFound
            }
        }
    }
}

/// Stable error classification shared by every layer.
///
/// `InsufficientStock` and `Conflict` are deliberately distinct: the former means
/// the stock was never there, the latter that a concurrent writer won and the
/// caller may retry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InvalidDomainState,
    InsufficientStock,
    Conflict,
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidDomainState => "invalid_domain_state",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal_error",
        }
    }

    /// HTTP status a transport adapter should use for this kind.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidDomainState => 422,
            ErrorKind::InsufficientStock | ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
        }
    }

    /// Whether a caller may retry the same request unchanged.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Conflict)
    }
}

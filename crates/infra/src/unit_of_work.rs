//! Unit of work: one transaction spanning several repository calls.
//!
//! The transaction is explicit. [`with_transaction`] opens a session, hands a
//! [`TransactionContext`] to the work, and commits or rolls back depending on
//! the work's result. Repositories receive the context by `&mut` and pull the
//! session out of it.

use std::future::Future;

use async_trait::async_trait;
use tracing::warn;

use crate::error::StoreError;

/// Carrier for the active session (if any) passed to repositories.
#[derive(Debug)]
pub struct TransactionContext<S> {
    session: Option<S>,
}

impl<S> TransactionContext<S> {
    pub fn active(session: S) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// Context outside any transaction: reads go straight to committed state.
    pub fn none() -> Self {
        Self { session: None }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// The active session; fails outside a transaction.
    pub fn session(&mut self) -> Result<&mut S, StoreError> {
        self.session.as_mut().ok_or(StoreError::NoActiveTransaction)
    }

    pub fn session_if_available(&mut self) -> Option<&mut S> {
        self.session.as_mut()
    }

    fn into_session(self) -> Option<S> {
        self.session
    }
}

/// Transaction lifecycle of a storage backend.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Session: Send;

    async fn begin(&self) -> Result<Self::Session, StoreError>;

    /// Store-reported transient conflicts surface as `StoreError::WriteConflict`.
    async fn commit(&self, session: Self::Session) -> Result<(), StoreError>;

    async fn rollback(&self, session: Self::Session) -> Result<(), StoreError>;
}

/// Run `work` inside one transaction.
///
/// `work` gets the context by value and returns it alongside its result, so
/// the future may borrow from the caller freely. `Ok` commits, `Err` rolls
/// back; a failed rollback is logged and the original error is returned.
pub async fn with_transaction<U, T, E, F, Fut>(uow: &U, work: F) -> Result<T, E>
where
    U: UnitOfWork + ?Sized,
    E: From<StoreError>,
    F: FnOnce(TransactionContext<U::Session>) -> Fut,
    Fut: Future<Output = (TransactionContext<U::Session>, Result<T, E>)>,
{
    let session = uow.begin().await?;
    let (ctx, result) = work(TransactionContext::active(session)).await;

    match (result, ctx.into_session()) {
        (Ok(value), Some(session)) => {
            uow.commit(session).await?;
            Ok(value)
        }
        (Ok(_), None) => Err(StoreError::NoActiveTransaction.into()),
        (Err(err), Some(session)) => {
            if let Err(rollback_err) = uow.rollback(session).await {
                warn!(error = %rollback_err, "transaction rollback failed");
            }
            Err(err)
        }
        (Err(err), None) => Err(err),
    }
}

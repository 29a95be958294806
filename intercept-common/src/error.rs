//! Error types shared across crates

use thiserror::Error;

use crate::transaction::TransactionId;

/// Raised when a transaction cannot be placed on hold
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PendingError {
    #[error("Transaction {id} is already pending on an interceptor")]
    AlreadyPending { id: TransactionId },

    #[error("Transaction {id} has already completed")]
    Completed { id: TransactionId },
}

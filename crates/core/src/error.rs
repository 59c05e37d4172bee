//! Resource-manager fault types.
//!
//! Every fallible resource-manager operation reports a [`TxnError`].
//! The coordinator layer decides which of these are programmer errors
//! (a commit rejected by rollback) and which are environment faults to
//! hand to a fault translator; this crate only names them.

use crate::types::{ContextId, TxnId, TxnStatus};
use thiserror::Error;

/// Faults raised by a resource manager.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TxnError {
    /// No transaction is attached to the calling context.
    #[error("no transaction is attached to {0}")]
    NotAttached(ContextId),

    /// The calling context already has an attached transaction.
    #[error("a transaction is already attached to {0}")]
    AlreadyAttached(ContextId),

    /// The transaction identity is not known to the manager.
    #[error("unknown transaction {0}")]
    Unknown(TxnId),

    /// The operation requires a transaction that has not completed.
    #[error("{txn} is {status}; operation requires an incomplete transaction")]
    NotActive {
        /// The transaction the operation targeted.
        txn: TxnId,
        /// Its status at the time of the call.
        status: TxnStatus,
    },

    /// Commit was rejected because the transaction rolled back instead.
    #[error("{0} was rolled back instead of committed")]
    RolledBack(TxnId),

    /// Completion produced a heuristic mixed outcome: some work
    /// committed and some rolled back. The data may be inconsistent
    /// and the caller must be told.
    #[error("{0} completed with a heuristic mixed outcome")]
    HeuristicMixed(TxnId),

    /// Completion produced a heuristic rollback despite a commit
    /// request.
    #[error("{0} was heuristically rolled back")]
    HeuristicRollback(TxnId),

    /// Any other manager-specific failure.
    #[error("resource manager fault: {0}")]
    Manager(String),
}

impl TxnError {
    /// True for heuristic (partial-completion) outcomes.
    ///
    /// These are never swallowed: a heuristic outcome means the data
    /// may already be inconsistent.
    pub fn is_heuristic(&self) -> bool {
        matches!(
            self,
            TxnError::HeuristicMixed(_) | TxnError::HeuristicRollback(_)
        )
    }
}

/// Result type for resource-manager operations.
pub type Result<T> = std::result::Result<T, TxnError>;

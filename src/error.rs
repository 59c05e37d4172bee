//! Unified error type for cobatch.
//!
//! Internal layers speak [`TxnError`] (resource-manager faults) and
//! [`BatchError`] (the two-case batch taxonomy). This module folds
//! both into one public type, which is exactly what a fault translator
//! is: [`ErrorTranslator`] plugs into the coordinator and produces
//! [`Error`], and callers with their own error surface can supply
//! their own translator instead.

use cobatch_coordinator::{BatchError, FaultTranslator};
use cobatch_core::TxnError;
use thiserror::Error;

/// All cobatch errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Programming or misuse error (a commit rejected by rollback, a
    /// suspend/resume identity mismatch). Retrying cannot help.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// The transaction completed heuristically; data may be partially
    /// committed and the caller must know.
    #[error("heuristic completion: {0}")]
    Heuristic(TxnError),

    /// Any other resource-manager fault.
    #[error("transaction fault: {0}")]
    Txn(TxnError),
}

/// Result type for cobatch operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this is a programmer-error fault.
    ///
    /// These should surface, not be caught and retried.
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Error::IllegalState(_))
    }

    /// Check if this is a heuristic (partial-commit) outcome.
    pub fn is_heuristic(&self) -> bool {
        matches!(self, Error::Heuristic(_))
    }
}

/// The built-in fault translator: maps resource-manager faults into
/// [`Error`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorTranslator;

impl FaultTranslator for ErrorTranslator {
    type Fault = Error;

    fn translate(&self, cause: TxnError) -> Error {
        cause.into()
    }
}

// Convert from resource-manager faults, routing heuristic outcomes to
// their own variant.
impl From<TxnError> for Error {
    fn from(cause: TxnError) -> Self {
        if cause.is_heuristic() {
            Error::Heuristic(cause)
        } else {
            Error::Txn(cause)
        }
    }
}

// Convert from already-translated batch errors (coordinator surface).
impl From<BatchError<Error>> for Error {
    fn from(error: BatchError<Error>) -> Self {
        match error {
            BatchError::IllegalState(message) => Error::IllegalState(message),
            BatchError::Fault(fault) => fault,
        }
    }
}

// Convert from untranslated batch errors (direct `Batch` operations).
impl From<BatchError<TxnError>> for Error {
    fn from(error: BatchError<TxnError>) -> Self {
        match error {
            BatchError::IllegalState(message) => Error::IllegalState(message),
            BatchError::Fault(cause) => cause.into(),
        }
    }
}

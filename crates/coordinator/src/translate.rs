//! Fault taxonomy and translation.
//!
//! Two kinds of failure leave this crate, and they must never be
//! conflated:
//!
//! - [`BatchError::IllegalState`]: a programming or misuse error (a
//!   commit rejected by rollback, a suspend/resume identity mismatch).
//!   Retrying cannot help and callers should not catch these to
//!   continue.
//! - [`BatchError::Fault`]: a resource-manager fault, passed through a
//!   [`FaultTranslator`] so each calling layer receives its own fault
//!   type. Heuristic (partial-commit) outcomes travel this path and
//!   are never swallowed.

use cobatch_core::TxnError;
use thiserror::Error;

/// Maps resource-manager faults into a caller-chosen fault type.
///
/// Different call sites can wrap the same coordinator with different
/// public fault types by supplying different translators. Any
/// `Fn(TxnError) -> E` closure is a translator.
pub trait FaultTranslator: Send + Sync {
    /// The caller's fault type.
    type Fault;

    /// Translate one resource-manager fault.
    fn translate(&self, cause: TxnError) -> Self::Fault;
}

/// Passes faults through untranslated.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTranslator;

impl FaultTranslator for IdentityTranslator {
    type Fault = TxnError;

    fn translate(&self, cause: TxnError) -> TxnError {
        cause
    }
}

impl<E, F> FaultTranslator for F
where
    F: Fn(TxnError) -> E + Send + Sync,
{
    type Fault = E;

    fn translate(&self, cause: TxnError) -> E {
        self(cause)
    }
}

/// Failure of a batch operation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError<F = TxnError> {
    /// Programming or misuse error. Never retried, never translated.
    #[error("illegal batch state: {0}")]
    IllegalState(String),

    /// Translated resource-manager fault.
    #[error("{0}")]
    Fault(F),
}

impl<F> BatchError<F> {
    /// True for the programmer-error case.
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, BatchError::IllegalState(_))
    }
}

impl BatchError<TxnError> {
    /// Re-express the fault case through `translator`, leaving the
    /// illegal-state case untouched.
    pub fn translate<T: FaultTranslator>(self, translator: &T) -> BatchError<T::Fault> {
        match self {
            BatchError::IllegalState(message) => BatchError::IllegalState(message),
            BatchError::Fault(cause) => BatchError::Fault(translator.translate(cause)),
        }
    }
}

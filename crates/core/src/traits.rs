//! The resource-manager capability.
//!
//! The coordinator does not own a transaction engine; it drives one
//! through this trait. Implementations decide what a transaction *is*
//! (an in-memory record, an XA branch, a remote session). The contract
//! the coordinator relies on:
//!
//! - At most one transaction is attached per [`ContextId`];
//!   [`suspend`](ResourceManager::suspend) is the only detach.
//! - [`commit`](ResourceManager::commit) and
//!   [`rollback`](ResourceManager::rollback) act on identity and do
//!   not touch attachments.
//! - Completion callbacks fire exactly once, after the transaction
//!   reaches a terminal status.

use crate::error::Result;
use crate::types::{ContextId, TxnId, TxnStatus};

/// Callback invoked once when a transaction reaches a terminal status.
pub type CompletionCallback = Box<dyn FnOnce(TxnStatus) + Send + Sync>;

/// Begin/suspend/resume/complete operations over opaque transaction
/// identities, with per-context attachment bookkeeping.
pub trait ResourceManager: Send + Sync {
    /// Begin a new transaction and attach it to `ctx`.
    ///
    /// Fails with [`TxnError::AlreadyAttached`] if the context already
    /// has one.
    ///
    /// [`TxnError::AlreadyAttached`]: crate::TxnError::AlreadyAttached
    fn begin(&self, ctx: ContextId) -> Result<TxnId>;

    /// Detach the transaction attached to `ctx`, returning its
    /// identity.
    ///
    /// Fails with [`TxnError::NotAttached`] if none is attached.
    ///
    /// [`TxnError::NotAttached`]: crate::TxnError::NotAttached
    fn suspend(&self, ctx: ContextId) -> Result<TxnId>;

    /// Attach the given transaction to `ctx`.
    fn resume(&self, ctx: ContextId, txn: TxnId) -> Result<()>;

    /// The transaction currently attached to `ctx`, if any.
    fn current(&self, ctx: ContextId) -> Result<Option<TxnId>>;

    /// Commit the transaction.
    fn commit(&self, txn: TxnId) -> Result<()>;

    /// Roll the transaction back.
    fn rollback(&self, txn: TxnId) -> Result<()>;

    /// The transaction's current status.
    fn status(&self, txn: TxnId) -> Result<TxnStatus>;

    /// Register a callback fired when the transaction completes.
    ///
    /// Fails if the transaction is already terminal.
    fn register_completion(&self, txn: TxnId, callback: CompletionCallback) -> Result<()>;
}

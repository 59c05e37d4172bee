//! In-memory transaction manager.
//!
//! Tracks every transaction in a concurrent registry and keeps an
//! attachment table mapping each execution context to at most one
//! transaction. Commit and rollback act on transaction identity only;
//! [`suspend`](TxnManager::suspend) is the single way an attachment is
//! removed, which is exactly the model the batch coordinator's
//! defensive suspend relies on.
//!
//! # Thread Safety
//!
//! Both tables are `DashMap`s, so independent contexts and independent
//! transactions never contend. Completion callbacks are drained under
//! the registry entry lock but invoked only after it is released, so a
//! callback may call back into the manager freely.

use cobatch_core::{CompletionCallback, ContextId, ResourceManager, Result, TxnError, TxnId, TxnStatus};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// One registered transaction.
struct TxnRecord {
    status: TxnStatus,
    callbacks: Vec<CompletionCallback>,
}

/// In-memory transaction manager.
///
/// # Example
///
/// ```ignore
/// use cobatch_core::{ContextId, ResourceManager};
/// use cobatch_txn::TxnManager;
///
/// let tm = TxnManager::new();
/// let ctx = ContextId::next();
/// let txn = tm.begin(ctx)?;
/// tm.commit(txn)?;
/// ```
pub struct TxnManager {
    /// Registry of every transaction this manager has begun.
    txns: DashMap<TxnId, TxnRecord>,

    /// Which transaction, if any, is attached to each context.
    attachments: DashMap<ContextId, TxnId>,

    /// Next transaction identity.
    next_txn_id: AtomicU64,
}

impl TxnManager {
    /// Create a new manager with no transactions.
    pub fn new() -> Self {
        TxnManager {
            txns: DashMap::new(),
            attachments: DashMap::new(),
            next_txn_id: AtomicU64::new(1),
        }
    }

    /// Mark a transaction so its only possible outcome is rollback.
    ///
    /// Idempotent on an already-marked transaction. Fails with
    /// [`TxnError::NotActive`] once the transaction is terminal.
    pub fn set_rollback_only(&self, txn: TxnId) -> Result<()> {
        let mut record = self.txns.get_mut(&txn).ok_or(TxnError::Unknown(txn))?;
        match record.status {
            TxnStatus::Active => {
                record.status = TxnStatus::MarkedRollback;
                tracing::debug!(%txn, "transaction marked rollback-only");
                Ok(())
            }
            TxnStatus::MarkedRollback => Ok(()),
            status => Err(TxnError::NotActive { txn, status }),
        }
    }

    /// Complete a transaction: update its status and drain callbacks
    /// while holding the entry, fire them after releasing it.
    fn complete(&self, txn: TxnId, outcome: TxnStatus) -> Result<Vec<CompletionCallback>> {
        debug_assert!(outcome.is_terminal());
        let mut record = self.txns.get_mut(&txn).ok_or(TxnError::Unknown(txn))?;
        if record.status.is_terminal() {
            return Err(TxnError::NotActive {
                txn,
                status: record.status,
            });
        }
        record.status = outcome;
        Ok(std::mem::take(&mut record.callbacks))
    }
}

fn fire(callbacks: Vec<CompletionCallback>, status: TxnStatus) {
    for callback in callbacks {
        callback(status);
    }
}

impl ResourceManager for TxnManager {
    fn begin(&self, ctx: ContextId) -> Result<TxnId> {
        match self.attachments.entry(ctx) {
            Entry::Occupied(_) => Err(TxnError::AlreadyAttached(ctx)),
            Entry::Vacant(slot) => {
                let txn = TxnId::from_raw(self.next_txn_id.fetch_add(1, Ordering::SeqCst));
                self.txns.insert(
                    txn,
                    TxnRecord {
                        status: TxnStatus::Active,
                        callbacks: Vec::new(),
                    },
                );
                slot.insert(txn);
                tracing::debug!(%txn, %ctx, "transaction begun");
                Ok(txn)
            }
        }
    }

    fn suspend(&self, ctx: ContextId) -> Result<TxnId> {
        let (_, txn) = self
            .attachments
            .remove(&ctx)
            .ok_or(TxnError::NotAttached(ctx))?;
        tracing::trace!(%txn, %ctx, "transaction suspended");
        Ok(txn)
    }

    fn resume(&self, ctx: ContextId, txn: TxnId) -> Result<()> {
        if !self.txns.contains_key(&txn) {
            return Err(TxnError::Unknown(txn));
        }
        match self.attachments.entry(ctx) {
            Entry::Occupied(_) => Err(TxnError::AlreadyAttached(ctx)),
            Entry::Vacant(slot) => {
                slot.insert(txn);
                tracing::trace!(%txn, %ctx, "transaction resumed");
                Ok(())
            }
        }
    }

    fn current(&self, ctx: ContextId) -> Result<Option<TxnId>> {
        Ok(self.attachments.get(&ctx).map(|entry| *entry))
    }

    fn commit(&self, txn: TxnId) -> Result<()> {
        // A rollback-only transaction refuses the commit: it is rolled
        // back instead and the caller is told so. The status check and
        // the transition share one entry lock.
        let (callbacks, outcome, final_status) = {
            let mut record = self.txns.get_mut(&txn).ok_or(TxnError::Unknown(txn))?;
            match record.status {
                TxnStatus::Active => {
                    record.status = TxnStatus::Committed;
                    (
                        std::mem::take(&mut record.callbacks),
                        Ok(()),
                        TxnStatus::Committed,
                    )
                }
                TxnStatus::MarkedRollback => {
                    record.status = TxnStatus::RolledBack;
                    (
                        std::mem::take(&mut record.callbacks),
                        Err(TxnError::RolledBack(txn)),
                        TxnStatus::RolledBack,
                    )
                }
                status => return Err(TxnError::NotActive { txn, status }),
            }
        };
        tracing::debug!(%txn, status = %final_status, "transaction completed on commit");
        fire(callbacks, final_status);
        outcome
    }

    fn rollback(&self, txn: TxnId) -> Result<()> {
        let callbacks = self.complete(txn, TxnStatus::RolledBack)?;
        tracing::debug!(%txn, "transaction rolled back");
        fire(callbacks, TxnStatus::RolledBack);
        Ok(())
    }

    fn status(&self, txn: TxnId) -> Result<TxnStatus> {
        self.txns
            .get(&txn)
            .map(|record| record.status)
            .ok_or(TxnError::Unknown(txn))
    }

    fn register_completion(&self, txn: TxnId, callback: CompletionCallback) -> Result<()> {
        let mut record = self.txns.get_mut(&txn).ok_or(TxnError::Unknown(txn))?;
        if record.status.is_terminal() {
            return Err(TxnError::NotActive {
                txn,
                status: record.status,
            });
        }
        record.callbacks.push(callback);
        Ok(())
    }
}

impl Default for TxnManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn begin_attaches_to_context() {
        let tm = TxnManager::new();
        let ctx = ContextId::next();

        let txn = tm.begin(ctx).unwrap();

        assert_eq!(tm.current(ctx).unwrap(), Some(txn));
        assert_eq!(tm.status(txn).unwrap(), TxnStatus::Active);
    }

    #[test]
    fn begin_fails_when_context_is_occupied() {
        let tm = TxnManager::new();
        let ctx = ContextId::next();

        tm.begin(ctx).unwrap();

        assert_eq!(tm.begin(ctx), Err(TxnError::AlreadyAttached(ctx)));
    }

    #[test]
    fn suspend_and_resume_move_the_attachment() {
        let tm = TxnManager::new();
        let a = ContextId::next();
        let b = ContextId::next();

        let txn = tm.begin(a).unwrap();
        let suspended = tm.suspend(a).unwrap();
        assert_eq!(suspended, txn);
        assert_eq!(tm.current(a).unwrap(), None);

        tm.resume(b, txn).unwrap();
        assert_eq!(tm.current(b).unwrap(), Some(txn));
    }

    #[test]
    fn suspend_without_attachment_fails() {
        let tm = TxnManager::new();
        let ctx = ContextId::next();

        assert_eq!(tm.suspend(ctx), Err(TxnError::NotAttached(ctx)));
    }

    #[test]
    fn resume_of_unknown_transaction_fails() {
        let tm = TxnManager::new();
        let ctx = ContextId::next();

        let bogus = TxnId::from_raw(9999);
        assert_eq!(tm.resume(ctx, bogus), Err(TxnError::Unknown(bogus)));
    }

    #[test]
    fn commit_leaves_attachment_in_place() {
        // Completion acts on identity; only suspend detaches.
        let tm = TxnManager::new();
        let ctx = ContextId::next();

        let txn = tm.begin(ctx).unwrap();
        tm.commit(txn).unwrap();

        assert_eq!(tm.current(ctx).unwrap(), Some(txn));
        assert_eq!(tm.status(txn).unwrap(), TxnStatus::Committed);
    }

    #[test]
    fn commit_fires_callbacks_with_final_status() {
        let tm = TxnManager::new();
        let ctx = ContextId::next();
        let txn = tm.begin(ctx).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        tm.register_completion(txn, Box::new(move |status| sink.lock().push(status)))
            .unwrap();

        tm.commit(txn).unwrap();

        assert_eq!(*seen.lock(), vec![TxnStatus::Committed]);
    }

    #[test]
    fn commit_of_rollback_only_transaction_rolls_back() {
        let tm = TxnManager::new();
        let ctx = ContextId::next();
        let txn = tm.begin(ctx).unwrap();

        tm.set_rollback_only(txn).unwrap();

        assert_eq!(tm.commit(txn), Err(TxnError::RolledBack(txn)));
        assert_eq!(tm.status(txn).unwrap(), TxnStatus::RolledBack);
    }

    #[test]
    fn double_completion_fails() {
        let tm = TxnManager::new();
        let ctx = ContextId::next();
        let txn = tm.begin(ctx).unwrap();

        tm.commit(txn).unwrap();

        assert_eq!(
            tm.rollback(txn),
            Err(TxnError::NotActive {
                txn,
                status: TxnStatus::Committed
            })
        );
    }

    #[test]
    fn registration_on_terminal_transaction_fails() {
        let tm = TxnManager::new();
        let ctx = ContextId::next();
        let txn = tm.begin(ctx).unwrap();
        tm.rollback(txn).unwrap();

        let result = tm.register_completion(txn, Box::new(|_| {}));
        assert_eq!(
            result,
            Err(TxnError::NotActive {
                txn,
                status: TxnStatus::RolledBack
            })
        );
    }

    #[test]
    fn callback_may_reenter_the_manager() {
        // Callbacks run outside the registry lock.
        let tm = Arc::new(TxnManager::new());
        let ctx = ContextId::next();
        let txn = tm.begin(ctx).unwrap();

        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let inner = tm.clone();
        tm.register_completion(
            txn,
            Box::new(move |_| {
                *sink.lock() = Some(inner.status(txn).unwrap());
            }),
        )
        .unwrap();

        tm.commit(txn).unwrap();
        assert_eq!(*seen.lock(), Some(TxnStatus::Committed));
    }
}

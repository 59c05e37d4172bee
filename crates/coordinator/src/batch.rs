//! The batch handle.
//!
//! A [`Batch`] represents one logical unit of transactional work,
//! possibly held by several nested call sites at once. Nested holders
//! join via [`interpose`](Batch::interpose), which bumps a reference
//! count; every holder calls [`close`](Batch::close), and only the
//! outermost close acts on the underlying transaction. That rule is
//! what lets deeply nested call chains each run "acquire, work, close"
//! without threading ownership flags through every signature.
//!
//! The counter starts at 0 for the creating holder. `close()` performs
//! an atomic decrement-and-read, and the close that observes a
//! **pre-decrement value of 0** is the outermost one: with one create
//! and one interpose the count is 1, the first close brings it to 0
//! without acting, and the second close (pre-decrement 0) commits or
//! rolls back.

use crate::context::ContextInner;
use crate::translate::BatchError;
use cobatch_core::{ResourceManager, TxnError, TxnId, TxnStatus};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Weak};

/// The fixed no-op batch handed out when no resource manager is
/// configured. Always active, closes and discards are no-ops.
static NON_TRANSACTIONAL: Lazy<Batch> = Lazy::new(|| Batch {
    kind: BatchKind::NonTransactional,
});

/// Observable lifecycle state of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// The batch can still accept work and intends to commit.
    Active,
    /// The batch will roll back when closed.
    Discarded,
    /// The underlying transaction has completed.
    Closed,
}

/// A handle over one logical unit of transactional work.
///
/// Handles are cheap to clone; clones share the same underlying
/// record, and equality/hashing follow the underlying transaction
/// identity.
#[derive(Clone)]
pub struct Batch {
    kind: BatchKind,
}

#[derive(Clone)]
enum BatchKind {
    /// Structural no-op for non-transactional deployments.
    NonTransactional,
    /// Backed by a real transaction.
    Transactional(Arc<TxnBatch>),
}

struct TxnBatch {
    txn: TxnId,
    rm: Arc<dyn ResourceManager>,

    /// Number of additional holders beyond the creator. `close()`
    /// decrements; the close that reads 0 pre-decrement is outermost.
    count: AtomicI64,

    /// True until `discard()`; decides commit vs rollback at close.
    active: AtomicBool,

    /// Register of the context currently holding this batch, so the
    /// completion callback can clear the association wherever the
    /// batch lives after a handoff.
    holder: Mutex<Option<Weak<ContextInner>>>,
}

impl Batch {
    /// The no-op batch singleton.
    pub fn non_transactional() -> Batch {
        NON_TRANSACTIONAL.clone()
    }

    pub(crate) fn transactional(txn: TxnId, rm: Arc<dyn ResourceManager>) -> Batch {
        Batch {
            kind: BatchKind::Transactional(Arc::new(TxnBatch {
                txn,
                rm,
                count: AtomicI64::new(0),
                active: AtomicBool::new(true),
                holder: Mutex::new(None),
            })),
        }
    }

    /// The underlying transaction identity, or `None` for the no-op
    /// batch.
    pub fn txn(&self) -> Option<TxnId> {
        match &self.kind {
            BatchKind::NonTransactional => None,
            BatchKind::Transactional(inner) => Some(inner.txn),
        }
    }

    /// Whether this batch is backed by a real transaction.
    pub fn is_transactional(&self) -> bool {
        matches!(self.kind, BatchKind::Transactional(_))
    }

    /// Join this batch as an additional holder.
    ///
    /// Increments the interposition count and returns the same batch.
    /// Safe to call repeatedly; every interposed holder owes one
    /// [`close`](Batch::close).
    pub fn interpose(&self) -> Batch {
        if let BatchKind::Transactional(inner) = &self.kind {
            let count = inner.count.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::trace!(txn = %inner.txn, count, "batch interposed");
        }
        self.clone()
    }

    /// Mark the batch so its eventual close rolls back instead of
    /// committing.
    ///
    /// Takes no immediate action on the underlying transaction.
    /// Idempotent.
    pub fn discard(&self) {
        if let BatchKind::Transactional(inner) = &self.kind {
            inner.active.store(false, Ordering::SeqCst);
            tracing::trace!(txn = %inner.txn, "batch discarded");
        }
    }

    /// The batch's current state, derived from the underlying
    /// transaction status and the discard flag.
    pub fn state(&self) -> Result<BatchState, BatchError> {
        let inner = match &self.kind {
            BatchKind::NonTransactional => return Ok(BatchState::Active),
            BatchKind::Transactional(inner) => inner,
        };
        let status = inner.rm.status(inner.txn).map_err(BatchError::Fault)?;
        let state = match status {
            TxnStatus::Active if inner.active.load(Ordering::SeqCst) => BatchState::Active,
            TxnStatus::Active | TxnStatus::MarkedRollback => BatchState::Discarded,
            _ => BatchState::Closed,
        };
        Ok(state)
    }

    /// Release one holder's interest in the batch.
    ///
    /// Decrements the interposition count. Only the outermost close
    /// (pre-decrement count of 0) acts on the underlying transaction:
    /// commit if the batch is still active, rollback if it was
    /// discarded or the transaction is marked rollback-only, nothing
    /// if the transaction already completed.
    ///
    /// A commit rejected by rollback is an
    /// [`IllegalState`](BatchError::IllegalState); heuristic outcomes
    /// and status-query failures are faults.
    pub fn close(&self) -> Result<(), BatchError> {
        let inner = match &self.kind {
            BatchKind::NonTransactional => return Ok(()),
            BatchKind::Transactional(inner) => inner,
        };
        let previous = inner.count.fetch_sub(1, Ordering::SeqCst);
        if previous != 0 {
            // Still held by an outer interposition level.
            tracing::trace!(txn = %inner.txn, count = previous - 1, "batch close deferred");
            return Ok(());
        }
        let status = inner.rm.status(inner.txn).map_err(BatchError::Fault)?;
        match status {
            TxnStatus::Active if inner.active.load(Ordering::SeqCst) => {
                match inner.rm.commit(inner.txn) {
                    Ok(()) => Ok(()),
                    Err(TxnError::RolledBack(txn)) => Err(BatchError::IllegalState(format!(
                        "commit of {txn} was rejected by rollback"
                    ))),
                    Err(fault) => Err(BatchError::Fault(fault)),
                }
            }
            TxnStatus::Active | TxnStatus::MarkedRollback => {
                inner.rm.rollback(inner.txn).map_err(BatchError::Fault)
            }
            _ => Ok(()),
        }
    }

    /// Register the completion callback that clears whichever context
    /// register holds this batch once the transaction completes.
    pub(crate) fn register_completion(&self) -> cobatch_core::Result<()> {
        let inner = match &self.kind {
            BatchKind::NonTransactional => return Ok(()),
            BatchKind::Transactional(inner) => inner,
        };
        let weak = Arc::downgrade(inner);
        inner.rm.register_completion(
            inner.txn,
            Box::new(move |status| {
                if let Some(batch) = weak.upgrade() {
                    batch.completed(status);
                }
            }),
        )
    }

    /// Record which context currently holds this batch. `None` when
    /// the batch is suspended or its holder released it.
    pub(crate) fn set_holder(&self, holder: Option<&Arc<ContextInner>>) {
        if let BatchKind::Transactional(inner) = &self.kind {
            *inner.holder.lock() = holder.map(Arc::downgrade);
        }
    }

    /// Identity and manager handle, or `None` for the no-op batch.
    pub(crate) fn transactional_parts(&self) -> Option<(TxnId, Arc<dyn ResourceManager>)> {
        match &self.kind {
            BatchKind::NonTransactional => None,
            BatchKind::Transactional(inner) => Some((inner.txn, inner.rm.clone())),
        }
    }
}

impl TxnBatch {
    /// Completion callback body: clear the association of whichever
    /// context holds this batch, if any still does.
    fn completed(&self, status: TxnStatus) {
        let holder = self.holder.lock().take();
        if let Some(context) = holder.and_then(|weak| weak.upgrade()) {
            if context.clear_if_holding(self.txn) {
                tracing::trace!(
                    txn = %self.txn,
                    ctx = %context.id(),
                    %status,
                    "batch association cleared on completion"
                );
            }
        }
    }
}

impl PartialEq for Batch {
    fn eq(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (BatchKind::NonTransactional, BatchKind::NonTransactional) => true,
            (BatchKind::Transactional(a), BatchKind::Transactional(b)) => a.txn == b.txn,
            _ => false,
        }
    }
}

impl Eq for Batch {}

impl Hash for Batch {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.txn().hash(state);
    }
}

impl fmt::Debug for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            BatchKind::NonTransactional => f.write_str("Batch(non-transactional)"),
            BatchKind::Transactional(inner) => write!(
                f,
                "Batch({}, count={}, active={})",
                inner.txn,
                inner.count.load(Ordering::SeqCst),
                inner.active.load(Ordering::SeqCst)
            ),
        }
    }
}

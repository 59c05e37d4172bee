//! Per-execution-context batch register.

use crate::batch::Batch;
use cobatch_core::ContextId;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// The register for one execution context.
///
/// A context is whatever unit of execution the caller scopes work to:
/// a thread, a pooled worker, a request. At most one batch is
/// associated with a context at any time, and only the coordinator's
/// operations (and the transaction-completion callback) mutate the
/// association.
///
/// Cloning is cheap and shares the same register, so a context handle
/// can travel with the work it describes.
#[derive(Clone)]
pub struct BatchContext {
    inner: Arc<ContextInner>,
}

pub(crate) struct ContextInner {
    id: ContextId,
    current: Mutex<Option<Batch>>,
}

impl BatchContext {
    /// Create a fresh context with no associated batch.
    pub fn new() -> Self {
        BatchContext {
            inner: Arc::new(ContextInner {
                id: ContextId::next(),
                current: Mutex::new(None),
            }),
        }
    }

    /// This context's identity, as seen by the resource manager.
    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    /// The batch currently associated with this context, if any.
    pub fn current_batch(&self) -> Option<Batch> {
        self.inner.current.lock().clone()
    }

    pub(crate) fn inner(&self) -> &Arc<ContextInner> {
        &self.inner
    }
}

impl ContextInner {
    pub(crate) fn id(&self) -> ContextId {
        self.id
    }

    /// Replace the association, returning the previous one.
    pub(crate) fn install(&self, batch: Option<Batch>) -> Option<Batch> {
        std::mem::replace(&mut *self.current.lock(), batch)
    }

    /// Detach and return the association.
    pub(crate) fn take(&self) -> Option<Batch> {
        self.current.lock().take()
    }

    /// Clear the association if it currently holds `batch`'s
    /// transaction. Used by the completion callback only.
    pub(crate) fn clear_if_holding(&self, batch_txn: cobatch_core::TxnId) -> bool {
        let mut slot = self.current.lock();
        if slot.as_ref().and_then(Batch::txn) == Some(batch_txn) {
            *slot = None;
            true
        } else {
            false
        }
    }
}

impl Default for BatchContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchContext")
            .field("id", &self.inner.id)
            .field("current", &self.current_batch())
            .finish()
    }
}

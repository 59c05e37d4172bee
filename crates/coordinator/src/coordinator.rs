//! Batch creation, lookup, and cross-context handoff.
//!
//! ## Lifecycle
//!
//! ```text
//! 1. create_batch() - reuse the context's ACTIVE batch (interpose),
//!    or begin a fresh transaction and associate a new batch
//! 2. work runs against whatever the batch scopes
//! 3. close() - the outermost close commits, or rolls back if the
//!    batch was discarded
//! 4. the completion callback clears the context association
//! ```
//!
//! ## Handoff
//!
//! ```text
//! ctx A: batch = suspend_batch()     - detach from A
//! ctx B: guard = resume_batch(batch) - attach to B
//! ctx B: batch.close()
//! ctx B: guard.end()                 - restore B's prior association
//! ```
//!
//! The coordinator's one job across all of this: the resource
//! manager's per-context transaction attachment and the context
//! register always agree about who holds the batch.

use crate::batch::{Batch, BatchState};
use crate::context::BatchContext;
use crate::guard::{GuardKind, ResumeGuard};
use crate::translate::{BatchError, FaultTranslator, IdentityTranslator};
use cobatch_core::ResourceManager;
use std::sync::Arc;

/// Creates, looks up, and completes batches for any number of
/// execution contexts.
///
/// Construct one per resource manager and share it freely; all methods
/// take `&self` and the coordinator holds no lock of its own.
///
/// The translator parameter decides what fault type leaves the
/// coordinator. The default [`IdentityTranslator`] hands out raw
/// [`TxnError`](cobatch_core::TxnError)s; layers with their own error
/// surface plug in their own translator (any
/// `Fn(TxnError) -> E` closure works).
pub struct BatchCoordinator<T: FaultTranslator = IdentityTranslator> {
    rm: Option<Arc<dyn ResourceManager>>,
    pub(crate) translator: T,
}

impl BatchCoordinator<IdentityTranslator> {
    /// A coordinator over the given resource manager, reporting
    /// untranslated faults.
    pub fn new(rm: Arc<dyn ResourceManager>) -> Self {
        Self::with_translator(Some(rm), IdentityTranslator)
    }

    /// A coordinator with no resource manager: every batch is the
    /// always-active no-op singleton. Valid, first-class mode for
    /// non-transactional deployments, not an error path.
    pub fn non_transactional() -> Self {
        Self::with_translator(None, IdentityTranslator)
    }
}

impl<T: FaultTranslator> BatchCoordinator<T> {
    /// A coordinator with an explicit translator.
    pub fn with_translator(rm: Option<Arc<dyn ResourceManager>>, translator: T) -> Self {
        BatchCoordinator { rm, translator }
    }

    /// Whether a resource manager is configured.
    pub fn is_transactional(&self) -> bool {
        self.rm.is_some()
    }

    /// Get a batch for the calling context.
    ///
    /// If the context already has an active batch, that batch is
    /// interposed and returned; the caller still owes one
    /// [`close`](Batch::close), and only the outermost close completes
    /// the transaction. Otherwise a new transaction is begun,
    /// registered for completion, wrapped, and associated with the
    /// context.
    ///
    /// The association is only written after the underlying begin and
    /// registration succeed; a fault leaves no partial state behind.
    pub fn create_batch(&self, cx: &BatchContext) -> Result<Batch, BatchError<T::Fault>> {
        let Some(rm) = &self.rm else {
            return Ok(Batch::non_transactional());
        };
        self.create_inner(rm, cx)
            .map_err(|error| error.translate(&self.translator))
    }

    fn create_inner(
        &self,
        rm: &Arc<dyn ResourceManager>,
        cx: &BatchContext,
    ) -> Result<Batch, BatchError> {
        if let Some(existing) = cx.current_batch() {
            if existing.state()? == BatchState::Active {
                return Ok(existing.interpose());
            }
        }

        // A completed predecessor or a foreign transaction may still
        // be attached to this context; detach it so begin starts from
        // a clean slate.
        if rm.current(cx.id()).map_err(BatchError::Fault)?.is_some() {
            let foreign = rm.suspend(cx.id()).map_err(BatchError::Fault)?;
            tracing::trace!(txn = %foreign, ctx = %cx.id(), "foreign transaction suspended");
        }

        let txn = rm.begin(cx.id()).map_err(BatchError::Fault)?;
        let batch = Batch::transactional(txn, rm.clone());
        if let Err(cause) = batch.register_completion() {
            // The transaction exists but nobody can own it; reclaim it
            // before raising the registration fault.
            if let Err(secondary) = rm.rollback(txn) {
                tracing::error!(
                    %txn,
                    error = %secondary,
                    "rollback after failed completion registration also failed"
                );
            }
            return Err(BatchError::Fault(cause));
        }

        if let Some(stale) = cx.inner().install(Some(batch.clone())) {
            stale.set_holder(None);
        }
        batch.set_holder(Some(cx.inner()));
        tracing::debug!(%txn, ctx = %cx.id(), "batch created");
        Ok(batch)
    }

    /// Associate `batch` with the context, suspending whatever was
    /// previously associated.
    ///
    /// Returns a [`ResumeGuard`] whose release restores the previous
    /// association. Resuming the batch that is already current returns
    /// a no-op guard; resuming a batch with no underlying transaction
    /// swaps the association without touching the resource manager.
    ///
    /// If the transaction detached from the context does not match the
    /// one the previously-associated batch expected, the coordinator's
    /// bookkeeping has been corrupted by misuse and an
    /// [`IllegalState`](BatchError::IllegalState) is raised.
    pub fn resume_batch<'a>(
        &'a self,
        cx: &'a BatchContext,
        batch: &Batch,
    ) -> Result<ResumeGuard<'a, T>, BatchError<T::Fault>> {
        self.resume_inner(cx, batch)
            .map(|kind| ResumeGuard::new(self, cx, kind))
            .map_err(|error| error.translate(&self.translator))
    }

    fn resume_inner(&self, cx: &BatchContext, batch: &Batch) -> Result<GuardKind, BatchError> {
        let current = cx.current_batch();
        if current.as_ref() == Some(batch) {
            return Ok(GuardKind::Noop);
        }

        let Some((txn, rm)) = batch.transactional_parts() else {
            let previous = cx.inner().install(Some(batch.clone()));
            if let Some(prev) = &previous {
                prev.set_holder(None);
            }
            tracing::trace!(ctx = %cx.id(), "non-transactional batch resumed");
            return Ok(GuardKind::Swap { previous });
        };

        if let Some((prev_txn, prev_rm)) = current.as_ref().and_then(Batch::transactional_parts) {
            let suspended = prev_rm.suspend(cx.id()).map_err(BatchError::Fault)?;
            if suspended != prev_txn {
                return Err(BatchError::IllegalState(format!(
                    "suspended {suspended}, but the associated batch expected {prev_txn}"
                )));
            }
        }
        rm.resume(cx.id(), txn).map_err(BatchError::Fault)?;

        let previous = cx.inner().install(Some(batch.clone()));
        if let Some(prev) = &previous {
            prev.set_holder(None);
        }
        batch.set_holder(Some(cx.inner()));
        tracing::debug!(%txn, ctx = %cx.id(), "batch resumed");
        Ok(GuardKind::Full {
            previous,
            resumed: batch.clone(),
        })
    }

    /// Detach and return the context's current batch, for handoff to
    /// another context.
    ///
    /// Returns the no-op singleton when nothing is associated. The
    /// association is cleared before anything that can fail, so the
    /// context is consistent even when a fault is raised.
    pub fn suspend_batch(&self, cx: &BatchContext) -> Result<Batch, BatchError<T::Fault>> {
        self.suspend_inner(cx)
            .map_err(|error| error.translate(&self.translator))
    }

    fn suspend_inner(&self, cx: &BatchContext) -> Result<Batch, BatchError> {
        let Some(batch) = cx.inner().take() else {
            return Ok(Batch::non_transactional());
        };
        batch.set_holder(None);
        if let Some((txn, rm)) = batch.transactional_parts() {
            let suspended = rm.suspend(cx.id()).map_err(BatchError::Fault)?;
            if suspended != txn {
                return Err(BatchError::IllegalState(format!(
                    "suspended {suspended}, but the associated batch expected {txn}"
                )));
            }
            tracing::debug!(%txn, ctx = %cx.id(), "batch suspended");
        }
        Ok(batch)
    }
}

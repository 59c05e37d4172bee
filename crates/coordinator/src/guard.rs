//! Scoped restoration of a context's prior batch association.

use crate::batch::Batch;
use crate::context::BatchContext;
use crate::coordinator::BatchCoordinator;
use crate::translate::{BatchError, FaultTranslator, IdentityTranslator};

/// What releasing the guard has to undo.
pub(crate) enum GuardKind {
    /// The batch was already current; nothing to undo.
    Noop,
    /// Only the association was swapped; no transaction moved.
    Swap {
        /// Association to restore.
        previous: Option<Batch>,
    },
    /// A transaction was resumed into the context and must be
    /// suspended again, with the previous one (if any) re-attached.
    Full {
        /// Association to restore.
        previous: Option<Batch>,
        /// The batch whose transaction was resumed.
        resumed: Batch,
    },
}

/// Token returned by [`BatchCoordinator::resume_batch`].
///
/// Holding the guard means the context is temporarily associated with
/// a resumed batch. Releasing it restores the prior association (the
/// prior transaction is re-attached and the context register is put
/// back) on **every** exit path:
///
/// - [`end`](ResumeGuard::end) is the checked release; call it when a
///   release fault matters to you.
/// - Dropping the guard performs the same release and logs a failure
///   at `error`, since `Drop` cannot report one.
///
/// Either way the context register is restored before anything else
/// happens, so a caller observing a fault still sees a consistent
/// context.
#[must_use = "dropping the guard releases it immediately; hold it for the scope of the handoff"]
pub struct ResumeGuard<'a, T: FaultTranslator = IdentityTranslator> {
    coordinator: &'a BatchCoordinator<T>,
    context: &'a BatchContext,
    kind: Option<GuardKind>,
}

impl<'a, T: FaultTranslator> ResumeGuard<'a, T> {
    pub(crate) fn new(
        coordinator: &'a BatchCoordinator<T>,
        context: &'a BatchContext,
        kind: GuardKind,
    ) -> Self {
        ResumeGuard {
            coordinator,
            context,
            kind: Some(kind),
        }
    }

    /// Release the guard, reporting any fault raised while detaching
    /// the resumed transaction or re-attaching the previous one.
    ///
    /// The context register is restored even when this fails.
    pub fn end(mut self) -> Result<(), BatchError<T::Fault>> {
        let kind = self.kind.take();
        self.release(kind)
            .map_err(|error| error.translate(&self.coordinator.translator))
    }

    fn release(&self, kind: Option<GuardKind>) -> Result<(), BatchError> {
        let Some(kind) = kind else { return Ok(()) };
        match kind {
            GuardKind::Noop => Ok(()),
            GuardKind::Swap { previous } => {
                self.restore(previous);
                Ok(())
            }
            GuardKind::Full { previous, resumed } => {
                let result = self.reattach(&previous, &resumed);
                resumed.set_holder(None);
                self.restore(previous);
                result
            }
        }
    }

    /// Detach the resumed transaction and re-attach the previous one.
    fn reattach(&self, previous: &Option<Batch>, resumed: &Batch) -> Result<(), BatchError> {
        let cx = self.context.id();
        if let Some((_, rm)) = resumed.transactional_parts() {
            rm.suspend(cx).map_err(BatchError::Fault)?;
        }
        if let Some((prev_txn, prev_rm)) = previous.as_ref().and_then(Batch::transactional_parts) {
            prev_rm.resume(cx, prev_txn).map_err(BatchError::Fault)?;
        }
        Ok(())
    }

    fn restore(&self, previous: Option<Batch>) {
        if let Some(prev) = &previous {
            prev.set_holder(Some(self.context.inner()));
        }
        self.context.inner().install(previous);
        tracing::trace!(ctx = %self.context.id(), "prior batch association restored");
    }
}

impl<'a, T: FaultTranslator> Drop for ResumeGuard<'a, T> {
    fn drop(&mut self) {
        if let Some(kind) = self.kind.take() {
            if let Err(error) = self.release(Some(kind)) {
                tracing::error!(
                    ctx = %self.context.id(),
                    %error,
                    "batch handoff release failed on drop"
                );
            }
        }
    }
}

impl<'a, T: FaultTranslator> std::fmt::Debug for ResumeGuard<'a, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResumeGuard")
            .field("context", &self.context.id())
            .field("released", &self.kind.is_none())
            .finish()
    }
}

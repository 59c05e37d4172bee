//! Main entry point for cobatch.
//!
//! This module provides the [`Batcher`] struct, the primary handle for
//! creating, handing off, and completing batches.

use crate::error::{Error, ErrorTranslator, Result};
use cobatch_coordinator::{Batch, BatchContext, BatchCoordinator, ResumeGuard};
use cobatch_core::ResourceManager;
use cobatch_txn::TxnManager;
use std::sync::Arc;

/// Guard returned by [`Batcher::resume_batch`].
pub type BatchGuard<'a> = ResumeGuard<'a, ErrorTranslator>;

/// The batch coordinator handle.
///
/// Create one per resource manager (or one non-transactional one) and
/// share it across the contexts doing batched work.
///
/// # Example
///
/// ```ignore
/// use cobatch::prelude::*;
///
/// let batcher = Batcher::new();
/// let cx = batcher.context();
///
/// // Nested call sites share one transaction.
/// let outer = batcher.create_batch(&cx)?;
/// let nested = batcher.create_batch(&cx)?; // same batch, interposed
/// nested.close()?;                          // no commit yet
/// outer.close()?;                           // commits exactly once
/// ```
pub struct Batcher {
    coordinator: BatchCoordinator<ErrorTranslator>,
}

impl Batcher {
    /// A transactional batcher over the bundled in-memory manager.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// A batcher with no resource manager.
    ///
    /// Every batch is the always-active no-op singleton; close and
    /// discard succeed trivially. This makes batching a structural
    /// no-op in non-transactional deployments without branching at
    /// call sites.
    pub fn non_transactional() -> Self {
        Self::builder().non_transactional().build()
    }

    /// Create a builder for batcher configuration.
    pub fn builder() -> BatcherBuilder {
        BatcherBuilder::new()
    }

    /// Allocate a fresh execution context with no associated batch.
    pub fn context(&self) -> BatchContext {
        BatchContext::new()
    }

    /// Get a batch for the context: the context's active batch
    /// (interposed) if it has one, a new one otherwise.
    pub fn create_batch(&self, cx: &BatchContext) -> Result<Batch> {
        self.coordinator.create_batch(cx).map_err(Error::from)
    }

    /// Associate `batch` with the context, suspending whatever was
    /// previously associated. The returned guard restores the prior
    /// association when released.
    pub fn resume_batch<'a>(&'a self, cx: &'a BatchContext, batch: &Batch) -> Result<BatchGuard<'a>> {
        self.coordinator.resume_batch(cx, batch).map_err(Error::from)
    }

    /// Detach and return the context's current batch, for handoff to
    /// another context.
    pub fn suspend_batch(&self, cx: &BatchContext) -> Result<Batch> {
        self.coordinator.suspend_batch(cx).map_err(Error::from)
    }

    /// Run a closure inside a batch.
    ///
    /// Creates (or interposes on) a batch, runs `work`, discards the
    /// batch if `work` fails, and always closes it. The closure's
    /// error wins over a close-time fault.
    pub fn with_batch<V>(
        &self,
        cx: &BatchContext,
        work: impl FnOnce(&Batch) -> Result<V>,
    ) -> Result<V> {
        let batch = self.create_batch(cx)?;
        let result = work(&batch);
        if result.is_err() {
            batch.discard();
        }
        let closed = batch.close();
        let value = result?;
        closed?;
        Ok(value)
    }
}

impl Default for Batcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for batcher configuration.
///
/// # Example
///
/// ```ignore
/// // Default: transactional over the bundled in-memory manager.
/// let batcher = Batcher::builder().build();
///
/// // Bring your own resource manager.
/// let batcher = Batcher::builder().resource_manager(my_manager).build();
///
/// // Structural no-op mode.
/// let batcher = Batcher::builder().non_transactional().build();
/// ```
pub struct BatcherBuilder {
    manager: Option<Arc<dyn ResourceManager>>,
    transactional: bool,
}

impl BatcherBuilder {
    /// Create a new builder with default settings (transactional over
    /// the bundled in-memory manager).
    pub fn new() -> Self {
        BatcherBuilder {
            manager: None,
            transactional: true,
        }
    }

    /// Use the given resource manager.
    pub fn resource_manager(mut self, manager: Arc<dyn ResourceManager>) -> Self {
        self.manager = Some(manager);
        self.transactional = true;
        self
    }

    /// Use no resource manager; every batch is the no-op singleton.
    pub fn non_transactional(mut self) -> Self {
        self.manager = None;
        self.transactional = false;
        self
    }

    /// Build the batcher.
    pub fn build(self) -> Batcher {
        let rm = if self.transactional {
            Some(
                self.manager
                    .unwrap_or_else(|| Arc::new(TxnManager::new()) as Arc<dyn ResourceManager>),
            )
        } else {
            None
        };
        Batcher {
            coordinator: BatchCoordinator::with_translator(rm, ErrorTranslator),
        }
    }
}

impl Default for BatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

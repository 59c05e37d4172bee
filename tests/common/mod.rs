//! Shared fixtures for integration tests.

use cobatch::{
    Batcher, CompletionCallback, ContextId, ResourceManager, TxnError, TxnId, TxnManager,
    TxnStatus,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Delegates to the bundled manager while counting completions, so
/// tests can assert "exactly one commit" style properties.
pub struct CountingManager {
    inner: TxnManager,
    commits: AtomicU64,
    rollbacks: AtomicU64,
}

impl CountingManager {
    pub fn new() -> Arc<Self> {
        Arc::new(CountingManager {
            inner: TxnManager::new(),
            commits: AtomicU64::new(0),
            rollbacks: AtomicU64::new(0),
        })
    }

    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> u64 {
        self.rollbacks.load(Ordering::SeqCst)
    }

    pub fn completions(&self) -> u64 {
        self.commits() + self.rollbacks()
    }

    /// Direct access to the underlying manager, for tests that
    /// manipulate attachments behind the coordinator's back.
    pub fn raw(&self) -> &TxnManager {
        &self.inner
    }
}

impl ResourceManager for CountingManager {
    fn begin(&self, ctx: ContextId) -> Result<TxnId, TxnError> {
        self.inner.begin(ctx)
    }

    fn suspend(&self, ctx: ContextId) -> Result<TxnId, TxnError> {
        self.inner.suspend(ctx)
    }

    fn resume(&self, ctx: ContextId, txn: TxnId) -> Result<(), TxnError> {
        self.inner.resume(ctx, txn)
    }

    fn current(&self, ctx: ContextId) -> Result<Option<TxnId>, TxnError> {
        self.inner.current(ctx)
    }

    fn commit(&self, txn: TxnId) -> Result<(), TxnError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.inner.commit(txn)
    }

    fn rollback(&self, txn: TxnId) -> Result<(), TxnError> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        self.inner.rollback(txn)
    }

    fn status(&self, txn: TxnId) -> Result<TxnStatus, TxnError> {
        self.inner.status(txn)
    }

    fn register_completion(&self, txn: TxnId, callback: CompletionCallback) -> Result<(), TxnError> {
        self.inner.register_completion(txn, callback)
    }
}

/// Install a test subscriber so coordination traces show up under
/// `--nocapture`. Safe to call from every test; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A batcher over a counting manager.
pub fn counting_batcher() -> (Arc<CountingManager>, Batcher) {
    let rm = CountingManager::new();
    let batcher = Batcher::builder()
        .resource_manager(rm.clone() as Arc<dyn ResourceManager>)
        .build();
    (rm, batcher)
}

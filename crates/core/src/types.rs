//! Identity and status types shared across the workspace.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one underlying transaction.
///
/// Allocated by the resource manager. Two batch handles wrapping the
/// same `TxnId` refer to the same unit of work and compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxnId(u64);

impl TxnId {
    /// Wrap a raw identity value.
    pub const fn from_raw(raw: u64) -> Self {
        TxnId(raw)
    }

    /// The raw identity value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn-{}", self.0)
    }
}

/// Identity of one execution context.
///
/// A context is the unit of "current transaction" bookkeeping: a
/// thread, a pooled worker, or any caller-defined scope. The resource
/// manager keeps at most one transaction attached per context, and the
/// coordinator keeps at most one batch associated per context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocate a fresh, process-unique context identity.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ContextId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw identity value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// Status of an underlying transaction, as reported by the resource
/// manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnStatus {
    /// Running; may still commit.
    Active,
    /// Running, but constrained to roll back at completion.
    MarkedRollback,
    /// Terminal: committed.
    Committed,
    /// Terminal: rolled back.
    RolledBack,
}

impl TxnStatus {
    /// True for statuses that still accept work (`Active`).
    pub fn is_active(self) -> bool {
        matches!(self, TxnStatus::Active)
    }

    /// True once the transaction has reached a terminal outcome.
    pub fn is_terminal(self) -> bool {
        matches!(self, TxnStatus::Committed | TxnStatus::RolledBack)
    }
}

impl fmt::Display for TxnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxnStatus::Active => "active",
            TxnStatus::MarkedRollback => "marked-rollback",
            TxnStatus::Committed => "committed",
            TxnStatus::RolledBack => "rolled-back",
        };
        f.write_str(name)
    }
}

//! # Cobatch
//!
//! Transactional batch lifecycle coordination.
//!
//! Cobatch lets many logically-related operations share exactly one
//! underlying transaction, no matter how many call sites open a batch
//! and no matter which execution context finally closes it. Nested
//! acquisitions join the active batch by *interposition* (a reference
//! count); only the outermost close commits or rolls back. Handoff to
//! another context is explicit, via suspend/resume, with a guard that
//! restores the prior association on every exit path.
//!
//! ## Quick Start
//!
//! ```ignore
//! use cobatch::prelude::*;
//!
//! let batcher = Batcher::new();
//! let cx = batcher.context();
//!
//! // Nested call sites reuse one transaction.
//! let outer = batcher.create_batch(&cx)?;
//! let nested = batcher.create_batch(&cx)?; // same batch, interposed
//! nested.close()?;                          // no commit yet
//! outer.close()?;                           // commits exactly once
//!
//! // Cancellation is a close-time decision.
//! let batch = batcher.create_batch(&cx)?;
//! batch.discard();
//! batch.close()?;                           // rolls back
//! ```
//!
//! ## Cross-context handoff
//!
//! ```ignore
//! let batch = batcher.create_batch(&cx_a)?;
//! let handed = batcher.suspend_batch(&cx_a)?;
//!
//! // ... on another worker, with its own context ...
//! let guard = batcher.resume_batch(&cx_b, &handed)?;
//! handed.close()?;                          // completes exactly once
//! guard.end()?;                             // restore cx_b's prior state
//! ```
//!
//! ## Fault translation
//!
//! The coordinator is parameterized by a [`FaultTranslator`], so each
//! layer can wrap it with its own public fault type. [`Error`] is the
//! built-in target; supply any `Fn(TxnError) -> E` to
//! [`BatchCoordinator::with_translator`] for your own.
//!
//! ## Non-transactional mode
//!
//! With no resource manager configured
//! ([`Batcher::non_transactional`]), every batch is a fixed
//! always-active no-op: a valid, first-class mode that makes batching
//! structurally free in deployments without transactions.

#![warn(missing_docs)]

mod batcher;
mod error;

pub mod prelude;

// Re-export main entry points
pub use batcher::{BatchGuard, Batcher, BatcherBuilder};
pub use error::{Error, ErrorTranslator, Result};

// Re-export the coordination surface
pub use cobatch_coordinator::{
    Batch, BatchContext, BatchCoordinator, BatchError, BatchState, FaultTranslator,
    IdentityTranslator, ResumeGuard,
};

// Re-export the core vocabulary and the bundled manager
pub use cobatch_core::{CompletionCallback, ContextId, ResourceManager, TxnError, TxnId, TxnStatus};
pub use cobatch_txn::TxnManager;

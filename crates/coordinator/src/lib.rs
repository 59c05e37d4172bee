//! Batch lifecycle coordination
//!
//! Many logically-related operations share exactly one underlying
//! transaction, no matter how many call sites open a batch and no
//! matter which execution context finally closes it:
//!
//! - [`Batch`]: a handle over one unit of transactional work. Nested
//!   acquisitions *interpose* on the existing batch (a reference
//!   count) instead of starting new transactions; only the outermost
//!   close commits or rolls back.
//! - [`BatchContext`]: the explicit per-execution-context register
//!   holding at most one current batch. There is no hidden
//!   thread-local; callers pass the context they are working in.
//! - [`BatchCoordinator`]: creates, looks up, and hands off batches,
//!   keeping the context register consistent with the resource
//!   manager's own per-context transaction attachment.
//! - [`ResumeGuard`]: returned by suspend/resume handoff; restores the
//!   prior association on every exit path.
//! - [`FaultTranslator`]: maps resource-manager faults into the
//!   caller's own fault type, so different layers can wrap the same
//!   coordinator with different public error surfaces.
//!
//! # Concurrency
//!
//! The coordinator takes no global lock. Each context register has its
//! own mutex; the interposition count is a bare atomic because a
//! `close()` may race with an `interpose()` from a context that
//! received the batch via resume. Mutual exclusion for the actual
//! commit/rollback is the resource manager's single-attachment-per-
//! context discipline, nothing more.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod context;
pub mod coordinator;
pub mod guard;
pub mod translate;

pub use batch::{Batch, BatchState};
pub use context::BatchContext;
pub use coordinator::BatchCoordinator;
pub use guard::ResumeGuard;
pub use translate::{BatchError, FaultTranslator, IdentityTranslator};

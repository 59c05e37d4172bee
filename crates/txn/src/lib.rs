//! Local transaction manager
//!
//! An in-memory [`ResourceManager`](cobatch_core::ResourceManager)
//! implementation: transaction identities, status tracking, per-context
//! attachment, and completion callbacks, all within one process.
//!
//! This is deliberately not a distributed transaction engine. There is
//! no two-phase commit, no recovery log, and no XA enlistment; the
//! point is to give the batch coordinator a real, fully observable
//! manager to drive, both in production single-process deployments and
//! in tests.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod manager;

pub use manager::TxnManager;

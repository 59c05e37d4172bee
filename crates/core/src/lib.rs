//! Core vocabulary for cobatch
//!
//! This crate defines the shared types spoken at every layer:
//! - Transaction and context identities ([`TxnId`], [`ContextId`])
//! - Transaction status ([`TxnStatus`])
//! - The resource-manager capability ([`ResourceManager`])
//! - Resource-manager faults ([`TxnError`])
//!
//! Nothing here implements behavior beyond identity allocation; the
//! local manager lives in `cobatch-txn` and the batch coordinator in
//! `cobatch-coordinator`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Result, TxnError};
pub use traits::{CompletionCallback, ResourceManager};
pub use types::{ContextId, TxnId, TxnStatus};

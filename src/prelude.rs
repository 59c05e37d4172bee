//! Convenient imports for common usage.
//!
//! ```ignore
//! use cobatch::prelude::*;
//! ```

pub use crate::{
    Batch, BatchContext, BatchGuard, BatchState, Batcher, BatcherBuilder, Error, Result,
};

//! Runtime support for reactive primitives.
//!
//! This module provides the infrastructure for dependency tracking,
//! deferred watcher scheduling and the flush cycle that stores wait on.

mod context;

pub use context::{NextTick, ReactiveRuntime, RuntimeInner, MAX_FLUSH_ROUNDS};

//! Fine-grained reactive primitives.
//!
//! This module provides the building blocks the store is made of:
//! - Signals: Reactive state cells
//! - Memos: Cached computed values
//! - Watchers: Deferred change callbacks, run when the runtime flushes

mod memo;
mod signal;
mod watcher;

pub use memo::{create_memo, Memo};
pub use signal::{create_signal, Signal};
pub use watcher::{watch, Watcher};

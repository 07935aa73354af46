//! Actions and their instrumentation.
//!
//! Every action declared on a store is wrapped so that each call is
//! reported to the store's hook sets, before it runs and after it settled.

mod token;
mod wrapper;

pub use token::Token;
pub use wrapper::{Action, ActionCall, ActionOutput, ActionResult, WrappedAction};

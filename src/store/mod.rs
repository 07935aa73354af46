//! Stores: named state trees with computed properties, instrumented
//! actions, watchers and nested modules.
//!
//! A [`StoreDescription`] is composed into a [`Store`] by
//! [`create_store`]. Composition is depth-first: modules are composed
//! first, their state is mounted into the parent's, and only then are the
//! parent's watchers and actions wired.

mod compose;
mod description;
mod state;
#[allow(clippy::module_inception)]
mod store;

pub use compose::{create_store, create_store_with, StoreOptions, DEFAULT_STORE_NAME};
pub use description::{Computed, StoreDescription, WatchHandler};
pub use state::State;
pub use store::Store;

pub(crate) use store::RootRef;

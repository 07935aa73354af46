//! # Hookstore
//!
//! Named reactive stores whose every change can be observed by plugins.
//!
//! A store is declared as a [`StoreDescription`]: state, computed
//! properties, actions, watchers, plugins and nested modules. [`create_store`]
//! composes it into a live [`Store`] in which:
//!
//! - modules are mounted into the parent state under their name, so the
//!   parent and the module share the same reactive properties,
//! - every action is wrapped so [`HookSet`]s see it start and finish, with a
//!   [`Token`] correlating the two,
//! - every state and computed property is watched, and its changes are
//!   reported to hook sets with a qualified name such as
//!   `"shop.modules.cart.state.items"`.
//!
//! ## Reactivity
//!
//! The store is built on fine-grained primitives that can also be used on
//! their own:
//! - `Signal<T>` - Reactive cells that notify dependents when changed
//! - `Memo<T>` - Computed values that automatically track dependencies
//! - `Watcher` - Change callbacks, deferred until the runtime flushes
//!
//! Changes are delivered on flush: call [`Store::flush`] or await
//! [`Store::next_tick`].
//!
//! ## Example
//!
//! ```
//! use hookstore::{create_store, Action, HookSet, StoreDescription, State};
//! use serde_json::json;
//! use std::sync::{Arc, Mutex};
//!
//! let events = Arc::new(Mutex::new(Vec::new()));
//! let store = create_store(
//!     StoreDescription::new("counter")
//!         .state(State::new().with("count", json!(0)))
//!         .action("inc", Action::sync(|state, _| {
//!             let count = state.get("count").and_then(|c| c.as_i64()).unwrap_or(0);
//!             state.set("count", json!(count + 1))?;
//!             Ok(json!(count + 1))
//!         }))
//!         .plugin(HookSet::new().on_state_change({
//!             let events = events.clone();
//!             move |_root, path, new, old| {
//!                 events.lock().unwrap().push(format!("{path}: {old} -> {new}"))
//!             }
//!         })),
//! )
//! .unwrap();
//!
//! let value = futures::executor::block_on(store.dispatch("inc", vec![])).unwrap();
//! assert_eq!(value, json!(1));
//! assert_eq!(*events.lock().unwrap(), vec!["counter.state.count: 0 -> 1"]);
//! ```

pub mod action;
pub mod error;
pub mod plugin;
pub mod runtime;
pub mod signal;
pub mod store;

// Re-export main types for convenience
pub use action::{Action, ActionCall, ActionOutput, ActionResult, Token, WrappedAction};
pub use error::{Result, StoreError};
pub use plugin::{
    register_plugin, HookSet, Logger, LoggerSettings, Plugin, PluginRegistry, Registration,
    StoreSeed,
};
pub use signal::{create_memo, create_signal, watch, Memo, Signal, Watcher};
pub use store::{
    create_store, create_store_with, State, Store, StoreDescription, StoreOptions,
    DEFAULT_STORE_NAME,
};

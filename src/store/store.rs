use super::state::State;
use crate::action::{ActionCall, WrappedAction};
use crate::error::{Result, StoreError};
use crate::plugin::HookSet;
use crate::runtime::NextTick;
use crate::signal::{Memo, Watcher};
use futures::future::{self, FutureExt};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

/// A composed store.
///
/// Cloning is cheap: clones share the same store. The store owns its
/// modules; its watchers are detached when the last handle is dropped.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

pub(crate) struct StoreInner {
    pub(crate) name: String,
    pub(crate) state: State,
    pub(crate) computed: IndexMap<String, Memo<Value>>,
    pub(crate) actions: IndexMap<String, WrappedAction>,
    pub(crate) watch: Vec<String>,
    pub(crate) plugins: Vec<Arc<HookSet>>,
    pub(crate) modules: IndexMap<String, Store>,
    // Only held: dropping the store detaches its watchers
    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) watchers: Vec<Watcher>,
}

impl Store {
    pub(crate) fn from_inner(inner: StoreInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Qualified store name, e.g. `"shop.modules.cart"` for a module.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The reactive state, modules mounted in it.
    ///
    /// This is the very handle given in the description.
    pub fn state(&self) -> &State {
        &self.inner.state
    }

    /// Current value of a computed property.
    pub fn computed(&self, key: &str) -> Option<Value> {
        self.inner.computed.get(key).map(Memo::get)
    }

    pub fn computed_keys(&self) -> impl Iterator<Item = &str> {
        self.inner.computed.keys().map(String::as_str)
    }

    /// The instrumented action declared under `key`.
    pub fn action(&self, key: &str) -> Option<&WrappedAction> {
        self.inner.actions.get(key)
    }

    pub fn action_keys(&self) -> impl Iterator<Item = &str> {
        self.inner.actions.keys().map(String::as_str)
    }

    /// Keys observed by the description's explicit watchers.
    pub fn watch_keys(&self) -> impl Iterator<Item = &str> {
        self.inner.watch.iter().map(String::as_str)
    }

    /// Call the action declared under `key`, see [`WrappedAction::call`].
    pub fn dispatch(&self, key: &str, args: Vec<Value>) -> ActionCall {
        match self.inner.actions.get(key) {
            Some(action) => action.call(args),
            None => future::ready(Err(StoreError::UnknownAction {
                store: self.inner.name.clone(),
                action: key.to_string(),
            }))
            .boxed(),
        }
    }

    pub fn module(&self, key: &str) -> Option<&Store> {
        self.inner.modules.get(key)
    }

    pub fn modules(&self) -> &IndexMap<String, Store> {
        &self.inner.modules
    }

    /// Resolved local hook sets, the parent's included for a module.
    pub fn plugins(&self) -> &[Arc<HookSet>] {
        &self.inner.plugins
    }

    /// JSON projection of the state tree.
    pub fn snapshot(&self) -> Value {
        self.inner.state.runtime().untracked(|| self.inner.state.snapshot())
    }

    /// Assign a whole state tree at once, recursing into modules.
    pub fn replace_state(&self, target: &Value) -> Result<()> {
        self.inner.state.replace(target)
    }

    /// Resolves once pending changes have been flushed to watchers and hooks.
    pub fn next_tick(&self) -> NextTick {
        self.inner.state.runtime().next_tick()
    }

    /// Flush pending changes now.
    pub fn flush(&self) {
        self.inner.state.runtime().flush();
    }

    /// Whether both handles point at the same store.
    pub fn ptr_eq(a: &Store, b: &Store) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<StoreInner> {
        Arc::downgrade(&self.inner)
    }

    #[cfg(test)]
    pub(crate) fn watcher_count(&self) -> usize {
        self.inner.watchers.len()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.inner.name)
            .field("state", &self.inner.state)
            .field("computed", &self.inner.computed.keys().collect::<Vec<_>>())
            .field("actions", &self.inner.actions.keys().collect::<Vec<_>>())
            .field("plugins", &self.inner.plugins.len())
            .field("modules", &self.inner.modules)
            .finish()
    }
}

/// Late-bound reference to the root of a store tree.
///
/// Shared by every store of the tree during composition and filled once
/// the root is built. Weak, so modules never keep their root alive.
#[derive(Clone, Default)]
pub(crate) struct RootRef(Arc<OnceLock<Weak<StoreInner>>>);

impl RootRef {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&self, root: &Store) {
        let _ = self.0.set(root.downgrade());
    }

    pub(crate) fn get(&self) -> Option<Store> {
        self.0
            .get()
            .and_then(Weak::upgrade)
            .map(|inner| Store { inner })
    }
}

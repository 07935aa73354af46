use super::state::State;
use crate::action::Action;
use crate::plugin::Plugin;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Derivation of a computed property from the store's own state.
pub type Computed = Arc<dyn Fn(&State) -> Value + Send + Sync>;

/// Explicit watcher, called with `(new, old)`.
pub type WatchHandler = Arc<dyn Fn(&Value, &Value) + Send + Sync>;

/// Declarative description of a store, turned into a live [`Store`](super::Store)
/// by [`create_store`](crate::create_store).
///
/// Every part is optional: a missing name falls back to
/// [`DEFAULT_STORE_NAME`](crate::DEFAULT_STORE_NAME), a missing state to an
/// empty one.
///
/// # Examples
///
/// ```
/// use hookstore::{Action, StoreDescription, State};
/// use serde_json::json;
///
/// let cart = StoreDescription::new("cart").state(State::new().with("items", json!([])));
///
/// let shop = StoreDescription::new("shop")
///     .state(State::new().with("open", json!(true)))
///     .computed("status", |state| {
///         let open = state.get("open") == Some(json!(true));
///         json!(if open { "open" } else { "closed" })
///     })
///     .action("close", Action::sync(|state, _| {
///         state.set("open", json!(false))?;
///         Ok(json!(null))
///     }))
///     .module("cart", cart);
/// # let _ = shop;
/// ```
#[derive(Clone, Default)]
pub struct StoreDescription {
    pub name: Option<String>,
    pub state: Option<State>,
    pub computed: IndexMap<String, Computed>,
    pub actions: IndexMap<String, Action>,
    pub watch: IndexMap<String, WatchHandler>,
    pub plugins: Vec<Plugin>,
    pub modules: IndexMap<String, StoreDescription>,
}

impl StoreDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn state(mut self, state: State) -> Self {
        self.state = Some(state);
        self
    }

    pub fn computed<F>(mut self, key: impl Into<String>, derive: F) -> Self
    where
        F: Fn(&State) -> Value + Send + Sync + 'static,
    {
        self.computed.insert(key.into(), Arc::new(derive));
        self
    }

    pub fn action(mut self, key: impl Into<String>, action: Action) -> Self {
        self.actions.insert(key.into(), action);
        self
    }

    /// Watch a state or computed property of this store.
    pub fn watch<F>(mut self, key: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Value, &Value) + Send + Sync + 'static,
    {
        self.watch.insert(key.into(), Arc::new(handler));
        self
    }

    pub fn plugin(mut self, plugin: impl Into<Plugin>) -> Self {
        self.plugins.push(plugin.into());
        self
    }

    /// Nest another store under `key`.
    ///
    /// The module's state is mounted into this store's state under `key`,
    /// and `key` must not already be a state property.
    pub fn module(mut self, key: impl Into<String>, module: StoreDescription) -> Self {
        self.modules.insert(key.into(), module);
        self
    }
}

impl fmt::Debug for StoreDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreDescription")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("computed", &self.computed.keys().collect::<Vec<_>>())
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("watch", &self.watch.keys().collect::<Vec<_>>())
            .field("plugins", &self.plugins)
            .field("modules", &self.modules)
            .finish()
    }
}

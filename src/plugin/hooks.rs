use crate::action::Token;
use crate::store::{State, Store};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Callback around an action call or a watcher run: `(root, qualified name, token)`.
pub type CallHook = Arc<dyn Fn(&Store, &str, &Token) + Send + Sync>;

/// Callback after a state or computed change: `(root, qualified name, new, old)`.
pub type ChangeHookFn = Arc<dyn Fn(&Store, &str, &Value, &Value) + Send + Sync>;

/// Builds a hook set for one store, at composition time.
pub type PluginFactory = Arc<dyn Fn(&StoreSeed<'_>) -> HookSet + Send + Sync>;

/// `before` / `after` pair, both optional.
#[derive(Clone, Default)]
pub struct CallHooks {
    pub before: Option<CallHook>,
    pub after: Option<CallHook>,
}

/// After-the-fact change notification.
#[derive(Clone)]
pub struct ChangeHook {
    pub after: ChangeHookFn,
}

/// A bag of optional observers.
///
/// Every callback receives the root store of the tree and the qualified
/// name of what happened, e.g. `"shop.modules.cart.actions.add"`.
///
/// # Examples
///
/// ```
/// use hookstore::HookSet;
///
/// let hooks = HookSet::new()
///     .on_action_before(|_root, name, token| println!("{name} started [{token}]"))
///     .on_action_after(|_root, name, token| println!("{name} finished [{token}]"))
///     .on_state_change(|_root, path, new, old| println!("{path}: {old} -> {new}"));
/// assert!(hooks.actions.is_some());
/// assert!(hooks.computed.is_none());
/// ```
#[derive(Clone, Default)]
pub struct HookSet {
    pub actions: Option<CallHooks>,
    pub state: Option<ChangeHook>,
    pub computed: Option<ChangeHook>,
    pub watch: Option<CallHooks>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_action_before<F>(mut self, f: F) -> Self
    where
        F: Fn(&Store, &str, &Token) + Send + Sync + 'static,
    {
        self.actions.get_or_insert_with(CallHooks::default).before = Some(Arc::new(f));
        self
    }

    pub fn on_action_after<F>(mut self, f: F) -> Self
    where
        F: Fn(&Store, &str, &Token) + Send + Sync + 'static,
    {
        self.actions.get_or_insert_with(CallHooks::default).after = Some(Arc::new(f));
        self
    }

    pub fn on_state_change<F>(mut self, f: F) -> Self
    where
        F: Fn(&Store, &str, &Value, &Value) + Send + Sync + 'static,
    {
        self.state = Some(ChangeHook { after: Arc::new(f) });
        self
    }

    pub fn on_computed_change<F>(mut self, f: F) -> Self
    where
        F: Fn(&Store, &str, &Value, &Value) + Send + Sync + 'static,
    {
        self.computed = Some(ChangeHook { after: Arc::new(f) });
        self
    }

    pub fn on_watch_before<F>(mut self, f: F) -> Self
    where
        F: Fn(&Store, &str, &Token) + Send + Sync + 'static,
    {
        self.watch.get_or_insert_with(CallHooks::default).before = Some(Arc::new(f));
        self
    }

    pub fn on_watch_after<F>(mut self, f: F) -> Self
    where
        F: Fn(&Store, &str, &Token) + Send + Sync + 'static,
    {
        self.watch.get_or_insert_with(CallHooks::default).after = Some(Arc::new(f));
        self
    }

    pub(crate) fn action_before(&self) -> Option<&CallHook> {
        self.actions.as_ref()?.before.as_ref()
    }

    pub(crate) fn action_after(&self) -> Option<&CallHook> {
        self.actions.as_ref()?.after.as_ref()
    }

    pub(crate) fn watch_before(&self) -> Option<&CallHook> {
        self.watch.as_ref()?.before.as_ref()
    }

    pub(crate) fn watch_after(&self) -> Option<&CallHook> {
        self.watch.as_ref()?.after.as_ref()
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let calls = |hooks: &Option<CallHooks>| {
            hooks
                .as_ref()
                .map(|h| (h.before.is_some(), h.after.is_some()))
        };
        f.debug_struct("HookSet")
            .field("actions", &calls(&self.actions))
            .field("state", &self.state.is_some())
            .field("computed", &self.computed.is_some())
            .field("watch", &calls(&self.watch))
            .finish()
    }
}

/// What a plugin factory sees of the store being composed.
///
/// The name is final and the state handle is the one the finished store
/// will expose; modules are mounted into it later in composition.
pub struct StoreSeed<'a> {
    name: &'a str,
    state: &'a State,
}

impl<'a> StoreSeed<'a> {
    pub(crate) fn new(name: &'a str, state: &'a State) -> Self {
        Self { name, state }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn state(&self) -> &State {
        self.state
    }
}

/// A store plugin: a ready hook set, or a factory building one per store.
#[derive(Clone)]
pub enum Plugin {
    Hooks(Arc<HookSet>),
    Factory(PluginFactory),
}

impl Plugin {
    pub fn hooks(hooks: HookSet) -> Self {
        Plugin::Hooks(Arc::new(hooks))
    }

    pub fn factory<F>(f: F) -> Self
    where
        F: Fn(&StoreSeed<'_>) -> HookSet + Send + Sync + 'static,
    {
        Plugin::Factory(Arc::new(f))
    }
}

impl From<HookSet> for Plugin {
    fn from(hooks: HookSet) -> Self {
        Plugin::hooks(hooks)
    }
}

impl From<Arc<HookSet>> for Plugin {
    fn from(hooks: Arc<HookSet>) -> Self {
        Plugin::Hooks(hooks)
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plugin::Hooks(hooks) => f.debug_tuple("Hooks").field(hooks).finish(),
            Plugin::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

use super::hooks::{CallHook, HookSet};
use super::registry::PluginRegistry;
use crate::action::Token;
use crate::store::{RootRef, Store};
use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

/// Hook sets observing one store: the live global registry, then the
/// store's resolved local list.
#[derive(Clone)]
pub(crate) struct HookDispatch {
    root: RootRef,
    registry: Arc<PluginRegistry>,
    local: Arc<[Arc<HookSet>]>,
}

impl HookDispatch {
    pub(crate) fn new(root: RootRef, registry: Arc<PluginRegistry>, local: Vec<Arc<HookSet>>) -> Self {
        Self {
            root,
            registry,
            local: local.into(),
        }
    }

    /// The root store, once composed and while alive.
    pub(crate) fn root(&self) -> Option<Store> {
        let root = self.root.get();
        if root.is_none() {
            trace!("Root store is gone, skipping hooks");
        }
        root
    }

    fn hook_sets(&self) -> impl Iterator<Item = Arc<HookSet>> + '_ {
        self.registry
            .list()
            .into_iter()
            .chain(self.local.iter().cloned())
    }

    fn call(&self, root: &Store, name: &str, token: &Token, pick: fn(&HookSet) -> Option<&CallHook>) {
        for hooks in self.hook_sets() {
            if let Some(hook) = pick(&hooks) {
                hook(root, name, token);
            }
        }
    }

    pub(crate) fn action_before(&self, root: &Store, name: &str, token: &Token) {
        trace!(action = name, %token, "Action hooks (before)");
        self.call(root, name, token, HookSet::action_before);
    }

    pub(crate) fn action_after(&self, root: &Store, name: &str, token: &Token) {
        trace!(action = name, %token, "Action hooks (after)");
        self.call(root, name, token, HookSet::action_after);
    }

    pub(crate) fn watch_before(&self, root: &Store, name: &str, token: &Token) {
        self.call(root, name, token, HookSet::watch_before);
    }

    pub(crate) fn watch_after(&self, root: &Store, name: &str, token: &Token) {
        self.call(root, name, token, HookSet::watch_after);
    }

    pub(crate) fn state_changed(&self, path: &str, new: &Value, old: &Value) {
        let Some(root) = self.root() else {
            return;
        };
        trace!(path, "State hooks (after)");
        for hooks in self.hook_sets() {
            if let Some(state) = &hooks.state {
                (state.after)(&root, path, new, old);
            }
        }
    }

    pub(crate) fn computed_changed(&self, path: &str, new: &Value, old: &Value) {
        let Some(root) = self.root() else {
            return;
        };
        trace!(path, "Computed hooks (after)");
        for hooks in self.hook_sets() {
            if let Some(computed) = &hooks.computed {
                (computed.after)(&root, path, new, old);
            }
        }
    }
}

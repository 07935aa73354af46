use super::hooks::HookSet;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::{debug, warn};

/// Outcome of [`PluginRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Added,
    AlreadyRegistered,
}

/// Hook sets applied to every store composed against this registry.
///
/// Stores read the list when an event fires, not when they are composed,
/// so a registration also reaches stores that already exist. Global hook
/// sets run before a store's own plugins.
///
/// [`PluginRegistry::global`] is the process-wide instance used by
/// [`create_store`](crate::create_store); tests can compose against their
/// own registry with [`StoreOptions`](crate::StoreOptions).
#[derive(Default)]
pub struct PluginRegistry {
    hooks: RwLock<Vec<Arc<HookSet>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry, empty at start.
    pub fn global() -> Arc<Self> {
        static REGISTRY: OnceLock<Arc<PluginRegistry>> = OnceLock::new();
        Arc::clone(REGISTRY.get_or_init(|| Arc::new(Self::new())))
    }

    /// Append a hook set unless this very hook set is already registered.
    pub fn register(&self, hooks: Arc<HookSet>) -> Registration {
        let mut registered = self.hooks.write().unwrap_or_else(PoisonError::into_inner);
        if registered.iter().any(|known| Arc::ptr_eq(known, &hooks)) {
            warn!("You're trying to add a plugin already registered");
            return Registration::AlreadyRegistered;
        }
        registered.push(hooks);
        debug!(plugins = registered.len(), "Global plugin registered");
        Registration::Added
    }

    /// Snapshot of the registered hook sets, in registration order.
    pub fn list(&self) -> Vec<Arc<HookSet>> {
        self.hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.hooks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Register a hook set in the process-wide registry.
pub fn register_plugin(hooks: Arc<HookSet>) -> Registration {
    PluginRegistry::global().register(hooks)
}

use super::description::{Computed, StoreDescription, WatchHandler};
use super::state::State;
use super::store::{RootRef, Store, StoreInner};
use crate::action::{Token, WrappedAction};
use crate::error::{Result, StoreError};
use crate::plugin::{resolve_plugins, HookDispatch, Plugin, PluginRegistry, StoreSeed};
use crate::signal::{Memo, Watcher};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Name given to a store described without one.
pub const DEFAULT_STORE_NAME: &str = "default store name";

/// Composition settings.
#[derive(Clone)]
pub struct StoreOptions {
    registry: Arc<PluginRegistry>,
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compose against this registry instead of the process-wide one.
    pub fn registry(mut self, registry: Arc<PluginRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn plugin_registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            registry: PluginRegistry::global(),
        }
    }
}

/// Turn a description into a live store, observed by the process-wide
/// [`PluginRegistry`].
///
/// # Examples
///
/// ```
/// use hookstore::{create_store, StoreDescription, State};
/// use serde_json::json;
///
/// let state = State::new().with("count", json!(0));
/// let store = create_store(StoreDescription::new("counter").state(state.clone())).unwrap();
///
/// state.set("count", json!(1)).unwrap();
/// assert_eq!(store.state().get("count"), Some(json!(1)));
/// assert!(create_store(None::<StoreDescription>).is_err());
/// ```
pub fn create_store(description: impl Into<Option<StoreDescription>>) -> Result<Store> {
    create_store_with(description, &StoreOptions::default())
}

/// Turn a description into a live store with explicit options.
pub fn create_store_with(
    description: impl Into<Option<StoreDescription>>,
    options: &StoreOptions,
) -> Result<Store> {
    let description = description.into().ok_or(StoreError::MissingDescription)?;
    let root = RootRef::new();
    let composition = Composition {
        root: &root,
        registry: &options.registry,
        ancestors: Vec::new(),
    };
    let store = compose(description, &composition)?;
    root.set(&store);
    debug!(store = store.name(), "Store created");
    Ok(store)
}

struct Composition<'a> {
    root: &'a RootRef,
    registry: &'a Arc<PluginRegistry>,
    // States of the stores enclosing the one being composed
    ancestors: Vec<State>,
}

fn compose(description: StoreDescription, composition: &Composition<'_>) -> Result<Store> {
    let StoreDescription {
        name,
        state,
        computed,
        actions,
        watch,
        plugins,
        modules,
    } = description;
    let name = name.unwrap_or_else(|| DEFAULT_STORE_NAME.to_string());
    let state = state.unwrap_or_default();

    validate(&name, &state, &computed, &watch, &modules, composition)?;

    let local = resolve_plugins(&StoreSeed::new(&name, &state), &plugins);

    let mut ancestors = composition.ancestors.clone();
    ancestors.push(state.clone());
    let nested = Composition {
        root: composition.root,
        registry: composition.registry,
        ancestors,
    };
    let mut composed = IndexMap::with_capacity(modules.len());
    for (key, mut module) in modules {
        let own_name = module.name.take().unwrap_or_else(|| key.clone());
        module.name = Some(format!("{name}.modules.{own_name}"));
        // A stateless module still has to live in its parent's runtime
        module
            .state
            .get_or_insert_with(|| State::in_runtime(state.runtime()));
        module
            .plugins
            .extend(local.iter().cloned().map(Plugin::Hooks));
        composed.insert(key, compose(module, &nested)?);
    }

    for (key, module) in &composed {
        state.embed(key.clone(), module.state().clone());
    }

    let runtime = Arc::clone(state.runtime());
    let hooks = HookDispatch::new(
        composition.root.clone(),
        Arc::clone(composition.registry),
        local.clone(),
    );
    let mut watchers = Vec::new();

    let computed: IndexMap<String, Memo<Value>> = computed
        .into_iter()
        .map(|(key, derive)| {
            let state = state.clone();
            let memo = Memo::in_runtime(&runtime, move || derive(&state));
            (key, memo)
        })
        .collect();

    let watch_keys: Vec<String> = watch.keys().cloned().collect();
    for (key, handler) in watch {
        let path = format!("{name}.watch.{key}");
        let hooks = hooks.clone();
        let callback = move |new: &Value, old: &Value| {
            let token = Token::generate();
            let root = hooks.root();
            if let Some(root) = &root {
                hooks.watch_before(root, &path, &token);
            }
            handler(new, old);
            if let Some(root) = &root {
                hooks.watch_after(root, &path, &token);
            }
        };
        let watcher = match computed.get(&key) {
            Some(memo) if !state.contains_key(&key) => {
                let memo = memo.clone();
                Watcher::in_runtime(&runtime, move || memo.get(), callback)
            }
            _ => Watcher::in_runtime(&runtime, property(&state, &key), callback),
        };
        watchers.push(watcher);
    }

    let actions: IndexMap<String, WrappedAction> = actions
        .into_iter()
        .map(|(key, action)| {
            let wrapped = WrappedAction::new(
                format!("{name}.actions.{key}"),
                action,
                state.clone(),
                hooks.clone(),
            );
            (key, wrapped)
        })
        .collect();

    for key in state.keys() {
        let path = format!("{name}.state.{key}");
        let hooks = hooks.clone();
        watchers.push(Watcher::in_runtime(
            &runtime,
            property(&state, &key),
            move |new: &Value, old: &Value| hooks.state_changed(&path, new, old),
        ));
    }

    for (key, memo) in &computed {
        let path = format!("{name}.computed.{key}");
        let hooks = hooks.clone();
        let memo = memo.clone();
        watchers.push(Watcher::in_runtime(
            &runtime,
            move || memo.get(),
            move |new: &Value, old: &Value| hooks.computed_changed(&path, new, old),
        ));
    }

    debug!(
        store = %name,
        state = state.len(),
        computed = computed.len(),
        actions = actions.len(),
        modules = composed.len(),
        plugins = local.len(),
        "Store composed"
    );

    Ok(Store::from_inner(StoreInner {
        name,
        state,
        computed,
        actions,
        watch: watch_keys,
        plugins: local,
        modules: composed,
        watchers,
    }))
}

/// Reject a description before anything of it is built.
fn validate(
    name: &str,
    state: &State,
    computed: &IndexMap<String, Computed>,
    watch: &IndexMap<String, WatchHandler>,
    modules: &IndexMap<String, StoreDescription>,
    composition: &Composition<'_>,
) -> Result<()> {
    // Only state keys are reserved; a module may share a computed key.
    for (key, module) in modules {
        if state.contains_key(key) {
            return Err(StoreError::ModuleCollision {
                store: name.to_string(),
                key: key.clone(),
            });
        }
        if let Some(module_state) = &module.state {
            let recursive = State::ptr_eq(module_state, state)
                || composition
                    .ancestors
                    .iter()
                    .any(|ancestor| State::ptr_eq(module_state, ancestor));
            if recursive {
                return Err(StoreError::RecursiveModule {
                    store: name.to_string(),
                    key: key.clone(),
                });
            }
            // One flush has to reach every watcher of the tree
            if !Arc::ptr_eq(module_state.runtime(), state.runtime()) {
                return Err(StoreError::RuntimeMismatch {
                    store: name.to_string(),
                    key: key.clone(),
                });
            }
        }
    }

    for key in watch.keys() {
        let known = state.contains_key(key) || modules.contains_key(key) || computed.contains_key(key);
        if !known {
            return Err(StoreError::UnknownWatchTarget {
                store: name.to_string(),
                key: key.clone(),
            });
        }
    }
    Ok(())
}

fn property(state: &State, key: &str) -> impl Fn() -> Value + Send + Sync + 'static {
    let state = state.clone();
    let key = key.to_string();
    move || state.get(&key).unwrap_or(Value::Null)
}

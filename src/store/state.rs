use crate::error::{json_kind, Result, StoreError};
use crate::runtime::ReactiveRuntime;
use crate::signal::Signal;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Reactive property map backing a store.
///
/// A `State` is a cheap, shared handle: clones point at the same properties,
/// so the handle given to a store description and the one exposed by the
/// composed store are one and the same. Each property is a reactive leaf
/// holding a [`serde_json::Value`], or the embedded state of a module.
///
/// # Examples
///
/// ```
/// use hookstore::State;
/// use serde_json::json;
///
/// let state = State::new().with("count", json!(1));
/// let alias = state.clone();
///
/// alias.set("count", json!(2)).unwrap();
/// assert_eq!(state.get("count"), Some(json!(2)));
/// assert!(State::ptr_eq(&state, &alias));
/// ```
#[derive(Clone)]
pub struct State {
    node: Arc<StateNode>,
}

struct StateNode {
    runtime: Arc<ReactiveRuntime>,
    slots: RwLock<IndexMap<String, Slot>>,
}

#[derive(Clone)]
enum Slot {
    Leaf(Signal<Value>),
    Module(State),
}

impl State {
    /// Create an empty state in the current runtime.
    pub fn new() -> Self {
        Self::in_runtime(&ReactiveRuntime::current())
    }

    /// Create an empty state bound to a specific runtime.
    pub fn in_runtime(runtime: &Arc<ReactiveRuntime>) -> Self {
        Self {
            node: Arc::new(StateNode {
                runtime: Arc::clone(runtime),
                slots: RwLock::new(IndexMap::new()),
            }),
        }
    }

    /// Create a state from a JSON object, one property per top-level key.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => {
                let state = Self::new();
                for (key, value) in map {
                    state.insert_leaf(key, value);
                }
                Ok(state)
            }
            other => Err(StoreError::NotAnObject {
                found: json_kind(&other),
            }),
        }
    }

    /// Add (or overwrite) a property, builder style.
    pub fn with(self, key: impl Into<String>, value: Value) -> Self {
        self.insert_leaf(key.into(), value);
        self
    }

    /// Read a property, tracking it as a dependency of the current observer.
    ///
    /// A module property reads as the JSON projection of the module state.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.slot(key)? {
            Slot::Leaf(signal) => Some(signal.get()),
            Slot::Module(state) => Some(state.snapshot()),
        }
    }

    /// Read a property without tracking it.
    pub fn get_untracked(&self, key: &str) -> Option<Value> {
        self.node.runtime.untracked(|| self.get(key))
    }

    /// Assign a property.
    ///
    /// Unknown keys are added as new properties. A module property only
    /// accepts an object, whose keys are assigned into the module state.
    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        match self.slot(key) {
            Some(Slot::Leaf(signal)) => {
                signal.set(value);
                Ok(())
            }
            Some(Slot::Module(state)) => {
                if !value.is_object() {
                    return Err(StoreError::ModuleSlot {
                        key: key.to_string(),
                    });
                }
                state.replace(&value)
            }
            None => {
                self.insert_leaf(key.to_string(), value);
                Ok(())
            }
        }
    }

    /// Mutate a property in place, e.g. a nested field of an object.
    pub fn update<R>(&self, key: &str, f: impl FnOnce(&mut Value) -> R) -> Result<R> {
        match self.slot(key) {
            Some(Slot::Leaf(signal)) => Ok(signal.update(f)),
            Some(Slot::Module(_)) => Err(StoreError::ModuleSlot {
                key: key.to_string(),
            }),
            None => Err(StoreError::MissingKey {
                key: key.to_string(),
            }),
        }
    }

    /// The embedded state of the module mounted under `key`.
    pub fn module(&self, key: &str) -> Option<State> {
        match self.slot(key)? {
            Slot::Module(state) => Some(state),
            Slot::Leaf(_) => None,
        }
    }

    /// Whether a property (leaf or module) exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.read_slots().contains_key(key)
    }

    /// Property names, in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.read_slots().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read_slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_slots().is_empty()
    }

    /// JSON projection of the whole state tree, modules included.
    pub fn snapshot(&self) -> Value {
        let slots: Vec<(String, Slot)> = self
            .read_slots()
            .iter()
            .map(|(key, slot)| (key.clone(), slot.clone()))
            .collect();
        let mut map = Map::new();
        for (key, slot) in slots {
            let value = match slot {
                Slot::Leaf(signal) => signal.get(),
                Slot::Module(state) => state.snapshot(),
            };
            map.insert(key, value);
        }
        Value::Object(map)
    }

    /// Assign every key of a JSON object, recursing into module properties.
    ///
    /// The whole object is checked first: on error nothing was assigned.
    pub fn replace(&self, value: &Value) -> Result<()> {
        self.check_replacement(value)?;
        if let Value::Object(map) = value {
            self.assign(map);
        }
        Ok(())
    }

    fn check_replacement(&self, value: &Value) -> Result<()> {
        let Value::Object(map) = value else {
            return Err(StoreError::NotAnObject {
                found: json_kind(value),
            });
        };
        for (key, value) in map {
            if let Some(Slot::Module(state)) = self.slot(key) {
                if !value.is_object() {
                    return Err(StoreError::ModuleSlot { key: key.clone() });
                }
                state.check_replacement(value)?;
            }
        }
        Ok(())
    }

    fn assign(&self, map: &Map<String, Value>) {
        for (key, value) in map {
            match (self.slot(key), value) {
                (Some(Slot::Leaf(signal)), _) => signal.set(value.clone()),
                (Some(Slot::Module(state)), Value::Object(inner)) => state.assign(inner),
                // Rejected by check_replacement
                (Some(Slot::Module(_)), _) => {}
                (None, _) => self.insert_leaf(key.clone(), value.clone()),
            }
        }
    }

    /// The runtime this state reports reads and writes to.
    pub fn runtime(&self) -> &Arc<ReactiveRuntime> {
        &self.node.runtime
    }

    /// Whether both handles point at the same state.
    pub fn ptr_eq(a: &State, b: &State) -> bool {
        Arc::ptr_eq(&a.node, &b.node)
    }

    /// Mount a module's state under `key`, by reference.
    pub(crate) fn embed(&self, key: impl Into<String>, module: State) {
        self.write_slots().insert(key.into(), Slot::Module(module));
    }

    fn insert_leaf(&self, key: String, value: Value) {
        let signal = Signal::in_runtime(&self.node.runtime, value);
        self.write_slots().insert(key, Slot::Leaf(signal));
    }

    fn slot(&self, key: &str) -> Option<Slot> {
        self.read_slots().get(key).cloned()
    }

    fn read_slots(&self) -> std::sync::RwLockReadGuard<'_, IndexMap<String, Slot>> {
        self.node.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slots(&self) -> std::sync::RwLockWriteGuard<'_, IndexMap<String, Slot>> {
        self.node.slots.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Value> for State {
    type Error = StoreError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_json(value)
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.node.runtime.untracked(|| self.snapshot());
        f.debug_tuple("State").field(&snapshot).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_keeps_key_order() {
        let state = State::from_json(json!({ "b": 1, "a": 2, "c": 3 })).unwrap();
        assert_eq!(state.keys(), vec!["b", "a", "c"]);
        assert_eq!(state.len(), 3);
    }

    #[test]
    fn from_json_rejects_non_objects() {
        let error = State::from_json(json!([1, 2])).unwrap_err();
        assert!(matches!(error, StoreError::NotAnObject { found: "an array" }));
    }

    #[test]
    fn embedded_module_is_shared() {
        let parent = State::new().with("title", json!("root"));
        let module = State::new().with("y", json!(1));
        parent.embed("m", module.clone());

        parent.module("m").unwrap().set("y", json!(2)).unwrap();
        assert_eq!(module.get("y"), Some(json!(2)));
        assert!(State::ptr_eq(&parent.module("m").unwrap(), &module));
        assert_eq!(
            parent.snapshot(),
            json!({ "title": "root", "m": { "y": 2 } })
        );
    }

    #[test]
    fn module_slot_only_accepts_objects() {
        let parent = State::new();
        parent.embed("m", State::new().with("y", json!(1)));

        assert!(matches!(
            parent.set("m", json!(3)),
            Err(StoreError::ModuleSlot { .. })
        ));
        parent.set("m", json!({ "y": 5 })).unwrap();
        assert_eq!(parent.get("m"), Some(json!({ "y": 5 })));
    }

    #[test]
    fn update_mutates_nested_values() {
        let state = State::new().with("user", json!({ "name": "ada", "age": 36 }));
        state
            .update("user", |user| user["age"] = json!(37))
            .unwrap();
        assert_eq!(state.get("user"), Some(json!({ "name": "ada", "age": 37 })));
        assert!(matches!(
            state.update("missing", |_| ()),
            Err(StoreError::MissingKey { .. })
        ));
    }

    #[test]
    fn rejected_replace_assigns_nothing() {
        let parent = State::new().with("a", json!(1));
        let module = State::new().with("b", json!(2));
        parent.embed("m", module.clone());
        parent.embed("n", State::new().with("c", json!(3)));

        let error = parent
            .replace(&json!({ "a": 10, "m": { "b": 20 }, "n": 30 }))
            .unwrap_err();

        assert!(matches!(error, StoreError::ModuleSlot { ref key } if key == "n"));
        assert_eq!(parent.get("a"), Some(json!(1)));
        assert_eq!(module.get("b"), Some(json!(2)));
    }

    #[test]
    fn replace_recurses_into_modules() {
        let parent = State::new().with("a", json!(1));
        let module = State::new().with("b", json!(2));
        parent.embed("m", module.clone());

        parent.replace(&json!({ "a": 10, "m": { "b": 20 } })).unwrap();
        assert_eq!(parent.get("a"), Some(json!(10)));
        assert_eq!(module.get("b"), Some(json!(20)));
    }
}

//! Error types for store composition, state access and action dispatch.

use thiserror::Error;

/// Errors raised while composing or using a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `create_store` was called without a description.
    #[error("Please provide a store description to create a store")]
    MissingDescription,

    /// A module is named like a state property of the same store.
    #[error(
        "Module `{key}` of store `{store}` has the name of an existing state property. \
         Please rename your module or your state property."
    )]
    ModuleCollision { store: String, key: String },

    /// A module reuses the state of the store it is nested in.
    #[error("Module `{key}` of store `{store}` reuses the state of one of its parent stores")]
    RecursiveModule { store: String, key: String },

    /// A module's state belongs to another reactive runtime than its parent's.
    #[error(
        "Module `{key}` of store `{store}` has its state in another reactive runtime than its parent"
    )]
    RuntimeMismatch { store: String, key: String },

    /// A watcher targets a key that is neither state nor computed.
    #[error("Watcher `{key}` of store `{store}` targets neither a state nor a computed property")]
    UnknownWatchTarget { store: String, key: String },

    /// No action with that name exists on the store.
    #[error("Store `{store}` has no action named `{action}`")]
    UnknownAction { store: String, action: String },

    /// A module slot of the state was assigned something else than an object.
    #[error("State property `{key}` holds a module and only accepts an object")]
    ModuleSlot { key: String },

    /// The state property does not exist.
    #[error("State property `{key}` does not exist")]
    MissingKey { key: String },

    /// A JSON object was expected.
    #[error("Expected a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    /// The action body failed or its pending result was rejected.
    #[error("Action `{action}` failed")]
    ActionFailed {
        action: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Result alias used throughout the crate.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn collision_message_names_store_and_key() {
        let error = StoreError::ModuleCollision {
            store: "my-store".to_string(),
            key: "myData".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("my-store"));
        assert!(message.contains("myData"));
    }

    #[test]
    fn action_failure_keeps_its_source() {
        let error = StoreError::ActionFailed {
            action: "s.actions.load".to_string(),
            source: anyhow::anyhow!("network down"),
        };
        assert_eq!(error.source().map(|s| s.to_string()), Some("network down".to_string()));
    }
}

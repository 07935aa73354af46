use super::hooks::HookSet;
use tracing::{info, trace};

/// Which event families the logger reports at `info` level.
///
/// Disabled families are still reported, at `trace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggerSettings {
    pub state: bool,
    pub computed: bool,
    pub actions: bool,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            state: true,
            computed: true,
            actions: true,
        }
    }
}

/// Plugin reporting every store event through `tracing`.
///
/// ```
/// use hookstore::{create_store, Logger, StoreDescription, State};
/// use serde_json::json;
///
/// let store = create_store(
///     StoreDescription::new("counter")
///         .state(State::new().with("count", json!(0)))
///         .plugin(Logger::default().hook_set()),
/// )
/// .unwrap();
/// assert_eq!(store.plugins().len(), 1);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Logger {
    settings: LoggerSettings,
}

impl Logger {
    pub fn new(settings: LoggerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> LoggerSettings {
        self.settings
    }

    pub fn hook_set(&self) -> HookSet {
        let settings = self.settings;
        HookSet::new()
            .on_state_change(move |root, path, new, old| {
                if settings.state {
                    info!(store = root.name(), path, %old, %new, "{path} updated");
                } else {
                    trace!(store = root.name(), path, "{path} updated");
                }
            })
            .on_computed_change(move |root, path, new, old| {
                if settings.computed {
                    info!(store = root.name(), path, %old, %new, "{path} recomputed");
                } else {
                    trace!(store = root.name(), path, "{path} recomputed");
                }
            })
            .on_action_before(move |root, action, token| {
                if settings.actions {
                    info!(store = root.name(), %token, "{action} triggered");
                } else {
                    trace!(store = root.name(), %token, "{action} triggered");
                }
            })
            .on_action_after(move |root, action, token| {
                if settings.actions {
                    info!(store = root.name(), %token, "{action} finished");
                } else {
                    trace!(store = root.name(), %token, "{action} finished");
                }
            })
    }
}

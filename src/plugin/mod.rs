//! Plugins observing stores.
//!
//! A plugin is a [`HookSet`] (or a factory building one per store). Hook
//! sets declared on a store see that store and its modules; hook sets in a
//! [`PluginRegistry`] see every store composed against the registry.

mod dispatch;
mod hooks;
mod logger;
mod registry;
mod resolve;

pub(crate) use dispatch::HookDispatch;
pub use hooks::{CallHook, CallHooks, ChangeHook, ChangeHookFn, HookSet, Plugin, PluginFactory, StoreSeed};
pub use logger::{Logger, LoggerSettings};
pub use registry::{register_plugin, PluginRegistry, Registration};
pub use resolve::resolve_plugins;

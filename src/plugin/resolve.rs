use super::hooks::{HookSet, Plugin, StoreSeed};
use std::sync::Arc;

/// Turn declared plugins into the concrete hook sets of one store.
///
/// Factories are invoked once, with the store being composed; ready hook
/// sets are taken as they are. Order is kept and duplicates are allowed.
pub fn resolve_plugins(seed: &StoreSeed<'_>, plugins: &[Plugin]) -> Vec<Arc<HookSet>> {
    plugins
        .iter()
        .map(|plugin| match plugin {
            Plugin::Hooks(hooks) => Arc::clone(hooks),
            Plugin::Factory(factory) => Arc::new(factory(seed)),
        })
        .collect()
}

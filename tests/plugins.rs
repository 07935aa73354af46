mod common;

use common::{Fixture, LogCapture, Recorder};
use hookstore::{
    create_store_with, register_plugin, Action, HookSet, Logger, LoggerSettings, PluginRegistry,
    Registration, StoreDescription,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tracing::Level;

fn labelled(label: &'static str, log: &Arc<Mutex<Vec<String>>>) -> HookSet {
    let before = log.clone();
    let state = log.clone();
    HookSet::new()
        .on_action_before(move |_, name, _| before.lock().unwrap().push(format!("{label}:{name}")))
        .on_state_change(move |_, path, _, _| state.lock().unwrap().push(format!("{label}:{path}")))
}

#[test]
fn global_registration_is_idempotent() {
    let (logs, _guard) = LogCapture::install();
    let hooks = Arc::new(HookSet::new());

    assert_eq!(register_plugin(hooks.clone()), Registration::Added);
    assert_eq!(register_plugin(hooks.clone()), Registration::AlreadyRegistered);

    assert_eq!(
        logs.levels_of("You're trying to add a plugin already registered"),
        vec![Level::WARN]
    );

    let registered = PluginRegistry::global()
        .list()
        .into_iter()
        .filter(|known| Arc::ptr_eq(known, &hooks))
        .count();
    assert_eq!(registered, 1);
}

#[test]
fn registry_hooks_run_before_local_ones() {
    let fixture = Fixture::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    fixture
        .registry
        .register(Arc::new(labelled("global", &log)));

    let store = create_store_with(
        StoreDescription::new("s")
            .state(fixture.state(json!({ "x": 1 })))
            .plugin(labelled("local", &log)),
        &fixture.options(),
    )
    .unwrap();

    store.state().set("x", json!(2)).unwrap();
    store.flush();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["global:s.state.x", "local:s.state.x"]
    );
}

#[test]
fn late_registration_reaches_existing_stores() {
    let fixture = Fixture::new();
    let store = create_store_with(
        StoreDescription::new("s").state(fixture.state(json!({ "x": 1 }))),
        &fixture.options(),
    )
    .unwrap();

    let recorder = Recorder::new();
    fixture.registry.register(Arc::new(recorder.hook_set()));

    store.state().set("x", json!(2)).unwrap();
    store.flush();

    assert_eq!(
        recorder.state_changes(),
        vec![("s.state.x".to_string(), json!(2), json!(1))]
    );
}

#[test]
fn duplicate_local_plugins_fire_twice() {
    let fixture = Fixture::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let hooks = Arc::new(labelled("local", &log));

    let store = create_store_with(
        StoreDescription::new("s")
            .state(fixture.state(json!({ "x": 1 })))
            .plugin(hooks.clone())
            .plugin(hooks),
        &fixture.options(),
    )
    .unwrap();
    assert_eq!(store.plugins().len(), 2);

    store.state().set("x", json!(2)).unwrap();
    store.flush();

    assert_eq!(log.lock().unwrap().len(), 2);
}

#[test]
fn module_hooks_run_before_inherited_ones() {
    let fixture = Fixture::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let store = create_store_with(
        StoreDescription::new("s")
            .state(fixture.state(json!({})))
            .plugin(labelled("parent", &log))
            .module(
                "m",
                StoreDescription::new("m")
                    .state(fixture.state(json!({ "y": 1 })))
                    .plugin(labelled("module", &log)),
            ),
        &fixture.options(),
    )
    .unwrap();

    store.module("m").unwrap().state().set("y", json!(2)).unwrap();
    store.flush();

    let log = log.lock().unwrap();
    let module_events: Vec<&String> = log
        .iter()
        .filter(|entry| entry.ends_with("s.modules.m.state.y"))
        .collect();
    assert_eq!(
        module_events,
        vec!["module:s.modules.m.state.y", "parent:s.modules.m.state.y"]
    );
    // The parent's own watcher on the module slot only reaches the parent hooks
    assert!(log.contains(&"parent:s.state.m".to_string()));
    assert!(!log.contains(&"module:s.state.m".to_string()));
}

#[tokio::test]
async fn logger_reports_through_tracing() {
    let (logs, _guard) = LogCapture::install();

    let fixture = Fixture::new();
    let logger = Logger::new(LoggerSettings {
        computed: false,
        ..LoggerSettings::default()
    });
    assert!(!logger.settings().computed);

    let store = create_store_with(
        StoreDescription::new("s")
            .state(fixture.state(json!({ "x": 1 })))
            .computed("double", |state| {
                json!(state.get("x").and_then(|x| x.as_i64()).unwrap_or(0) * 2)
            })
            .action(
                "inc",
                Action::sync(|state, _| {
                    let x = state.get("x").and_then(|x| x.as_i64()).unwrap_or(0);
                    state.set("x", json!(x + 1))?;
                    Ok(json!(x + 1))
                }),
            )
            .plugin(logger.hook_set()),
        &fixture.options(),
    )
    .unwrap();

    store.dispatch("inc", vec![]).await.unwrap();

    assert_eq!(logs.levels_of("s.actions.inc triggered"), vec![Level::INFO]);
    assert_eq!(logs.levels_of("s.state.x updated"), vec![Level::INFO]);
    assert_eq!(logs.levels_of("s.actions.inc finished"), vec![Level::INFO]);
    // Disabled family drops to trace
    assert_eq!(
        logs.levels_of("s.computed.double recomputed"),
        vec![Level::TRACE]
    );
    assert_eq!(store.computed("double"), Some(json!(4)));
}

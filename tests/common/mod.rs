#![allow(dead_code)]

use hookstore::runtime::ReactiveRuntime;
use hookstore::{HookSet, PluginRegistry, State, StoreOptions, Token};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// A private runtime and registry, so tests never share a flush queue.
pub struct Fixture {
    pub runtime: Arc<ReactiveRuntime>,
    pub registry: Arc<PluginRegistry>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            runtime: ReactiveRuntime::new(),
            registry: Arc::new(PluginRegistry::new()),
        }
    }

    pub fn state(&self, value: Value) -> State {
        let state = State::in_runtime(&self.runtime);
        state.replace(&value).unwrap();
        state
    }

    pub fn options(&self) -> StoreOptions {
        StoreOptions::new().registry(self.registry.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ActionBefore { root: String, name: String, token: Token },
    ActionAfter { root: String, name: String, token: Token },
    WatchBefore { root: String, name: String, token: Token },
    WatchAfter { root: String, name: String, token: Token },
    State { root: String, path: String, new: Value, old: Value },
    Computed { root: String, path: String, new: Value, old: Value },
}

/// Hook set recording every event it sees.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hook_set(&self) -> HookSet {
        let push = |events: &Arc<Mutex<Vec<Event>>>| {
            let events = events.clone();
            move |event: Event| events.lock().unwrap().push(event)
        };
        let (a, b, c, d, e, f) = (
            push(&self.events),
            push(&self.events),
            push(&self.events),
            push(&self.events),
            push(&self.events),
            push(&self.events),
        );
        HookSet::new()
            .on_action_before(move |root, name, token| {
                a(Event::ActionBefore {
                    root: root.name().to_string(),
                    name: name.to_string(),
                    token: *token,
                })
            })
            .on_action_after(move |root, name, token| {
                b(Event::ActionAfter {
                    root: root.name().to_string(),
                    name: name.to_string(),
                    token: *token,
                })
            })
            .on_watch_before(move |root, name, token| {
                c(Event::WatchBefore {
                    root: root.name().to_string(),
                    name: name.to_string(),
                    token: *token,
                })
            })
            .on_watch_after(move |root, name, token| {
                d(Event::WatchAfter {
                    root: root.name().to_string(),
                    name: name.to_string(),
                    token: *token,
                })
            })
            .on_state_change(move |root, path, new, old| {
                e(Event::State {
                    root: root.name().to_string(),
                    path: path.to_string(),
                    new: new.clone(),
                    old: old.clone(),
                })
            })
            .on_computed_change(move |root, path, new, old| {
                f(Event::Computed {
                    root: root.name().to_string(),
                    path: path.to_string(),
                    new: new.clone(),
                    old: old.clone(),
                })
            })
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// `(path, new, old)` of every state event.
    pub fn state_changes(&self) -> Vec<(String, Value, Value)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::State { path, new, old, .. } => Some((path, new, old)),
                _ => None,
            })
            .collect()
    }

    /// `(path, new, old)` of every computed event.
    pub fn computed_changes(&self) -> Vec<(String, Value, Value)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Computed { path, new, old, .. } => Some((path, new, old)),
                _ => None,
            })
            .collect()
    }

    /// Action events only, in order.
    pub fn action_events(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|event| matches!(event, Event::ActionBefore { .. } | Event::ActionAfter { .. }))
            .collect()
    }
}

/// One captured `tracing` event.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
}

/// Layer keeping every event emitted on the current thread.
#[derive(Clone, Default)]
pub struct LogCapture {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl LogCapture {
    /// Capture events until the guard is dropped.
    pub fn install() -> (Self, DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Levels of the records carrying exactly this message.
    pub fn levels_of(&self, message: &str) -> Vec<Level> {
        self.records()
            .into_iter()
            .filter(|record| record.message == message)
            .map(|record| record.level)
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.records.lock().unwrap().push(LogRecord {
            level: *event.metadata().level(),
            message: visitor.message,
        });
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

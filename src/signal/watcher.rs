use crate::runtime::{ReactiveRuntime, RuntimeInner};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// A change watcher over a derived value.
///
/// The getter runs inside an observer context, so every signal or memo it
/// reads becomes a dependency. When one of them changes the watcher is
/// queued, and on the next flush the getter is re-evaluated. The callback
/// receives `(new, old)` only if the value differs from the one seen at the
/// previous flush. Values are compared structurally, so a change deep inside
/// a nested value is seen as a change of the whole value.
///
/// Dropping the watcher detaches it from the runtime.
///
/// # Examples
///
/// ```
/// use hookstore::runtime::ReactiveRuntime;
/// use hookstore::{Signal, Watcher};
/// use std::sync::{Arc, Mutex};
///
/// let runtime = ReactiveRuntime::new();
/// let count = Signal::in_runtime(&runtime, 1);
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// let _watcher = Watcher::in_runtime(
///     &runtime,
///     {
///         let count = count.clone();
///         move || count.get()
///     },
///     {
///         let seen = seen.clone();
///         move |new: &i32, old: &i32| seen.lock().unwrap().push((*new, *old))
///     },
/// );
///
/// count.set(2);
/// count.set(3);
/// assert!(seen.lock().unwrap().is_empty());
///
/// runtime.flush();
/// assert_eq!(*seen.lock().unwrap(), vec![(3, 1)]);
/// ```
pub struct Watcher {
    id: usize,
    runtime: Weak<RuntimeInner>,
}

impl Watcher {
    /// Create a watcher in the current runtime.
    pub fn new<T, G, C>(getter: G, callback: C) -> Self
    where
        T: Clone + PartialEq + Send + 'static,
        G: Fn() -> T + Send + Sync + 'static,
        C: Fn(&T, &T) + Send + Sync + 'static,
    {
        Self::in_runtime(&ReactiveRuntime::current(), getter, callback)
    }

    /// Create a watcher bound to a specific runtime.
    pub fn in_runtime<T, G, C>(runtime: &Arc<ReactiveRuntime>, getter: G, callback: C) -> Self
    where
        T: Clone + PartialEq + Send + 'static,
        G: Fn() -> T + Send + Sync + 'static,
        C: Fn(&T, &T) + Send + Sync + 'static,
    {
        let id = runtime.next_id();
        let getter = Arc::new(getter);
        let last: Arc<Mutex<Option<T>>> = Arc::new(Mutex::new(None));

        // Register the re-evaluation with the runtime
        let weak_runtime = Arc::downgrade(runtime);
        let getter_clone = Arc::clone(&getter);
        let last_clone = Arc::clone(&last);
        runtime.create_observer(id, move || {
            let Some(runtime) = weak_runtime.upgrade() else {
                return;
            };
            runtime.clear_dependencies(id);
            let next = runtime.with_observer(id, || getter_clone());
            let previous = {
                let mut last = last_clone.lock().unwrap_or_else(PoisonError::into_inner);
                if last.as_ref() == Some(&next) {
                    return;
                }
                last.replace(next.clone())
            };
            if let Some(previous) = previous {
                callback(&next, &previous);
            }
        });

        // Evaluate once within the observer context to track dependencies
        let initial = runtime.with_observer(id, || getter());
        *last.lock().unwrap_or_else(PoisonError::into_inner) = Some(initial);

        Self {
            id,
            runtime: Arc::downgrade(&runtime.inner()),
        }
    }

    /// The watcher's unique ID.
    pub fn id(&self) -> usize {
        self.id
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.remove_observer(self.id);
        }
    }
}

/// Watch a derived value in the current runtime.
pub fn watch<T, G, C>(getter: G, callback: C) -> Watcher
where
    T: Clone + PartialEq + Send + 'static,
    G: Fn() -> T + Send + Sync + 'static,
    C: Fn(&T, &T) + Send + Sync + 'static,
{
    Watcher::new(getter, callback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{Memo, Signal};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn watcher_waits_for_flush() {
        let runtime = ReactiveRuntime::new();
        let signal = Signal::in_runtime(&runtime, 0);
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        let _watcher = Watcher::in_runtime(
            &runtime,
            {
                let signal = signal.clone();
                move || signal.get()
            },
            move |_: &i32, _: &i32| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
            },
        );

        signal.set(1);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        runtime.flush();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn equal_value_does_not_fire() {
        let runtime = ReactiveRuntime::new();
        let signal = Signal::in_runtime(&runtime, 7);
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        let _watcher = Watcher::in_runtime(
            &runtime,
            {
                let signal = signal.clone();
                move || signal.get()
            },
            move |_: &i32, _: &i32| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
            },
        );

        signal.set(8);
        signal.set(7);
        runtime.flush();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn watches_memo_results() {
        let runtime = ReactiveRuntime::new();
        let signal = Signal::in_runtime(&runtime, 2);
        let squared = Memo::in_runtime(&runtime, {
            let signal = signal.clone();
            move || signal.get() * signal.get()
        });
        let seen = Arc::new(Mutex::new(Vec::new()));

        let _watcher = Watcher::in_runtime(
            &runtime,
            {
                let squared = squared.clone();
                move || squared.get()
            },
            {
                let seen = seen.clone();
                move |new: &i32, old: &i32| seen.lock().unwrap().push((*new, *old))
            },
        );

        signal.set(3);
        runtime.flush();
        assert_eq!(*seen.lock().unwrap(), vec![(9, 4)]);
    }

    #[test]
    fn dropped_watcher_stops_firing() {
        let runtime = ReactiveRuntime::new();
        let signal = Signal::in_runtime(&runtime, 0);
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        let watcher = Watcher::in_runtime(
            &runtime,
            {
                let signal = signal.clone();
                move || signal.get()
            },
            move |_: &i32, _: &i32| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
            },
        );
        drop(watcher);

        signal.set(1);
        runtime.flush();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}

use crate::runtime::ReactiveRuntime;
use std::sync::{Arc, PoisonError, RwLock};

/// A reactive signal that holds a value and notifies subscribers when changed.
pub struct Signal<T> {
    inner: Arc<SignalInner<T>>,
}

struct SignalInner<T> {
    value: RwLock<T>,
    id: usize,
    runtime: Arc<ReactiveRuntime>,
}

impl<T> Drop for SignalInner<T> {
    fn drop(&mut self) {
        self.runtime.inner().remove_source(self.id);
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Signal<T> {
    /// Create a new signal in the current runtime.
    pub fn new(initial: T) -> Self {
        Self::in_runtime(&ReactiveRuntime::current(), initial)
    }

    /// Create a new signal bound to a specific runtime.
    pub fn in_runtime(runtime: &Arc<ReactiveRuntime>, initial: T) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                value: RwLock::new(initial),
                id: runtime.next_id(),
                runtime: Arc::clone(runtime),
            }),
        }
    }

    /// Get the current value of the signal.
    pub fn get(&self) -> T {
        self.inner.runtime.track_read(self.inner.id);
        self.get_untracked()
    }

    /// Get the current value without registering a dependency.
    pub fn get_untracked(&self) -> T {
        self.inner
            .value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Set a new value for the signal.
    pub fn set(&self, new_value: T) {
        *self
            .inner
            .value
            .write()
            .unwrap_or_else(PoisonError::into_inner) = new_value;
        self.inner.runtime.notify_observers(self.inner.id);
    }

    /// Update the value in place using a function.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut value = self
            .inner
            .value
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut value);
        drop(value); // Release the write lock before notifying
        self.inner.runtime.notify_observers(self.inner.id);
        result
    }

    /// Read the value with a function without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.runtime.track_read(self.inner.id);
        let value = self
            .inner
            .value
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f(&value)
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> usize {
        self.inner.id
    }

    /// The runtime this signal reports reads and writes to.
    pub fn runtime(&self) -> &Arc<ReactiveRuntime> {
        &self.inner.runtime
    }
}

/// Create a new signal in the current runtime.
pub fn create_signal<T: Clone + Send + Sync + 'static>(initial: T) -> Signal<T> {
    Signal::new(initial)
}

use crate::runtime::ReactiveRuntime;
use std::sync::{Arc, PoisonError, RwLock};

/// A memoized computed value that automatically tracks dependencies.
///
/// Memos only recompute when their dependencies change, and only when read.
pub struct Memo<T> {
    inner: Arc<MemoInner<T>>,
}

struct MemoInner<T> {
    compute: Box<dyn Fn() -> T + Send + Sync>,
    cached: RwLock<Option<T>>,
    id: usize,
    runtime: Arc<ReactiveRuntime>,
}

impl<T> Drop for MemoInner<T> {
    fn drop(&mut self) {
        self.runtime.inner().remove_observer(self.id);
    }
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Memo<T> {
    /// Create a new memo in the current runtime.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::in_runtime(&ReactiveRuntime::current(), compute)
    }

    /// Create a new memo bound to a specific runtime.
    pub fn in_runtime<F>(runtime: &Arc<ReactiveRuntime>, compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let id = runtime.next_id();

        // Register this as a memo with the runtime
        runtime.register_memo(id);

        Self {
            inner: Arc::new(MemoInner {
                compute: Box::new(compute),
                cached: RwLock::new(None),
                id,
                runtime: Arc::clone(runtime),
            }),
        }
    }

    /// Get the current value, recomputing if necessary.
    pub fn get(&self) -> T {
        let inner = &self.inner;
        inner.runtime.track_read(inner.id);

        if !inner.runtime.is_memo_dirty(inner.id) {
            let cached = inner.cached.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(value) = cached.as_ref() {
                return value.clone();
            }
        }

        // Recompute within observer context to re-track dependencies
        inner.runtime.clear_dependencies(inner.id);
        let value = inner.runtime.with_observer(inner.id, || (inner.compute)());
        *inner.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(value.clone());
        inner.runtime.mark_memo_clean(inner.id);
        value
    }

    /// Get the memo's unique ID.
    pub fn id(&self) -> usize {
        self.inner.id
    }
}

/// Create a new memoized computation.
///
/// # Example
///
/// ```
/// use hookstore::{create_memo, create_signal};
///
/// let count = create_signal(5);
/// let doubled = create_memo({
///     let count = count.clone();
///     move || count.get() * 2
/// });
/// assert_eq!(doubled.get(), 10);
/// ```
pub fn create_memo<T, F>(compute: F) -> Memo<T>
where
    T: Clone + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    Memo::new(compute)
}

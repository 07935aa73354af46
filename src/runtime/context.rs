use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tracing::{trace, warn};

/// Upper bound on drain rounds in a single flush.
///
/// A watcher callback that keeps writing the values it observes would
/// otherwise flush forever.
pub const MAX_FLUSH_ROUNDS: usize = 100;

type Observer = Arc<dyn Fn() + Send + Sync>;

/// Reactive context for tracking dependencies.
struct ReactiveContext {
    current_observer: Option<usize>,
    // Map from source ID (signal or memo) to set of observer IDs that depend on it
    dependencies: HashMap<usize, HashSet<usize>>,
    // Map from observer ID to set of source IDs it depends on
    observer_deps: HashMap<usize, HashSet<usize>>,
    // Map from watcher ID to the function re-evaluating it
    observers: HashMap<usize, Observer>,
    // Map from memo ID to dirty state
    memo_dirty: HashMap<usize, bool>,
    // Watchers waiting for the next flush
    pending: Vec<usize>,
    queued: HashSet<usize>,
    flushing: bool,
}

impl ReactiveContext {
    fn new() -> Self {
        Self {
            current_observer: None,
            dependencies: HashMap::new(),
            observer_deps: HashMap::new(),
            observers: HashMap::new(),
            memo_dirty: HashMap::new(),
            pending: Vec::new(),
            queued: HashSet::new(),
            flushing: false,
        }
    }

    /// Reset the graph, handing back the observers for the caller to drop
    /// once the lock is released.
    fn clear(&mut self) -> HashMap<usize, Observer> {
        self.current_observer = None;
        self.dependencies.clear();
        self.observer_deps.clear();
        self.memo_dirty.clear();
        self.pending.clear();
        self.queued.clear();
        self.flushing = false;
        std::mem::take(&mut self.observers)
    }

    fn unlink(&mut self, observer_id: usize) {
        if let Some(old_deps) = self.observer_deps.remove(&observer_id) {
            for source_id in old_deps {
                if let Some(deps) = self.dependencies.get_mut(&source_id) {
                    deps.remove(&observer_id);
                }
            }
        }
    }
}

/// Inner runtime state that can be shared.
pub struct RuntimeInner {
    context: Mutex<ReactiveContext>,
}

impl RuntimeInner {
    fn new() -> Self {
        Self {
            context: Mutex::new(ReactiveContext::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReactiveContext> {
        self.context.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Detach an observer (watcher or memo) from the graph.
    pub fn remove_observer(&self, observer_id: usize) {
        let observer = {
            let mut ctx = self.lock();
            ctx.memo_dirty.remove(&observer_id);
            ctx.queued.remove(&observer_id);
            ctx.pending.retain(|id| *id != observer_id);
            ctx.unlink(observer_id);
            ctx.dependencies.remove(&observer_id);
            ctx.observers.remove(&observer_id)
        };
        // The closure may own the last handle on signals of this runtime,
        // whose drop locks the context again.
        drop(observer);
    }

    /// Forget a source that can no longer be read.
    pub fn remove_source(&self, source_id: usize) {
        let mut ctx = self.lock();
        ctx.dependencies.remove(&source_id);
    }

    fn clear(&self) {
        let observers = self.lock().clear();
        drop(observers);
    }
}

/// Hybrid reactive runtime for managing reactive primitives.
///
/// Supports both global runtime (default) and scoped runtimes for isolation.
/// The runtime tracks dependencies between signals, memos and watchers.
/// Writes never run watchers directly: they queue them, and the queue is
/// drained by [`flush`](ReactiveRuntime::flush) or by awaiting
/// [`next_tick`](ReactiveRuntime::next_tick).
///
/// # Examples
///
/// Using the default global runtime:
///
/// ```
/// use hookstore::Signal;
///
/// let signal = Signal::new(42);
/// assert_eq!(signal.get(), 42);
/// ```
///
/// Using scoped runtimes for isolation:
///
/// ```
/// use hookstore::runtime::ReactiveRuntime;
/// use hookstore::Signal;
///
/// ReactiveRuntime::scope(|| {
///     let signal = Signal::new(0);
///     assert_eq!(signal.get(), 0);
/// });
/// // Runtime and all its state is dropped here
/// ```
pub struct ReactiveRuntime {
    next_id: AtomicUsize,
    inner: Arc<RuntimeInner>,
}

// Thread-local stack for scoped runtimes
thread_local! {
    static RUNTIME_STACK: RefCell<Vec<Arc<ReactiveRuntime>>> = const { RefCell::new(Vec::new()) };
}

impl ReactiveRuntime {
    /// Create a new isolated runtime.
    ///
    /// This creates a completely independent reactive runtime with its own
    /// dependency graph and watcher queue.
    pub fn new() -> Arc<Self> {
        Arc::new(ReactiveRuntime {
            next_id: AtomicUsize::new(0),
            inner: Arc::new(RuntimeInner::new()),
        })
    }

    /// Run a function with a fresh isolated runtime.
    ///
    /// Primitives created inside keep a handle on the runtime, so a store
    /// composed in the closure keeps working after it returns.
    ///
    /// # Examples
    ///
    /// ```
    /// use hookstore::runtime::ReactiveRuntime;
    /// use hookstore::Signal;
    ///
    /// ReactiveRuntime::scope(|| {
    ///     let signal = Signal::new(0);
    ///     assert_eq!(signal.get(), 0);
    /// });
    /// ```
    pub fn scope<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let runtime = Self::new();
        Self::with_runtime(runtime, f)
    }

    /// Get or create the global runtime (fallback).
    pub fn global() -> Arc<Self> {
        use std::sync::OnceLock;
        static RUNTIME: OnceLock<Arc<ReactiveRuntime>> = OnceLock::new();
        Arc::clone(RUNTIME.get_or_init(Self::new))
    }

    /// Get the current reactive runtime (scoped or global fallback).
    pub fn current() -> Arc<Self> {
        RUNTIME_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .cloned()
                .unwrap_or_else(Self::global)
        })
    }

    /// Run a function with a specific runtime as the current context.
    ///
    /// # Examples
    ///
    /// ```
    /// use hookstore::runtime::ReactiveRuntime;
    /// use hookstore::Signal;
    ///
    /// let runtime = ReactiveRuntime::new();
    /// ReactiveRuntime::with_runtime(runtime, || {
    ///     let signal = Signal::new(42);
    ///     assert_eq!(signal.get(), 42);
    /// });
    /// ```
    pub fn with_runtime<F, R>(runtime: Arc<Self>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().push(runtime);
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// Clear all observers, dependencies, and queued watchers from this runtime.
    pub fn clear(&self) {
        self.inner.clear();
        self.next_id.store(0, Ordering::SeqCst);
    }

    /// Get a reference to the inner runtime state.
    pub fn inner(&self) -> Arc<RuntimeInner> {
        Arc::clone(&self.inner)
    }

    /// Generate the next unique ID for a reactive primitive.
    pub fn next_id(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Track a read of a signal or memo by the current observer.
    pub fn track_read(&self, source_id: usize) {
        let mut ctx = self.inner.lock();
        if let Some(current_observer) = ctx.current_observer {
            if current_observer == source_id {
                return;
            }
            ctx.dependencies
                .entry(source_id)
                .or_default()
                .insert(current_observer);
            ctx.observer_deps
                .entry(current_observer)
                .or_default()
                .insert(source_id);
        }
    }

    /// Notify all observers that depend on a source.
    pub fn notify_observers(&self, source_id: usize) {
        let observers = {
            let ctx = self.inner.lock();
            ctx.dependencies
                .get(&source_id)
                .map(|obs| obs.iter().copied().collect::<Vec<_>>())
        };

        if let Some(observers) = observers {
            for observer_id in observers {
                self.mark_observer_dirty(observer_id);
            }
        }
    }

    /// Mark an observer dirty: memos propagate to their dependents,
    /// watchers are queued for the next flush.
    fn mark_observer_dirty(&self, observer_id: usize) {
        let mut ctx = self.inner.lock();

        if let Some(dirty) = ctx.memo_dirty.get(&observer_id).copied() {
            if dirty {
                return;
            }
            ctx.memo_dirty.insert(observer_id, true);
            let dependents = ctx
                .dependencies
                .get(&observer_id)
                .map(|deps| deps.iter().copied().collect::<Vec<_>>());
            drop(ctx);

            if let Some(dependents) = dependents {
                for dependent_id in dependents {
                    self.mark_observer_dirty(dependent_id);
                }
            }
            return;
        }

        if ctx.observers.contains_key(&observer_id) && ctx.queued.insert(observer_id) {
            ctx.pending.push(observer_id);
        }
    }

    /// Register the function that re-evaluates a watcher on flush.
    pub fn create_observer<F>(&self, observer_id: usize, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let previous = {
            let mut ctx = self.inner.lock();
            ctx.unlink(observer_id);
            ctx.observers.insert(observer_id, Arc::new(f))
        };
        drop(previous);
    }

    /// Drop every dependency an observer recorded, before it is re-run.
    pub fn clear_dependencies(&self, observer_id: usize) {
        self.inner.lock().unlink(observer_id);
    }

    /// Run a function with a specific observer as the current context.
    pub fn with_observer<F, R>(&self, observer_id: usize, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.with_current(Some(observer_id), f)
    }

    /// Run a function without tracking any read it makes.
    pub fn untracked<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.with_current(None, f)
    }

    fn with_current<F, R>(&self, observer: Option<usize>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let prev = std::mem::replace(&mut self.inner.lock().current_observer, observer);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));
        self.inner.lock().current_observer = prev;
        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// Register a memo and mark it as dirty initially.
    pub fn register_memo(&self, memo_id: usize) {
        self.inner.lock().memo_dirty.insert(memo_id, true);
    }

    /// Check if a memo is dirty (needs recomputation).
    pub fn is_memo_dirty(&self, memo_id: usize) -> bool {
        self.inner
            .lock()
            .memo_dirty
            .get(&memo_id)
            .copied()
            .unwrap_or(true)
    }

    /// Mark a memo as clean (after recomputation).
    pub fn mark_memo_clean(&self, memo_id: usize) {
        self.inner.lock().memo_dirty.insert(memo_id, false);
    }

    /// Whether any watcher is waiting for a flush.
    pub fn has_pending(&self) -> bool {
        !self.inner.lock().pending.is_empty()
    }

    /// Run every queued watcher.
    ///
    /// Watchers dirtied while the queue drains are run in the same flush.
    /// A flush requested from inside a watcher callback is a no-op; the
    /// outer flush picks up whatever it queued.
    pub fn flush(&self) {
        {
            let mut ctx = self.inner.lock();
            if ctx.flushing {
                return;
            }
            ctx.flushing = true;
        }

        let mut rounds = 0;
        loop {
            let batch = {
                let mut ctx = self.inner.lock();
                let mut batch = std::mem::take(&mut ctx.pending);
                for id in &batch {
                    ctx.queued.remove(id);
                }
                // Creation order, whatever order the writes came in
                batch.sort_unstable();
                batch
                    .into_iter()
                    .filter_map(|id| ctx.observers.get(&id).cloned())
                    .collect::<Vec<_>>()
            };
            if batch.is_empty() {
                break;
            }
            rounds += 1;
            if rounds > MAX_FLUSH_ROUNDS {
                warn!(
                    rounds = MAX_FLUSH_ROUNDS,
                    "Watchers keep re-queuing each other, dropping remaining updates"
                );
                let mut ctx = self.inner.lock();
                ctx.pending.clear();
                ctx.queued.clear();
                break;
            }
            trace!(watchers = batch.len(), round = rounds, "Flushing watchers");
            for observer in batch {
                if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| observer())) {
                    self.inner.lock().flushing = false;
                    std::panic::resume_unwind(e);
                }
            }
        }

        self.inner.lock().flushing = false;
    }

    /// Future resolving once pending reactive updates have been flushed.
    ///
    /// The first poll yields to the executor, the second one flushes.
    pub fn next_tick(self: &Arc<Self>) -> NextTick {
        NextTick {
            runtime: Arc::clone(self),
            yielded: false,
        }
    }
}

/// Future returned by [`ReactiveRuntime::next_tick`].
pub struct NextTick {
    runtime: Arc<ReactiveRuntime>,
    yielded: bool,
}

impl Future for NextTick {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if !self.yielded {
            self.yielded = true;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
        self.runtime.flush();
        Poll::Ready(())
    }
}

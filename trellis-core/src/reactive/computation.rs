//! Computation Node
//!
//! A computation is both a source (others may read it) and an observer (it
//! reads others). It comes in two modes, fixed at construction:
//!
//! - **Pure** nodes back [`Computed`](super::Computed). They are lazy: a
//!   notification only marks them stale, and the function re-runs on the
//!   next read. The result is cached.
//!
//! - **Impure** nodes back [`Effect`](super::Effect). They are eager: they
//!   run once on construction and again on every notification. A run may
//!   return a cleanup, which is invoked right before the next run and once
//!   more on disposal.
//!
//! # Evaluation
//!
//! Every run starts from a clean slate. The node first removes itself from
//! each source it currently depends on, then runs its function with itself
//! installed as the current observer. Whatever the function reads this time
//! becomes the new source list, so dependencies follow the branches actually
//! taken.
//!
//! # Propagation
//!
//! A notification marks the node stale, re-runs it if it is impure, and then
//! forwards the notification to every observer of the node. The forward is
//! unconditional: an intermediate pure node whose value turns out unchanged
//! still lets the cascade through. The equality check on recomputation only
//! decides whether the cached value (and its version) is replaced.

use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use super::context::ReactiveContext;
use super::observer::{Observer, ObserverHandle, ObserverId, ObserverSet, Source};
use crate::error::{ReactiveError, Result};

/// Action returned by an effect run, invoked before the next run and on
/// disposal.
pub type Cleanup = Box<dyn FnOnce() + Send>;

enum Evaluator<T> {
    Pure(Box<dyn Fn() -> T + Send + Sync>),
    Impure(Box<dyn Fn() -> Option<Cleanup> + Send + Sync>),
}

/// Cached value of a pure node.
///
/// A stale node may still hold its previous value, which is compared with
/// the next result.
enum Cache<T> {
    Stale(Option<T>),
    Fresh(T),
}

impl<T> Cache<T> {
    fn into_value(self) -> Option<T> {
        match self {
            Cache::Stale(value) => value,
            Cache::Fresh(value) => Some(value),
        }
    }
}

/// Invoke a cleanup with dependency tracking switched off.
fn release(cleanup: Cleanup) {
    let _ctx = ReactiveContext::suspend();
    cleanup();
}

/// Threads currently inside a node's function.
type Evaluating = Mutex<SmallVec<[ThreadId; 1]>>;

/// Removes the current thread from the evaluating set, also when the
/// function panics.
struct EvaluatingGuard<'a> {
    evaluating: &'a Evaluating,
    thread: ThreadId,
}

impl<'a> EvaluatingGuard<'a> {
    /// Register the current thread, or return `None` if it is already
    /// evaluating this node.
    fn enter(evaluating: &'a Evaluating) -> Option<Self> {
        let thread = thread::current().id();
        let mut threads = evaluating.lock();
        if threads.contains(&thread) {
            return None;
        }
        threads.push(thread);
        Some(Self { evaluating, thread })
    }
}

impl Drop for EvaluatingGuard<'_> {
    fn drop(&mut self) {
        self.evaluating.lock().retain(|thread| *thread != self.thread);
    }
}

pub(crate) struct Computation<T> {
    handle: ObserverHandle,
    this: Weak<Computation<T>>,
    evaluator: Evaluator<T>,
    cache: Mutex<Cache<T>>,
    /// Bumped each time the cached value is replaced.
    version: AtomicU64,
    runs: AtomicU64,
    observers: ObserverSet,
    sources: Mutex<SmallVec<[Weak<dyn Source>; 4]>>,
    cleanup: Mutex<Option<Cleanup>>,
    evaluating: Evaluating,
    disposed: AtomicBool,
}

impl<T> Computation<T> {
    pub(crate) fn id(&self) -> ObserverId {
        self.handle.id()
    }

    pub(crate) fn is_pure(&self) -> bool {
        matches!(self.evaluator, Evaluator::Pure(_))
    }

    pub(crate) fn is_stale(&self) -> bool {
        matches!(*self.cache.lock(), Cache::Stale(_))
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub(crate) fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    pub(crate) fn run_count(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn source_count(&self) -> usize {
        self.sources.lock().len()
    }

    /// Remove this node from every source it depends on and forget them.
    fn detach(&self) {
        let sources = mem::take(&mut *self.sources.lock());
        for source in sources.iter().filter_map(Weak::upgrade) {
            source.remove_observer(&self.handle);
        }
    }

    fn mark_stale(&self) {
        let mut cache = self.cache.lock();
        let previous = mem::replace(&mut *cache, Cache::Stale(None));
        *cache = Cache::Stale(previous.into_value());
    }

    /// Run `f` with this node installed as the current observer.
    fn tracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _ctx = ReactiveContext::enter(self.handle.clone());
        self.runs.fetch_add(1, Ordering::SeqCst);
        f()
    }
}

impl<T> Computation<T>
where
    T: PartialEq + Clone + Send + Sync + 'static,
{
    fn with_evaluator(evaluator: Evaluator<T>) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let observer: Weak<dyn Observer> = this.clone();
            Self {
                handle: ObserverHandle::new(ObserverId::new(), observer),
                this: this.clone(),
                evaluator,
                cache: Mutex::new(Cache::Stale(None)),
                version: AtomicU64::new(0),
                runs: AtomicU64::new(0),
                observers: ObserverSet::new(),
                sources: Mutex::new(SmallVec::new()),
                cleanup: Mutex::new(None),
                evaluating: Mutex::new(SmallVec::new()),
                disposed: AtomicBool::new(false),
            }
        })
    }

    /// Create a lazy node. Nothing runs until the first read.
    pub(crate) fn pure<F>(f: F) -> Arc<Self>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_evaluator(Evaluator::Pure(Box::new(f)))
    }

    /// Read the value, recomputing first if the node is stale.
    ///
    /// Registers the current observer, if any, as a dependent.
    pub(crate) fn read(&self) -> Result<T> {
        let cached = match &*self.cache.lock() {
            Cache::Fresh(value) => Some(value.clone()),
            Cache::Stale(_) => None,
        };
        let value = match cached {
            Some(value) => value,
            None => self.recompute()?,
        };

        self.observers.track(|| self.as_source());
        Ok(value)
    }

    fn recompute(&self) -> Result<T> {
        let Evaluator::Pure(f) = &self.evaluator else {
            // Impure nodes have no readable value; they are never handed
            // out behind a `Computed`.
            unreachable!("impure computation {} read as a value", self.id());
        };

        // Only a re-entrant read on the evaluating thread is a cycle. Another
        // thread reading meanwhile evaluates on its own.
        let Some(_guard) = EvaluatingGuard::enter(&self.evaluating) else {
            warn!(node = %self.id(), "cyclic read detected");
            return Err(ReactiveError::Cycle { node: self.id() });
        };

        self.detach();
        trace!(node = %self.id(), "evaluating computed");
        let value = self.tracked(f);
        trace!(node = %self.id(), sources = self.source_count(), "computed evaluated");

        Ok(self.store(value))
    }

    /// Cache `value` unless it equals the previous one, and mark fresh.
    fn store(&self, value: T) -> T {
        let previous = mem::replace(&mut *self.cache.lock(), Cache::Stale(None)).into_value();
        let current = match previous {
            Some(previous) if previous == value => previous,
            _ => {
                self.version.fetch_add(1, Ordering::SeqCst);
                value
            }
        };
        *self.cache.lock() = Cache::Fresh(current.clone());
        current
    }

    fn as_source(&self) -> Weak<dyn Source> {
        let weak: Weak<Self> = self.this.clone();
        weak
    }
}

impl Computation<()> {
    /// Create an eager node and run it once before returning.
    pub(crate) fn impure<F>(f: F) -> Arc<Self>
    where
        F: Fn() -> Option<Cleanup> + Send + Sync + 'static,
    {
        let node = Self::with_evaluator(Evaluator::Impure(Box::new(f)));
        node.run_effect();
        node
    }
}

impl<T> Computation<T> {
    fn run_effect(&self) {
        let Evaluator::Impure(f) = &self.evaluator else {
            return;
        };

        self.detach();
        self.run_cleanup();
        // The previous cleanup may have disposed the effect.
        if self.is_disposed() {
            return;
        }

        trace!(node = %self.id(), "running effect");
        let cleanup = self.tracked(f);

        if self.is_disposed() {
            // Disposed from inside its own body: undo the edges made after
            // disposal and release the new cleanup right away.
            self.detach();
            if let Some(cleanup) = cleanup {
                release(cleanup);
            }
            return;
        }

        // A nested run triggered from within the body may have stored a
        // cleanup already; it still has to run exactly once.
        let superseded = mem::replace(&mut *self.cleanup.lock(), cleanup);
        if let Some(superseded) = superseded {
            release(superseded);
        }
    }

    fn run_cleanup(&self) {
        let cleanup = self.cleanup.lock().take();
        if let Some(cleanup) = cleanup {
            release(cleanup);
        }
    }

    /// Sever the node from its sources and release its cleanup.
    ///
    /// Safe to call repeatedly and from within the effect's own body or
    /// cleanup.
    pub(crate) fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(node = %self.id(), "disposing effect");
        self.detach();
        self.run_cleanup();
    }
}

impl<T> Source for Computation<T>
where
    T: PartialEq + Clone + Send + Sync + 'static,
{
    fn remove_observer(&self, observer: &ObserverHandle) {
        self.observers.remove(observer);
    }
}

impl<T> Observer for Computation<T>
where
    T: PartialEq + Clone + Send + Sync + 'static,
{
    fn add_source(&self, source: Weak<dyn Source>) {
        self.sources.lock().push(source);
    }

    fn notify(&self) {
        if self.is_disposed() {
            return;
        }
        self.mark_stale();
        if !self.is_pure() {
            self.run_effect();
        }
        self.observers.notify_all();
    }
}

impl<T> Drop for Computation<T> {
    fn drop(&mut self) {
        self.detach();
        if let Some(cleanup) = self.cleanup.get_mut().take() {
            release(cleanup);
        }
        trace!(node = %self.handle.id(), "computation dropped");
    }
}

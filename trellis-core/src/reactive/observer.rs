//! Source and observer capabilities.
//!
//! The dependency graph is bipartite: sources (signals and computations) are
//! read, observers (computations) do the reading. The graph-walking code only
//! ever sees these two small traits, so a typed `Computation<T>` can sit in
//! the same observer set as a `Computation<String>`.
//!
//! Neither direction of an edge owns the other endpoint. Sources hold
//! [`ObserverHandle`]s, which wrap a `Weak`, and observers keep their sources
//! as `Weak<dyn Source>`.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexSet;
use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::trace;

use super::context::ReactiveContext;

/// Unique identifier for an observer.
///
/// Every computation gets one when it is created. Handles compare and hash
/// by this id alone, never by what the observer currently computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Generate a new unique observer ID.
    ///
    /// Uses an atomic counter so ids stay unique across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Anything an observer can depend on.
pub trait Source: Send + Sync {
    /// Forget the given observer. Removing an observer that is not
    /// registered is a no-op.
    fn remove_observer(&self, observer: &ObserverHandle);
}

/// Anything that can depend on sources.
pub trait Observer: Send + Sync {
    /// Record a source read during the observer's current evaluation.
    fn add_source(&self, source: Weak<dyn Source>);

    /// One of the observer's sources changed.
    fn notify(&self);
}

/// Identity handle for an observer.
///
/// This is what sources store in their observer sets and what the dependency
/// context holds while a computation evaluates. It does not keep the
/// observer alive: once the observer is dropped, [`ObserverHandle::notify`]
/// and [`ObserverHandle::add_source`] silently do nothing.
#[derive(Clone)]
pub struct ObserverHandle {
    id: ObserverId,
    observer: Weak<dyn Observer>,
}

impl ObserverHandle {
    /// Wrap an observer under the given id.
    pub fn new(id: ObserverId, observer: Weak<dyn Observer>) -> Self {
        Self { id, observer }
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Upgrade to the underlying observer, if it is still alive.
    pub fn upgrade(&self) -> Option<Arc<dyn Observer>> {
        self.observer.upgrade()
    }

    /// Forward a newly read source to the observer.
    pub fn add_source(&self, source: Weak<dyn Source>) {
        if let Some(observer) = self.upgrade() {
            observer.add_source(source);
        }
    }

    /// Forward a change notification to the observer.
    pub fn notify(&self) {
        if let Some(observer) = self.upgrade() {
            observer.notify();
        }
    }
}

impl PartialEq for ObserverHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ObserverHandle {}

impl Hash for ObserverHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverHandle")
            .field("id", &self.id)
            .field("alive", &(self.observer.strong_count() > 0))
            .finish()
    }
}

/// The observers of one source, in the order they first subscribed.
///
/// Notification always iterates over a snapshot, so an observer may dispose
/// itself or subscribe elsewhere while the cascade is running.
#[derive(Default)]
pub(crate) struct ObserverSet {
    observers: Mutex<IndexSet<ObserverHandle>>,
}

impl ObserverSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register the current observer, if any, against `source`.
    ///
    /// The source is only appended to the observer's list when the edge is
    /// new, so repeated reads within one evaluation add a single edge.
    pub(crate) fn track(&self, source: impl FnOnce() -> Weak<dyn Source>) {
        let Some(observer) = ReactiveContext::current_observer() else {
            return;
        };
        let inserted = self.observers.lock().insert(observer.clone());
        if inserted {
            observer.add_source(source());
        }
    }

    pub(crate) fn remove(&self, observer: &ObserverHandle) {
        self.observers.lock().shift_remove(observer);
    }

    pub(crate) fn snapshot(&self) -> SmallVec<[ObserverHandle; 4]> {
        self.observers.lock().iter().cloned().collect()
    }

    /// Notify every observer registered at the time of the call.
    pub(crate) fn notify_all(&self) {
        let observers = self.snapshot();
        if !observers.is_empty() {
            trace!(count = observers.len(), "notifying observers");
        }
        for observer in observers {
            observer.notify();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.lock().len()
    }
}

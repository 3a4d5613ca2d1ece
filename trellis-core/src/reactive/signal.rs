//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (computed/effect), the
//!    signal registers that context as an observer, and the observer records
//!    the signal as one of its sources.
//!
//! 2. When a signal is set to a value different from the current one, every
//!    registered observer is notified, in the order they subscribed.
//!
//! 3. Setting an equal value does nothing at all.
//!
//! # Memory Layout
//!
//! A `Signal<T>` is a cheap handle around shared state:
//! - The value, behind a `RwLock`
//! - The observer set (weak handles only, so it never keeps a
//!   computation alive)

use std::fmt::Debug;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::trace;

use super::observer::{ObserverHandle, ObserverSet, Source};

/// A reactive signal holding a value of type T.
///
/// # Type Parameters
///
/// - `T`: The type of value stored in the signal. `PartialEq` decides
///   whether a write is a change.
///
/// # Example
///
/// ```rust
/// use trellis_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// assert_eq!(count.get(), 0);
///
/// count.set(5);
/// count.update(|n| n + 1);
/// assert_eq!(count.get(), 6);
/// ```
pub struct Signal<T>
where
    T: PartialEq + Clone + Send + Sync + 'static,
{
    inner: Arc<SignalInner<T>>,
}

struct SignalInner<T> {
    value: RwLock<T>,
    observers: ObserverSet,
}

impl<T> Source for SignalInner<T>
where
    T: Send + Sync,
{
    fn remove_observer(&self, observer: &ObserverHandle) {
        self.observers.remove(observer);
    }
}

impl<T> Signal<T>
where
    T: PartialEq + Clone + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                value: RwLock::new(value),
                observers: ObserverSet::new(),
            }),
        }
    }

    /// Get the current value.
    ///
    /// If called within a reactive context, this also registers the
    /// current computation as an observer.
    pub fn get(&self) -> T {
        self.inner.observers.track(|| self.as_source());
        self.inner.value.read().clone()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Borrow the current value without tracking dependencies or cloning.
    ///
    /// The signal is locked for reading while `f` runs, so `f` must not
    /// write to this signal.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Set a new value and notify observers if it differs from the
    /// current one.
    pub fn set(&self, value: T) {
        {
            let mut guard = self.inner.value.write();
            if *guard == value {
                trace!("signal write unchanged");
                return;
            }
            *guard = value;
        }

        trace!(observers = self.inner.observers.len(), "signal changed");
        self.inner.observers.notify_all();
    }

    /// Update the value using a function of the previous value.
    ///
    /// The previous value is read without registering the caller as a
    /// dependent.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let new_value = {
            let current = self.get_untracked();
            f(&current)
        };
        self.set(new_value);
    }

    /// Get the number of observers currently depending on this signal.
    pub fn observer_count(&self) -> usize {
        self.inner.observers.len()
    }

    fn as_source(&self) -> Weak<dyn Source> {
        let weak: Weak<SignalInner<T>> = Arc::downgrade(&self.inner);
        weak
    }
}

impl<T> Clone for Signal<T>
where
    T: PartialEq + Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: PartialEq + Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("value", &*self.inner.value.read())
            .field("observer_count", &self.observer_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

//! Observed Adapters
//!
//! Bridges reactive values to code that does not run inside the reactive
//! graph, such as an async UI task waiting for "something changed".
//!
//! Each adapter owns an effect that reads the wrapped value and bumps a
//! revision counter on a `tokio::sync::watch` channel every time it runs.
//! Receivers can `await` the next change without polling the graph.
//! Dropping the adapter disposes the effect.

use std::fmt::Debug;
use std::sync::Arc;

use tokio::sync::watch;

use crate::reactive::{Computed, Effect, Signal};

/// Revision counter published by the adapters.
///
/// Starts at 1: the watching effect runs once on creation.
pub type Revision = u64;

fn watch_with<F>(read: F) -> (Arc<watch::Sender<Revision>>, Effect)
where
    F: Fn() + Send + Sync + 'static,
{
    let (changes, _) = watch::channel(0);
    let changes = Arc::new(changes);
    let effect = {
        let changes = changes.clone();
        Effect::new(move || {
            read();
            changes.send_modify(|revision| *revision += 1);
        })
    };
    (changes, effect)
}

/// A signal whose changes are republished on a watch channel.
pub struct ObservedSignal<T>
where
    T: PartialEq + Clone + Send + Sync + 'static,
{
    signal: Signal<T>,
    changes: Arc<watch::Sender<Revision>>,
    watch: Effect,
}

impl<T> ObservedSignal<T>
where
    T: PartialEq + Clone + Send + Sync + 'static,
{
    pub fn new(signal: Signal<T>) -> Self {
        let (changes, watch) = {
            let signal = signal.clone();
            watch_with(move || {
                signal.get();
            })
        };
        Self {
            signal,
            changes,
            watch,
        }
    }

    /// The wrapped signal.
    pub fn signal(&self) -> &Signal<T> {
        &self.signal
    }

    /// Read the wrapped signal (tracked, like [`Signal::get`]).
    pub fn get(&self) -> T {
        self.signal.get()
    }

    /// Receiver that wakes up on every later change.
    pub fn subscribe(&self) -> watch::Receiver<Revision> {
        self.changes.subscribe()
    }

    /// Number of times the change has been published, creation included.
    pub fn revision(&self) -> Revision {
        *self.changes.borrow()
    }
}

impl<T> Drop for ObservedSignal<T>
where
    T: PartialEq + Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.watch.dispose();
    }
}

impl<T> Debug for ObservedSignal<T>
where
    T: PartialEq + Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservedSignal")
            .field("signal", &self.signal)
            .field("revision", &self.revision())
            .finish()
    }
}

/// A computed value whose changes are republished on a watch channel.
///
/// The watching effect reads the computed, so it is recomputed eagerly
/// whenever one of its dependencies changes.
pub struct ObservedComputed<T>
where
    T: PartialEq + Clone + Send + Sync + 'static,
{
    computed: Computed<T>,
    changes: Arc<watch::Sender<Revision>>,
    watch: Effect,
}

impl<T> ObservedComputed<T>
where
    T: PartialEq + Clone + Send + Sync + 'static,
{
    /// Create the computed from `f` and start observing it.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::from_computed(Computed::new(f))
    }

    /// Observe an existing computed.
    pub fn from_computed(computed: Computed<T>) -> Self {
        let (changes, watch) = {
            let computed = computed.clone();
            watch_with(move || {
                computed.get();
            })
        };
        Self {
            computed,
            changes,
            watch,
        }
    }

    pub fn computed(&self) -> &Computed<T> {
        &self.computed
    }

    /// Read the wrapped computed (tracked, like [`Computed::get`]).
    pub fn get(&self) -> T {
        self.computed.get()
    }

    /// Receiver that wakes up on every later change.
    pub fn subscribe(&self) -> watch::Receiver<Revision> {
        self.changes.subscribe()
    }

    /// Number of times the change has been published, creation included.
    pub fn revision(&self) -> Revision {
        *self.changes.borrow()
    }
}

impl<T> Drop for ObservedComputed<T>
where
    T: PartialEq + Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.watch.dispose();
    }
}

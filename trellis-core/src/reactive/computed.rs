//! Computed Implementation
//!
//! A Computed is a cached derived value that re-evaluates only when it is
//! read after one of its dependencies changed.
//!
//! # How Computeds Work
//!
//! 1. On first access, the computed runs its function and caches the result.
//!
//! 2. When accessed again with no intervening change, the cache is returned
//!    and the function does not run.
//!
//! 3. When a dependency changes, the computed is marked stale and passes the
//!    notification on to its own dependents. It does not recompute yet.
//!
//! 4. On next access, it recomputes. If the result equals the cached value,
//!    the cache is kept and the version does not move.
//!
//! # Why This Matters
//!
//! This lazy approach avoids unnecessary recomputation:
//!
//! - A signal changes
//! - 10 computeds depend on it
//! - Only the computeds actually read will recompute
//! - Computeds that are never read stay stale (no wasted work)

use std::fmt::Debug;
use std::sync::Arc;

use super::computation::Computation;
use super::observer::ObserverId;
use crate::error::Result;

/// A cached derived value.
///
/// This is the getter handed out by [`create_computed`]. Clones share the
/// same node. Downstream computations hold only weak references to it, so
/// the node lives exactly as long as some `Computed` handle (or a closure
/// owning one) does.
///
/// # Type Parameters
///
/// - `T`: The type of the computed value. `PartialEq` decides whether a
///   recomputation actually changed the cached value.
pub struct Computed<T>
where
    T: PartialEq + Clone + Send + Sync + 'static,
{
    node: Arc<Computation<T>>,
}

/// Create a derived value from `f`.
///
/// `f` runs lazily on first read and again on the first read after any
/// value it read has changed.
///
/// ```rust
/// use trellis_core::reactive::{create_computed, Signal};
///
/// let count = Signal::new(2);
/// let doubled = create_computed({
///     let count = count.clone();
///     move || count.get() * 2
/// });
///
/// assert_eq!(doubled.get(), 4);
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub fn create_computed<T, F>(f: F) -> Computed<T>
where
    T: PartialEq + Clone + Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    Computed::new(f)
}

impl<T> Computed<T>
where
    T: PartialEq + Clone + Send + Sync + 'static,
{
    /// Create a new computed value.
    ///
    /// The function is not run immediately. It runs on first access.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            node: Computation::pure(f),
        }
    }

    /// Get the current value, recomputing if necessary.
    ///
    /// Inside a computed or effect, this also registers the caller as a
    /// dependent.
    ///
    /// # Panics
    ///
    /// Panics if the value is read while it is being computed, i.e. the
    /// function depends on itself. Use [`Computed::try_get`] to handle that
    /// case instead.
    pub fn get(&self) -> T {
        match self.node.read() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Get the current value, reporting a cyclic read as an error.
    pub fn try_get(&self) -> Result<T> {
        self.node.read()
    }

    /// Whether the next read will recompute.
    pub fn is_stale(&self) -> bool {
        self.node.is_stale()
    }

    /// Number of times the cached value has been replaced.
    ///
    /// A recomputation that produces an equal value leaves it unchanged.
    pub fn version(&self) -> u64 {
        self.node.version()
    }

    /// Number of times the function has run.
    pub fn run_count(&self) -> u64 {
        self.node.run_count()
    }

    /// Identity of the underlying node.
    pub fn id(&self) -> ObserverId {
        self.node.id()
    }

    /// Number of computeds and effects currently depending on this one.
    pub fn observer_count(&self) -> usize {
        self.node.observer_count()
    }

    /// Number of signals and computeds read by the last evaluation.
    pub fn source_count(&self) -> usize {
        self.node.source_count()
    }
}

impl<T> Clone for Computed<T>
where
    T: PartialEq + Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
        }
    }
}

impl<T> Debug for Computed<T>
where
    T: PartialEq + Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.id())
            .field("stale", &self.is_stale())
            .field("version", &self.version())
            .field("observer_count", &self.observer_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReactiveError;
    use crate::reactive::Signal;
    use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Barrier;
use std::thread;

    #[test]
    fn computed_computes_on_first_access() {
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let computed = Computed::new(move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
            42
        });

        // Not computed yet
        assert!(computed.is_stale());
        assert_eq!(call_count.load(Ordering::SeqCst), 0);

        // First access triggers computation
        assert_eq!(computed.get(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(!computed.is_stale());
    }

    #[test]
    fn computed_caches_value_when_fresh() {
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let computed = Computed::new(move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
            42
        });

        assert_eq!(computed.get(), 42);
        assert_eq!(computed.get(), 42);
        assert_eq!(computed.get(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert_eq!(computed.run_count(), 1);
    }

    #[test]
    fn computed_recomputes_after_dependency_changes() {
        let signal = Signal::new(3);
        let computed = {
            let signal = signal.clone();
            Computed::new(move || signal.get() * 2)
        };

        assert_eq!(computed.get(), 6);
        assert_eq!(signal.observer_count(), 1);

        signal.set(5);
        // Marked stale, not recomputed yet.
        assert!(computed.is_stale());
        assert_eq!(computed.run_count(), 1);

        assert_eq!(computed.get(), 10);
        assert_eq!(computed.run_count(), 2);
    }

    #[test]
    fn equal_result_keeps_version() {
        let signal = Signal::new(4);
        let parity = {
            let signal = signal.clone();
            Computed::new(move || signal.get() % 2)
        };

        assert_eq!(parity.get(), 0);
        assert_eq!(parity.version(), 1);

        signal.set(6);
        assert_eq!(parity.get(), 0);
        assert_eq!(parity.run_count(), 2);
        assert_eq!(parity.version(), 1);

        signal.set(7);
        assert_eq!(parity.get(), 1);
        assert_eq!(parity.version(), 2);
    }

    #[test]
    fn computed_depends_on_computed() {
        let base = Signal::new(5);
        let doubled = {
            let base = base.clone();
            Computed::new(move || base.get() * 2)
        };
        let plus_ten = {
            let doubled = doubled.clone();
            Computed::new(move || doubled.get() + 10)
        };

        assert_eq!(plus_ten.get(), 20);
        assert_eq!(doubled.observer_count(), 1);

        base.set(10);
        assert!(doubled.is_stale());
        assert!(plus_ten.is_stale());

        assert_eq!(plus_ten.get(), 30);
        assert_eq!(doubled.get(), 20);
    }

    #[test]
    fn computed_clone_shares_state() {
        let computed1 = Computed::new(|| 42);
        assert_eq!(computed1.get(), 42);

        let computed2 = computed1.clone();

        assert_eq!(computed1.id(), computed2.id());
        assert!(!computed2.is_stale());
        assert_eq!(computed2.get(), 42);
        assert_eq!(computed2.run_count(), 1);
    }

    #[test]
    fn dropping_computed_detaches_from_sources() {
        let signal = Signal::new(1);
        let computed = {
            let signal = signal.clone();
            Computed::new(move || signal.get())
        };

        computed.get();
        assert_eq!(signal.observer_count(), 1);

        drop(computed);
        assert_eq!(signal.observer_count(), 0);
    }

    #[test]
    fn cyclic_read_is_reported() {
        let slot: Arc<parking_lot::Mutex<Option<Computed<i32>>>> = Arc::default();
        let observed = Arc::new(parking_lot::Mutex::new(None));

        let computed = {
            let slot = slot.clone();
            let observed = observed.clone();
            Computed::new(move || {
                let inner = slot.lock().clone();
                if let Some(me) = inner {
                    *observed.lock() = Some(me.try_get());
                }
                1
            })
        };
        *slot.lock() = Some(computed.clone());

        assert_eq!(computed.get(), 1);
        assert_eq!(
            *observed.lock(),
            Some(Err(ReactiveError::Cycle { node: computed.id() }))
        );

        // The thread left the evaluating set: the node is readable again.
        assert_eq!(computed.try_get(), Ok(1));

        // Break the self-reference so the node can be dropped.
        slot.lock().take();
    }

    #[test]
    fn read_from_another_thread_during_evaluation_is_not_a_cycle() {
        let entered = Arc::new(Barrier::new(2));
        let resume = Arc::new(Barrier::new(2));
        let first_run = Arc::new(AtomicBool::new(true));

        let computed = {
            let entered = entered.clone();
            let resume = resume.clone();
            let first_run = first_run.clone();
            Computed::new(move || {
                if first_run.swap(false, Ordering::SeqCst) {
                    entered.wait();
                    resume.wait();
                }
                7
            })
        };

        let evaluating = {
            let computed = computed.clone();
            thread::spawn(move || computed.get())
        };

        entered.wait();
        assert_eq!(computed.try_get(), Ok(7));
        resume.wait();

        assert_eq!(evaluating.join().unwrap(), 7);
        assert_eq!(computed.try_get(), Ok(7));
    }
}

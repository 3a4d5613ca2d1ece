//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency changes, the effect re-runs synchronously, before
//!    the write that triggered it returns.
//!
//! 3. Before re-running, the effect drops its old dependencies and tracks
//!    new ones during execution.
//!
//! # Cleanup
//!
//! The function may return a cleanup. It is called before the effect
//! re-runs and when the effect is disposed, never on creation. This is
//! useful for cleaning up resources like event listeners or timers.
//!
//! # Lifetime
//!
//! Signals and computeds only hold weak references to the effects reading
//! them. The [`Effect`] handle is what keeps an effect alive: dropping the
//! last clone tears it down exactly like [`Effect::dispose`].

use std::sync::Arc;

use super::computation::{Cleanup, Computation};
use super::observer::ObserverId;

/// Handle to a running effect, used to dispose it.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicI32, Ordering};
/// use trellis_core::reactive::{Effect, Signal};
///
/// let count = Signal::new(0);
/// let seen = Arc::new(AtomicI32::new(-1));
///
/// let effect = Effect::new({
///     let count = count.clone();
///     let seen = seen.clone();
///     move || seen.store(count.get(), Ordering::SeqCst)
/// });
/// assert_eq!(seen.load(Ordering::SeqCst), 0);
///
/// count.set(5);
/// assert_eq!(seen.load(Ordering::SeqCst), 5);
///
/// effect.dispose();
/// count.set(6);
/// assert_eq!(seen.load(Ordering::SeqCst), 5);
/// ```
#[must_use = "dropping the handle disposes the effect"]
#[derive(Clone)]
pub struct Effect {
    node: Arc<Computation<()>>,
}

/// Create an effect whose function may return a [`Cleanup`].
///
/// The function runs once before this returns, then again every time
/// something it read changes.
pub fn create_effect<F>(f: F) -> Effect
where
    F: Fn() -> Option<Cleanup> + Send + Sync + 'static,
{
    Effect::with_cleanup(f)
}

impl Effect {
    /// Create an effect with no cleanup.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_cleanup(move || {
            f();
            None
        })
    }

    /// Create an effect whose function may return a [`Cleanup`].
    pub fn with_cleanup<F>(f: F) -> Self
    where
        F: Fn() -> Option<Cleanup> + Send + Sync + 'static,
    {
        Self {
            node: Computation::impure(f),
        }
    }

    /// Dispose of the effect.
    ///
    /// Detaches it from everything it reads and runs the pending cleanup.
    /// Later calls do nothing. May be called from inside the effect's own
    /// function or cleanup.
    pub fn dispose(&self) {
        self.node.dispose();
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.node.is_disposed()
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> u64 {
        self.node.run_count()
    }

    /// Get the number of signals and computeds read by the last run.
    pub fn dependency_count(&self) -> usize {
        self.node.source_count()
    }

    /// Identity of the underlying node.
    pub fn id(&self) -> ObserverId {
        self.node.id()
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

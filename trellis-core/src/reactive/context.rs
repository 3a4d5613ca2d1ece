//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a signal is read,
//! we can register the current computation as a dependent.
//!
//! # Implementation
//!
//! Each thread owns a single slot holding the handle of the observer being
//! evaluated. Entering a context swaps the new handle into the slot and
//! remembers the one it replaced; dropping the guard puts the remembered
//! handle back. Nested evaluations (a computation reading another
//! computation) therefore unwind like a call stack.
//!
//! Restoration happens in `Drop`, so the slot is repaired even when the
//! evaluation panics.

use std::cell::RefCell;

use super::observer::{ObserverHandle, ObserverId};

thread_local! {
    static CURRENT_OBSERVER: RefCell<Option<ObserverHandle>> = const { RefCell::new(None) };
}

/// Guard that restores the previous observer when dropped.
///
/// Hold it for exactly the duration of an evaluation:
///
/// ```rust,ignore
/// let _ctx = ReactiveContext::enter(handle);
/// run_user_code();
/// // previous observer restored here, also on unwind
/// ```
#[must_use = "the context is exited as soon as the guard is dropped"]
pub struct ReactiveContext {
    observer_id: Option<ObserverId>,
    previous: Option<ObserverHandle>,
}

impl ReactiveContext {
    /// Make `observer` the current observer on this thread.
    ///
    /// While the guard is alive, every signal or computation read registers
    /// `observer` as a dependent.
    pub fn enter(observer: ObserverHandle) -> Self {
        let observer_id = Some(observer.id());
        let previous = CURRENT_OBSERVER.with(|slot| slot.replace(Some(observer)));
        Self {
            observer_id,
            previous,
        }
    }

    /// Clear the current observer until the guard is dropped.
    ///
    /// Reads performed meanwhile are not tracked.
    pub fn suspend() -> Self {
        let previous = CURRENT_OBSERVER.with(|slot| slot.replace(None));
        Self {
            observer_id: None,
            previous,
        }
    }

    /// Check if there is an active reactive context.
    pub fn is_active() -> bool {
        CURRENT_OBSERVER.with(|slot| slot.borrow().is_some())
    }

    /// Get the handle of the current observer, if any.
    pub fn current_observer() -> Option<ObserverHandle> {
        CURRENT_OBSERVER.with(|slot| slot.borrow().clone())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_OBSERVER.with(|slot| {
            let popped = slot.replace(previous);

            // Guards must be dropped in reverse order of creation.
            debug_assert_eq!(
                popped.as_ref().map(ObserverHandle::id),
                self.observer_id,
                "ReactiveContext mismatch: expected {:?}, got {:?}",
                self.observer_id,
                popped.as_ref().map(ObserverHandle::id),
            );
        });
    }
}

/// Run `f` with dependency tracking switched off.
///
/// Useful inside a computation for reading a value the computation should
/// not re-run for.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::suspend();
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::observer::{Observer, Source};
    use std::sync::{Arc, Weak};

    struct Inert;

    impl Observer for Inert {
        fn add_source(&self, _source: Weak<dyn Source>) {}
        fn notify(&self) {}
    }

    fn handle() -> ObserverHandle {
        let observer: Arc<dyn Observer> = Arc::new(Inert);
        ObserverHandle::new(ObserverId::new(), Arc::downgrade(&observer))
    }

    #[test]
    fn context_tracks_observer() {
        let h = handle();

        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_observer().is_none());

        {
            let _ctx = ReactiveContext::enter(h.clone());

            assert!(ReactiveContext::is_active());
            assert_eq!(ReactiveContext::current_observer(), Some(h.clone()));
        }

        // Context should be cleaned up after drop
        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_observer().is_none());
    }

    #[test]
    fn nested_contexts() {
        let h1 = handle();
        let h2 = handle();

        {
            let _ctx1 = ReactiveContext::enter(h1.clone());
            assert_eq!(ReactiveContext::current_observer(), Some(h1.clone()));

            {
                let _ctx2 = ReactiveContext::enter(h2.clone());
                assert_eq!(ReactiveContext::current_observer(), Some(h2));
            }

            // After inner context drops, outer should be current
            assert_eq!(ReactiveContext::current_observer(), Some(h1));
        }

        assert!(ReactiveContext::current_observer().is_none());
    }

    #[test]
    fn untracked_clears_and_restores() {
        let h = handle();
        let _ctx = ReactiveContext::enter(h.clone());

        let inside = untracked(ReactiveContext::current_observer);
        assert!(inside.is_none());

        assert_eq!(ReactiveContext::current_observer(), Some(h));
    }

    #[test]
    fn context_restored_after_panic() {
        let outer = handle();
        let _ctx = ReactiveContext::enter(outer.clone());

        let result = std::panic::catch_unwind(|| {
            let _inner = ReactiveContext::enter(handle());
            panic!("evaluation failed");
        });

        assert!(result.is_err());
        assert_eq!(ReactiveContext::current_observer(), Some(outer));
    }

    #[test]
    fn slot_is_per_thread() {
        let _ctx = ReactiveContext::enter(handle());

        let seen_elsewhere = std::thread::spawn(ReactiveContext::is_active)
            .join()
            .unwrap();

        assert!(!seen_elsewhere);
        assert!(ReactiveContext::is_active());
    }
}

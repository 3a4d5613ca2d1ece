//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, computeds, and
//! effects.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (such as a computed or effect), the signal
//! automatically registers that context as a dependent. When the signal's
//! value changes, all dependents are notified.
//!
//! ## Computeds
//!
//! A Computed is a derived value that caches its result. It is marked stale
//! when one of its dependencies changes and re-evaluates on the next read.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that re-runs as soon as any of
//! its dependencies change. Effects synchronize reactive state with the
//! outside world.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local tracking context to detect
//! dependencies automatically. When a signal or computed is read, it checks
//! whether a computation is currently evaluating and, if so, links the two.
//!
//! Dependencies are rebuilt on every evaluation, so a branch that was not
//! taken does not subscribe. Edges are weak in both directions: the graph
//! never keeps a node alive on its own.
//!
//! A write propagates synchronously and depth-first. Every node reachable
//! from the written signal is notified, whether or not the intermediate
//! values end up changing.

mod computation;
mod computed;
mod context;
mod effect;
mod observer;
mod signal;

pub use computation::Cleanup;
pub use computed::{create_computed, Computed};
pub use context::{untracked, ReactiveContext};
pub use effect::{create_effect, Effect};
pub use observer::{Observer, ObserverHandle, ObserverId, Source};
pub use signal::Signal;

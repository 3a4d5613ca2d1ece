//! Trellis Core
//!
//! This crate provides the fine-grained reactive core of Trellis.
//! It implements:
//!
//! - Reactive primitives (signals, computeds, effects)
//! - Automatic, dynamically rebuilt dependency tracking
//! - Lazy recomputation for derived values, eager re-runs for effects
//! - Adapters that republish changes on a `tokio` watch channel
//!
//! # Architecture
//!
//! The crate is organized into a few modules:
//!
//! - `reactive`: Core reactive primitives and dependency tracking
//! - `observed`: Change notification for code outside the graph
//!   (enabled by the `observed` feature)
//! - `error`: The error type for detectable misuse
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI32, Ordering};
//! use trellis_core::reactive::{create_computed, Effect, Signal};
//!
//! // Create a signal
//! let count = Signal::new(0);
//!
//! // Create a derived value
//! let doubled = create_computed({
//!     let count = count.clone();
//!     move || count.get() * 2
//! });
//!
//! // Create an effect
//! let last_seen = Arc::new(AtomicI32::new(0));
//! let _effect = Effect::new({
//!     let doubled = doubled.clone();
//!     let last_seen = last_seen.clone();
//!     move || last_seen.store(doubled.get(), Ordering::SeqCst)
//! });
//!
//! // Update the signal
//! count.set(5);
//! // Effect ran synchronously
//! assert_eq!(last_seen.load(Ordering::SeqCst), 10);
//! ```

pub mod error;
#[cfg(feature = "observed")]
pub mod observed;
pub mod reactive;

pub use error::{ReactiveError, Result};

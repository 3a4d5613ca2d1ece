//! Errors reported by the reactive core.
//!
//! Almost every operation is total. The one misuse the graph can detect at
//! runtime is a computation that ends up reading itself.

use thiserror::Error;

use crate::reactive::ObserverId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// A computed value was read while it was still evaluating on this
    /// thread, i.e. its function depends on itself.
    #[error("cyclic read of computation {node} during its own evaluation")]
    Cycle { node: ObserverId },
}

pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;

//! Error types for voltlab-solver.
//!
//! These surface at internal seams only; at the tick boundary every
//! failure degrades to zeroed computed values instead of propagating.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("singular matrix")]
    SingularMatrix,

    #[error("invalid matrix dimensions: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

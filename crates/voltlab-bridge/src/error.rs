//! Error types for voltlab-bridge.
//!
//! Simulator rejections surface here so the worker can log them; nothing
//! in this crate propagates an error back into the tick loop.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("controller simulator rejected pin update: {0}")]
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, Error>;

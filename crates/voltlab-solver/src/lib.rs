//! Per-tick electrical solver for VoltLab.
//!
//! Given one snapshot's elements and the net map from the topology
//! resolver, computes steady-state voltage, current, and power for every
//! element at the current instant. Disconnected subcircuits are solved
//! independently; a subcircuit without a source yields zeros for that
//! subcircuit only, and no condition in here ever aborts a tick.

pub mod error;
pub mod linear;
pub mod solution;
pub mod tick;

pub use error::{Error, Result};
pub use solution::Solution;
pub use tick::{solve_elements, solve_on};

//! Device models for VoltLab.
//!
//! Each element kind maps to a [`Device`] that knows how to stamp itself
//! into the MNA system for the current instant, plus a behavior pass that
//! evolves time-dependent runtime state (LED heating and failure, motor
//! spin-up) from the freshly solved electrical quantities.

pub mod led;
pub mod motor;
pub mod passive;
pub mod sources;
pub mod stamp;

pub use stamp::{Device, Stamp};

use voltlab_core::{Element, ElementKind, Runtime};

/// Evolve one element's runtime state by `dt` seconds at monotonic time
/// `now`, reading the element's freshly solved computed bag.
///
/// Non-time-evolving kinds pass their runtime through unchanged (the
/// supply's regulated/limited mode is written by the electrical solver,
/// not here).
pub fn advance_runtime(element: &Element, dt: f64, now: f64) -> Runtime {
    match element.kind {
        ElementKind::Led => led::advance(&element.id, &element.runtime, &element.computed, dt, now),
        ElementKind::Motor => motor::advance(&element.runtime, &element.computed, dt),
        _ => element.runtime.clone(),
    }
}

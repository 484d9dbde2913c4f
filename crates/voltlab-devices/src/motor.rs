//! DC motor behavior: explicit first-order inertia integration.
//!
//! The winding itself is a plain resistive stamp (see
//! [`crate::stamp::Device::from_element`]); this module evolves shaft
//! speed from the solved winding current.

use voltlab_core::{Computed, Runtime};

/// Default winding resistance in ohms.
pub const WINDING_RESISTANCE: f64 = 12.0;

/// Torque constant, N·m per ampere.
pub const TORQUE_CONSTANT: f64 = 0.02;

/// Viscous damping, N·m·s.
pub const DAMPING: f64 = 5e-5;

/// Rotor inertia, kg·m².
pub const INERTIA: f64 = 2e-4;

/// Shaft speed hard clamp, rad/s.
pub const OMEGA_MAX: f64 = 500.0;

/// Integrate one tick: `ω += (i·Kt − c·ω)/J · dt`, clamped to
/// ±[`OMEGA_MAX`].
pub fn advance(prev: &Runtime, computed: &Computed, dt: f64) -> Runtime {
    let omega = match prev {
        Runtime::Motor { omega, .. } => *omega,
        _ => 0.0,
    };

    let torque = computed.current * TORQUE_CONSTANT - DAMPING * omega;
    let omega = (omega + torque / INERTIA * dt).clamp(-OMEGA_MAX, OMEGA_MAX);

    Runtime::Motor {
        omega,
        rpm: omega * 60.0 / std::f64::consts::TAU,
    }
}

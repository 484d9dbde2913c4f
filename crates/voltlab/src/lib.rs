//! VoltLab: the simulation core of an interactive circuit-design tool.
//!
//! The editing layer hands over a snapshot (elements plus wires) each
//! animation tick; this crate resolves the wire graph into electrical
//! nets, solves every connected subcircuit by modified nodal analysis,
//! evolves time-dependent device state (LED heating and failure, motor
//! spin-up), and forwards controller pin levels to registered embedded
//! simulators.
//!
//! ```
//! use voltlab::{solve, Element, ElementKind, Node, Wire};
//!
//! let mut battery = Element::new(
//!     "v1",
//!     ElementKind::Battery,
//!     vec![Node::new("v1.pos", "v1"), Node::new("v1.neg", "v1")],
//! );
//! battery.properties.voltage = Some(9.0);
//! let mut resistor = Element::new(
//!     "r1",
//!     ElementKind::Resistor,
//!     vec![Node::new("r1.a", "r1"), Node::new("r1.b", "r1")],
//! );
//! resistor.properties.resistance = Some(1000.0);
//!
//! let wires = vec![
//!     Wire::new("w1", "v1.pos", "r1.a"),
//!     Wire::new("w2", "r1.b", "v1.neg"),
//! ];
//! let solved = solve(&[battery, resistor], &wires);
//! assert!((solved[1].computed.current - 0.009).abs() < 1e-9);
//! ```

pub mod engine;

pub use engine::{solve, solve_with_time, Engine};

pub use voltlab_core::{
    Computed, Element, ElementKind, LedColor, LedVisual, MeterMode, NetId, NetMap, Node,
    Properties, Runtime, SwitchPosition, Wire,
};

pub use voltlab_bridge::{ControllerSimulator, PinKind, PinLevel};

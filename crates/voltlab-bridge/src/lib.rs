//! Controller pin bridge.
//!
//! Connects the electrical world to embedded controller simulators: after
//! each tick, every pin-labeled controller node is mapped to a logic level
//! and forwarded to the simulator registered for that controller. Delivery
//! is fire-and-forget on a background worker so a slow or broken simulator
//! can never stall the tick loop.

pub mod error;
pub mod levels;
pub mod worker;

pub use error::{Error, Result};
pub use levels::{pin_levels, pins_low, PinKind, PinLevel, DIGITAL_THRESHOLD, PIN_HIGH_VOLTAGE};
pub use worker::{ControllerSimulator, PinBridge};

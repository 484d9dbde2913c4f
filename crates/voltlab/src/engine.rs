//! Tick entry points and the engine.
//!
//! A tick is synchronous and self-contained: every per-tick structure is
//! rebuilt from the snapshot, so two engines (or two calls into one) never
//! share mutable state. Only the pin bridge carries anything across ticks,
//! and it only ever receives messages.

use std::sync::Arc;

use tracing::trace;

use voltlab_bridge::{pin_levels, pins_low, ControllerSimulator, PinBridge};
use voltlab_core::{Computed, Element, NetMap, Runtime, Wire};
use voltlab_devices::advance_runtime;

/// Solve the snapshot's electrical state at the current instant.
///
/// Pure: no time passes, runtime bags are carried through untouched apart
/// from the supply regulation mode the solver derives.
pub fn solve(elements: &[Element], wires: &[Wire]) -> Vec<Element> {
    voltlab_solver::solve_elements(elements, wires)
}

/// Solve the snapshot, then evolve time-dependent device state by `dt`
/// seconds at monotonic time `now`.
///
/// `dt = 0` makes the behavior pass a no-op on thermal and mechanical
/// state, so repeated calls at the same instant are idempotent.
pub fn solve_with_time(elements: &[Element], wires: &[Wire], dt: f64, now: f64) -> Vec<Element> {
    let nets = NetMap::build(elements, wires);
    solve_and_advance(elements, &nets, dt, now)
}

fn solve_and_advance(elements: &[Element], nets: &NetMap, dt: f64, now: f64) -> Vec<Element> {
    let mut out = voltlab_solver::solve_on(elements, nets);
    for element in &mut out {
        element.runtime = advance_runtime(element, dt, now);
    }
    out
}

/// Owns the controller bridge across ticks.
///
/// The engine itself is stateless with respect to the circuit: it can be
/// handed a different snapshot every tick.
pub struct Engine {
    bridge: PinBridge,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            bridge: PinBridge::new(),
        }
    }

    /// Attach a controller simulator to the element with this id. Pin
    /// updates for unregistered controllers are dropped.
    pub fn register_controller(&self, element_id: &str, simulator: Arc<dyn ControllerSimulator>) {
        self.bridge.register(element_id, simulator);
    }

    pub fn deregister_controller(&self, element_id: &str) {
        self.bridge.deregister(element_id);
    }

    /// Run one full tick: electrical solve, behavior pass, pin delivery.
    pub fn tick(&self, elements: &[Element], wires: &[Wire], dt: f64, now: f64) -> Vec<Element> {
        let nets = NetMap::build(elements, wires);
        let out = solve_and_advance(elements, &nets, dt, now);
        let levels = pin_levels(&out, &nets);
        trace!(pins = levels.len(), "tick complete");
        self.bridge.notify(&levels);
        out
    }

    /// Stop-simulation semantics: wipe all computed and runtime state
    /// (exploded LEDs come back, motors stop, supplies forget limiting)
    /// and drive every registered controller pin low.
    pub fn reset(&self, elements: &[Element]) -> Vec<Element> {
        self.bridge.notify(&pins_low(elements));
        elements
            .iter()
            .map(|element| {
                let mut out = element.clone();
                out.computed = Computed::default();
                out.runtime = Runtime::default();
                out
            })
            .collect()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

//! Pin level derivation.
//!
//! A controller pin reads its level from the labeled anchors on its net,
//! not from the solved voltages: a pin wired (possibly through a closed
//! switch) to a `3V` node reads high, one wired to `GND` or left floating
//! reads low. The scan is a pure function of the snapshot and the net map,
//! so it needs no solver state.

use std::collections::HashMap;

use voltlab_core::{Element, ElementKind, NetMap};

/// Level reported for a pin anchored to the supply rail.
pub const PIN_HIGH_VOLTAGE: f64 = 3.3;

/// Levels at or above this read as digital 1.
pub const DIGITAL_THRESHOLD: f64 = 1.65;

/// How a forwarded pin value should be interpreted by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinKind {
    Digital,
    Analog,
}

/// Resolved level of one controller pin for the current tick.
#[derive(Debug, Clone, PartialEq)]
pub struct PinLevel {
    pub controller_id: String,
    pub pin: String,
    pub volts: f64,
    pub digital: bool,
}

impl PinLevel {
    fn new(controller_id: &str, pin: &str, volts: f64) -> Self {
        Self {
            controller_id: controller_id.to_owned(),
            pin: pin.to_owned(),
            volts,
            digital: volts >= DIGITAL_THRESHOLD,
        }
    }
}

fn is_power_label(label: &str) -> bool {
    matches!(label, "3V" | "3.3V" | "GND")
}

/// Derive the level of every pin-labeled node of every controller.
///
/// A pin is any placeholder-labeled controller node that is not a power
/// pin. Its net is scanned for anchors: a `3V`/`3.3V` member wins over a
/// `GND` member; a net with neither (or a pin outside the snapshot's nets)
/// floats and reads low.
pub fn pin_levels(elements: &[Element], nets: &NetMap) -> Vec<PinLevel> {
    let mut label_of_node: HashMap<&str, &str> = HashMap::new();
    for element in elements {
        for node in &element.nodes {
            if let Some(label) = &node.placeholder {
                label_of_node.insert(node.id.as_str(), label.as_str());
            }
        }
    }

    let mut out = Vec::new();
    for element in elements {
        if element.kind != ElementKind::Controller {
            continue;
        }
        for node in &element.nodes {
            let Some(label) = &node.placeholder else {
                continue;
            };
            if is_power_label(label) {
                continue;
            }
            // A rail anchor wins over a ground anchor; grounded and
            // floating nets both read low.
            let volts = match nets.net_of(&node.id) {
                Some(net) => {
                    let high = nets.members(net).any(|member| {
                        matches!(label_of_node.get(member).copied(), Some("3V") | Some("3.3V"))
                    });
                    if high { PIN_HIGH_VOLTAGE } else { 0.0 }
                }
                None => 0.0,
            };
            out.push(PinLevel::new(&element.id, label, volts));
        }
    }
    out
}

/// All controller pins driven low, for the stop-simulation reset.
pub fn pins_low(elements: &[Element]) -> Vec<PinLevel> {
    let mut out = Vec::new();
    for element in elements {
        if element.kind != ElementKind::Controller {
            continue;
        }
        for node in &element.nodes {
            if let Some(label) = &node.placeholder {
                if !is_power_label(label) {
                    out.push(PinLevel::new(&element.id, label, 0.0));
                }
            }
        }
    }
    out
}

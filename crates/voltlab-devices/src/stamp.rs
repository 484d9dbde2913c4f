//! The [`Stamp`] trait and the element-to-device mapping.

use tracing::debug;

use voltlab_core::{Element, ElementKind, MeterMode, MnaSystem, NetId, NetIndexer, NetMap};

use crate::led::Led;
use crate::passive::{Ammeter, Potentiometer, Probe, Resistive};
use crate::sources::{Battery, Rail, Supply};

/// A device's contribution to the MNA system.
pub trait Stamp {
    /// Stamp this device. `branch` is the branch current variable assigned
    /// by the assembler, present iff [`Stamp::num_branches`] returned 1.
    fn stamp(&self, mna: &mut MnaSystem, nets: &NetIndexer, branch: Option<usize>);

    /// Branch current variables this device needs in its current state.
    fn num_branches(&self) -> usize {
        0
    }
}

/// Solver-facing device built from one element for one tick.
///
/// Nonlinear state (LED conduction assumption, supply limiting mode) lives
/// in public fields the solver flips between re-stamps.
#[derive(Debug)]
pub enum Device {
    Battery(Battery),
    Supply(Supply),
    Rail(Rail),
    Resistive(Resistive),
    Potentiometer(Potentiometer),
    Led(Led),
    Ammeter(Ammeter),
    Probe(Probe),
    /// No electrical stamp: displays, notes, switches (conduction is a
    /// topology concern), exploded LEDs, malformed elements.
    Inert,
}

impl Device {
    /// Map an element onto its device for this tick.
    ///
    /// Elements whose terminals cannot be resolved degrade to
    /// [`Device::Inert`] with a debug log; the solve continues without
    /// them.
    pub fn from_element(element: &Element, nets: &NetMap) -> Device {
        let net = |index: usize| -> Option<NetId> {
            element.node_id(index).and_then(|id| nets.net_of(id))
        };
        let pair = || -> Option<(NetId, NetId)> { Some((net(0)?, net(1)?)) };

        let device = match element.kind {
            ElementKind::Battery => pair().map(|(pos, neg)| {
                Device::Battery(Battery::from_properties(pos, neg, &element.properties))
            }),
            ElementKind::PowerSupply => pair().map(|(pos, neg)| {
                Device::Supply(Supply::from_properties(pos, neg, &element.properties))
            }),
            ElementKind::Controller => Rail::from_element(element, nets).map(Device::Rail),
            ElementKind::Resistor => pair().map(|(pos, neg)| {
                Device::Resistive(Resistive::new(
                    pos,
                    neg,
                    element
                        .properties
                        .resistance
                        .unwrap_or(crate::passive::DEFAULT_RESISTANCE),
                ))
            }),
            ElementKind::Photoresistor => pair().map(|(pos, neg)| {
                let resistance = element.properties.resistance.unwrap_or_else(|| {
                    crate::passive::photoresistor_resistance(
                        element.properties.value.unwrap_or(0.0),
                    )
                });
                Device::Resistive(Resistive::new(pos, neg, resistance))
            }),
            ElementKind::Motor => pair().map(|(pos, neg)| {
                Device::Resistive(Resistive::new(
                    pos,
                    neg,
                    element
                        .properties
                        .resistance
                        .unwrap_or(crate::motor::WINDING_RESISTANCE),
                ))
            }),
            ElementKind::Potentiometer => {
                let terminals = (net(0), net(1), net(2));
                if let (Some(a), Some(wiper), Some(b)) = terminals {
                    Some(Device::Potentiometer(Potentiometer::new(
                        a,
                        wiper,
                        b,
                        element
                            .properties
                            .resistance
                            .unwrap_or(crate::passive::DEFAULT_POT_RESISTANCE),
                        element.properties.ratio.unwrap_or(0.5),
                    )))
                } else {
                    None
                }
            }
            ElementKind::Led => {
                if element.runtime.is_exploded() {
                    // Terminal failure: the junction is gone.
                    Some(Device::Inert)
                } else {
                    pair().map(|(anode, cathode)| {
                        Device::Led(Led::new(
                            anode,
                            cathode,
                            element.properties.color.unwrap_or_default().forward_voltage(),
                        ))
                    })
                }
            }
            ElementKind::Multimeter => pair().map(|(pos, neg)| {
                match element.properties.mode.unwrap_or_default() {
                    MeterMode::Current => Device::Ammeter(Ammeter::new(pos, neg)),
                    mode @ (MeterMode::Voltage | MeterMode::Resistance) => {
                        Device::Probe(Probe::new(pos, neg, mode))
                    }
                }
            }),
            ElementKind::SlideSwitch
            | ElementKind::PushButton
            | ElementKind::Display
            | ElementKind::Note => Some(Device::Inert),
        };

        device.unwrap_or_else(|| {
            debug!(element = %element.id, kind = ?element.kind, "element with unresolvable terminals is inert this tick");
            Device::Inert
        })
    }

    /// Terminal nets this device electrically couples, for subcircuit
    /// partitioning. Probes deliberately couple nothing: an ideal
    /// voltmeter provides no current path.
    pub fn coupled_nets(&self) -> Vec<NetId> {
        match self {
            Device::Battery(d) => vec![d.pos, d.neg],
            Device::Supply(d) => vec![d.pos, d.neg],
            Device::Rail(d) => vec![d.pos, d.neg],
            Device::Resistive(d) => vec![d.pos, d.neg],
            Device::Potentiometer(d) => vec![d.a, d.wiper, d.b],
            Device::Led(d) => vec![d.anode, d.cathode],
            Device::Ammeter(d) => vec![d.pos, d.neg],
            Device::Probe(_) | Device::Inert => Vec::new(),
        }
    }

    /// Whether this device can drive a subcircuit.
    pub fn is_source(&self) -> bool {
        matches!(self, Device::Battery(_) | Device::Supply(_) | Device::Rail(_))
    }

    /// The source's terminals are in the same equivalence class (a wire
    /// bridges its rails).
    pub fn is_shorted_source(&self) -> bool {
        match self {
            Device::Battery(d) => d.pos == d.neg,
            Device::Supply(d) => d.pos == d.neg,
            Device::Rail(d) => d.pos == d.neg,
            _ => false,
        }
    }

    /// Negative terminal net of a source (reference-net fallback).
    pub fn source_negative(&self) -> Option<NetId> {
        match self {
            Device::Battery(d) => Some(d.neg),
            Device::Supply(d) => Some(d.neg),
            Device::Rail(d) => Some(d.neg),
            _ => None,
        }
    }
}

impl Stamp for Device {
    fn stamp(&self, mna: &mut MnaSystem, nets: &NetIndexer, branch: Option<usize>) {
        match self {
            Device::Battery(d) => d.stamp(mna, nets, branch),
            Device::Supply(d) => d.stamp(mna, nets, branch),
            Device::Rail(d) => d.stamp(mna, nets, branch),
            Device::Resistive(d) => d.stamp(mna, nets, branch),
            Device::Potentiometer(d) => d.stamp(mna, nets, branch),
            Device::Led(d) => d.stamp(mna, nets, branch),
            Device::Ammeter(d) => d.stamp(mna, nets, branch),
            Device::Probe(_) | Device::Inert => {}
        }
    }

    fn num_branches(&self) -> usize {
        match self {
            Device::Battery(d) => d.num_branches(),
            Device::Supply(d) => d.num_branches(),
            Device::Rail(d) => d.num_branches(),
            Device::Led(d) => d.num_branches(),
            Device::Ammeter(d) => d.num_branches(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltlab_core::{Node, Runtime, Wire};

    fn resolve(elements: &[Element]) -> NetMap {
        NetMap::build(elements, &[])
    }

    #[test]
    fn test_note_is_inert() {
        let note = Element::new("n1", ElementKind::Note, vec![]);
        let nets = resolve(std::slice::from_ref(&note));
        assert!(matches!(Device::from_element(&note, &nets), Device::Inert));
    }

    #[test]
    fn test_resistor_maps_to_resistive() {
        let r = {
            let mut e = Element::new(
                "r1",
                ElementKind::Resistor,
                vec![Node::new("r1.a", "r1"), Node::new("r1.b", "r1")],
            );
            e.properties.resistance = Some(470.0);
            e
        };
        let nets = resolve(std::slice::from_ref(&r));
        match Device::from_element(&r, &nets) {
            Device::Resistive(d) => assert_eq!(d.resistance, 470.0),
            other => panic!("expected resistive device, got {other:?}"),
        }
    }

    #[test]
    fn test_exploded_led_is_inert() {
        let mut led = Element::new(
            "d1",
            ElementKind::Led,
            vec![Node::new("d1.a", "d1"), Node::new("d1.k", "d1")],
        );
        led.runtime = Runtime::Led {
            energy: 2.0,
            explode_at: None,
            exploded: true,
            brightness: 0.0,
            visual: voltlab_core::LedVisual::Exploded,
        };
        let nets = resolve(std::slice::from_ref(&led));
        assert!(matches!(Device::from_element(&led, &nets), Device::Inert));
    }

    #[test]
    fn test_missing_terminal_degrades_to_inert() {
        let half = Element::new("r1", ElementKind::Resistor, vec![Node::new("r1.a", "r1")]);
        let nets = resolve(std::slice::from_ref(&half));
        assert!(matches!(Device::from_element(&half, &nets), Device::Inert));
    }

    #[test]
    fn test_shorted_battery_detected() {
        let batt = Element::new(
            "v1",
            ElementKind::Battery,
            vec![Node::new("v1.p", "v1"), Node::new("v1.n", "v1")],
        );
        let wires = vec![Wire::new("w1", "v1.p", "v1.n")];
        let nets = NetMap::build(std::slice::from_ref(&batt), &wires);
        let dev = Device::from_element(&batt, &nets);
        assert!(dev.is_shorted_source());
    }
}

//! Element/wire snapshot model.
//!
//! One tick's input is an immutable array of [`Element`]s and [`Wire`]s
//! handed over by the editing layer; the solver returns a fresh array with
//! updated [`Computed`] and [`Runtime`] bags. Geometric placement, colors
//! and joints are owned by the rendering layer and never reach this crate,
//! so the serde shape below only names the fields the solver depends on and
//! tolerates everything else being absent.

use serde::{Deserialize, Serialize};

/// Type tag of a placed component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    /// Fixed-voltage source with optional internal resistance.
    Battery,
    /// Controllable bench supply: on/off plus a current limit.
    PowerSupply,
    Resistor,
    /// Light-dependent resistor; its `value` property (0..1) shapes the
    /// resistance fed to the solver each tick.
    Photoresistor,
    /// Three-terminal variable resistor split at `ratio`.
    Potentiometer,
    Led,
    /// DC motor; winding is resistive, shaft speed evolves in runtime state.
    Motor,
    /// Embedded controller board with labeled pins (`GND`, `3V`, `P0`, ...).
    Controller,
    Multimeter,
    /// Three-terminal slide switch; `position` selects which terminal
    /// conducts to the common.
    SlideSwitch,
    PushButton,
    /// Passive display; consumes signals, draws no current.
    Display,
    /// Annotation; electrically inert.
    Note,
}

impl ElementKind {
    /// Whether this kind can drive a circuit on its own.
    pub fn is_source(self) -> bool {
        matches!(
            self,
            ElementKind::Battery | ElementKind::PowerSupply | ElementKind::Controller
        )
    }
}

/// Selected quantity of a multimeter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeterMode {
    #[default]
    Voltage,
    Current,
    Resistance,
}

/// LED color, which fixes the forward voltage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedColor {
    #[default]
    Red,
    Yellow,
    Green,
    Blue,
    White,
}

impl LedColor {
    /// Forward voltage in volts.
    pub fn forward_voltage(self) -> f64 {
        match self {
            LedColor::Red => 1.0,
            LedColor::Yellow => 1.4,
            LedColor::Green => 1.8,
            LedColor::Blue | LedColor::White => 2.8,
        }
    }
}

/// Slide switch position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchPosition {
    #[default]
    A,
    B,
}

/// One electrical terminal of an element.
///
/// A node belongs to exactly one element and has no independent lifecycle.
/// `placeholder` carries the role label the editing layer assigned to the
/// terminal (`"GND"`, `"3V"`, `"P0"`, ...); it anchors pin levels and
/// reference-net selection but is otherwise opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub parent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.into(),
            placeholder: None,
        }
    }

    pub fn with_placeholder(
        id: impl Into<String>,
        parent_id: impl Into<String>,
        placeholder: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.into(),
            placeholder: Some(placeholder.into()),
        }
    }
}

/// An edge between two nodes.
///
/// `deleted` wires are logically removed but retained for undo; `hidden`
/// wires are auto-snap connections and electrically identical to visible
/// ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wire {
    pub id: String,
    pub from_node_id: String,
    pub to_node_id: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub hidden: bool,
}

impl Wire {
    pub fn new(
        id: impl Into<String>,
        from_node_id: impl Into<String>,
        to_node_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            from_node_id: from_node_id.into(),
            to_node_id: to_node_id.into(),
            deleted: false,
            hidden: false,
        }
    }
}

/// Type-varying property bag. Fields the element kind does not use are
/// simply absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Properties {
    /// Resistance in ohms (resistor, motor winding, potentiometer total).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resistance: Option<f64>,
    /// Source voltage in volts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
    /// Battery internal resistance in ohms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_resistance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<LedColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<MeterMode>,
    /// Potentiometer wiper position, 0..1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
    /// Power supply output enable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
    /// Power supply current limit in amperes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_limit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<SwitchPosition>,
    /// Sensor stimulus, 0..1 (photoresistor light level).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

/// Solved electrical quantities, fully re-derived every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Computed {
    /// Current through the element in amperes.
    pub current: f64,
    /// Voltage across the element terminals in volts.
    pub voltage: f64,
    /// Dissipated (or delivered) power in watts.
    pub power: f64,
    /// Mode-specific reading, measurement elements only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement: Option<f64>,
    /// Open-circuit voltage the surrounding circuit presents at an LED's
    /// position, before the junction clamps it. LEDs only; the failure
    /// model judges this instead of the clamped terminal voltage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drive: Option<f64>,
    /// Set when a wire bridges this source's own terminals.
    pub shorted: bool,
}

/// LED visual state tag consumed by the rendering layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedVisual {
    #[default]
    Off,
    On,
    Hot,
    Exploded,
}

/// Time-evolving, non-electrical per-element state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Runtime {
    #[default]
    None,
    Led {
        /// Accumulated thermal energy, clamped to [0, 2].
        energy: f64,
        /// Scheduled explosion deadline (monotonic seconds), if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        explode_at: Option<f64>,
        /// Terminal failure flag.
        exploded: bool,
        /// Current brightness, 0..1.
        brightness: f64,
        visual: LedVisual,
    },
    Motor {
        /// Angular velocity in rad/s.
        omega: f64,
        /// Shaft speed in revolutions per minute.
        rpm: f64,
    },
    Supply {
        /// True when the supply is clamping to its current limit instead
        /// of regulating voltage.
        limited: bool,
    },
}

impl Runtime {
    /// Whether this LED runtime has reached its terminal exploded state.
    pub fn is_exploded(&self) -> bool {
        matches!(self, Runtime::Led { exploded: true, .. })
    }
}

/// A placed component: stable id, type tag, terminals, and the three bags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub computed: Computed,
    #[serde(default)]
    pub runtime: Runtime,
}

impl Element {
    pub fn new(id: impl Into<String>, kind: ElementKind, nodes: Vec<Node>) -> Self {
        Self {
            id: id.into(),
            kind,
            nodes,
            properties: Properties::default(),
            computed: Computed::default(),
            runtime: Runtime::default(),
        }
    }

    /// Node id at `index`, if the element has that many terminals.
    pub fn node_id(&self, index: usize) -> Option<&str> {
        self.nodes.get(index).map(|n| n.id.as_str())
    }

    /// First node carrying the given placeholder label.
    pub fn node_with_placeholder(&self, label: &str) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|n| n.placeholder.as_deref() == Some(label))
    }

    /// Internally conducting node-index pairs for the current tick.
    ///
    /// This is the generic capability the topology resolver queries instead
    /// of special-casing element types: a slide switch conducts between the
    /// selected terminal and the common (node order: terminal A, common,
    /// terminal B), a pressed push button conducts between its two
    /// terminals. Every other kind presents a non-conducting internal gap
    /// here; terminal coupling is expressed through solver stamps instead.
    pub fn closed_paths(&self) -> Vec<(usize, usize)> {
        match self.kind {
            ElementKind::SlideSwitch if self.nodes.len() >= 3 => {
                match self.properties.position.unwrap_or_default() {
                    SwitchPosition::A => vec![(0, 1)],
                    SwitchPosition::B => vec![(2, 1)],
                }
            }
            ElementKind::PushButton if self.nodes.len() >= 2 => {
                if self.properties.pressed.unwrap_or(false) {
                    vec![(0, 1)]
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_round_trip() {
        let json = r#"{
            "id": "r1",
            "type": "resistor",
            "nodes": [
                {"id": "r1.a", "parentId": "r1"},
                {"id": "r1.b", "parentId": "r1"}
            ],
            "properties": {"resistance": 1000.0},
            "position": {"x": 10, "y": 20}
        }"#;

        let el: Element = serde_json::from_str(json).unwrap();
        assert_eq!(el.kind, ElementKind::Resistor);
        assert_eq!(el.properties.resistance, Some(1000.0));
        assert_eq!(el.nodes[0].parent_id, "r1");
        assert_eq!(el.computed, Computed::default());
    }

    #[test]
    fn test_wire_flags_default_false() {
        let w: Wire =
            serde_json::from_str(r#"{"id":"w1","fromNodeId":"a","toNodeId":"b"}"#).unwrap();
        assert!(!w.deleted);
        assert!(!w.hidden);
    }

    #[test]
    fn test_forward_voltage_ladder() {
        assert!(LedColor::Red.forward_voltage() < LedColor::Green.forward_voltage());
        assert_eq!(
            LedColor::Blue.forward_voltage(),
            LedColor::White.forward_voltage()
        );
    }

    #[test]
    fn test_slide_switch_closed_paths() {
        let mut sw = Element::new(
            "s1",
            ElementKind::SlideSwitch,
            vec![
                Node::new("s1.a", "s1"),
                Node::new("s1.c", "s1"),
                Node::new("s1.b", "s1"),
            ],
        );
        assert_eq!(sw.closed_paths(), vec![(0, 1)]);

        sw.properties.position = Some(SwitchPosition::B);
        assert_eq!(sw.closed_paths(), vec![(2, 1)]);
    }

    #[test]
    fn test_push_button_closed_paths() {
        let mut btn = Element::new(
            "b1",
            ElementKind::PushButton,
            vec![Node::new("b1.a", "b1"), Node::new("b1.b", "b1")],
        );
        assert!(btn.closed_paths().is_empty());

        btn.properties.pressed = Some(true);
        assert_eq!(btn.closed_paths(), vec![(0, 1)]);
    }

    #[test]
    fn test_resistor_has_no_internal_conduction() {
        let r = Element::new(
            "r1",
            ElementKind::Resistor,
            vec![Node::new("r1.a", "r1"), Node::new("r1.b", "r1")],
        );
        assert!(r.closed_paths().is_empty());
    }
}

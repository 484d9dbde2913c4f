//! Fixed-voltage source models: battery, controllable bench supply, and
//! the controller's 3.3 V rail.

use voltlab_core::{Element, MnaSystem, NetId, NetIndexer, NetMap, Properties};

use crate::stamp::Stamp;

/// Safety ceiling applied to the reported current of a shorted source
/// instead of leaving it unbounded.
pub const SHORT_CIRCUIT_CURRENT_CAP: f64 = 5.0;

/// Default battery electromotive force in volts.
pub const DEFAULT_BATTERY_VOLTAGE: f64 = 9.0;

/// Controller rail voltage in volts.
pub const CONTROLLER_RAIL_VOLTAGE: f64 = 3.3;

/// Default bench supply settings.
pub const DEFAULT_SUPPLY_VOLTAGE: f64 = 5.0;
pub const DEFAULT_SUPPLY_CURRENT_LIMIT: f64 = 1.0;

/// A battery: ideal emf behind an optional internal resistance.
///
/// With internal resistance the battery stamps as its Norton equivalent
/// (conductance `1/r` plus current injection `emf/r`), which avoids an
/// internal node. With zero internal resistance it is an ideal voltage
/// source with a branch current variable.
#[derive(Debug, Clone)]
pub struct Battery {
    pub pos: NetId,
    pub neg: NetId,
    pub emf: f64,
    pub internal_resistance: f64,
}

impl Battery {
    pub fn from_properties(pos: NetId, neg: NetId, props: &Properties) -> Self {
        Self {
            pos,
            neg,
            emf: props.voltage.unwrap_or(DEFAULT_BATTERY_VOLTAGE),
            internal_resistance: props.internal_resistance.unwrap_or(0.0).max(0.0),
        }
    }

    /// Terminal current delivered out of the positive terminal, given the
    /// solved terminal voltage and (for the ideal case) branch current.
    pub fn delivered_current(&self, terminal_voltage: f64, branch_current: Option<f64>) -> f64 {
        if self.pos == self.neg {
            // Shorted: report the capped ceiling, not the unbounded value.
            return if self.internal_resistance > 0.0 {
                (self.emf / self.internal_resistance).min(SHORT_CIRCUIT_CURRENT_CAP)
            } else {
                SHORT_CIRCUIT_CURRENT_CAP
            };
        }
        if self.internal_resistance > 0.0 {
            (self.emf - terminal_voltage) / self.internal_resistance
        } else {
            // Branch current is oriented pos -> neg through the source, so
            // a delivering battery solves it negative.
            -branch_current.unwrap_or(0.0)
        }
    }
}

impl Stamp for Battery {
    fn stamp(&self, mna: &mut MnaSystem, nets: &NetIndexer, branch: Option<usize>) {
        if self.pos == self.neg {
            return; // shorted, see solver short handling
        }
        let p = nets.index(self.pos);
        let n = nets.index(self.neg);
        if self.internal_resistance > 0.0 {
            let g = 1.0 / self.internal_resistance;
            mna.stamp_conductance(p, n, g);
            mna.stamp_current(n, p, g * self.emf);
        } else if let Some(branch) = branch {
            mna.stamp_voltage(p, n, branch, self.emf);
        }
    }

    fn num_branches(&self) -> usize {
        if self.pos != self.neg && self.internal_resistance == 0.0 {
            1
        } else {
            0
        }
    }
}

/// Regulating mode of the controllable supply for the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupplyMode {
    /// Holding the set voltage.
    Voltage,
    /// Clamped to the current limit.
    Limited,
}

/// A controllable bench supply: on/off, set voltage, current limit.
///
/// It starts each tick voltage-regulated; when the solved output current
/// exceeds the limit the solver flips [`Supply::mode`] and re-stamps it as
/// an ideal current source at the limit.
#[derive(Debug, Clone)]
pub struct Supply {
    pub pos: NetId,
    pub neg: NetId,
    pub volts: f64,
    pub current_limit: f64,
    pub mode: SupplyMode,
}

impl Supply {
    pub fn from_properties(pos: NetId, neg: NetId, props: &Properties) -> Self {
        let on = props.on.unwrap_or(true);
        Self {
            pos,
            neg,
            // Off means 0 V across the output, not an open circuit.
            volts: if on {
                props.voltage.unwrap_or(DEFAULT_SUPPLY_VOLTAGE)
            } else {
                0.0
            },
            current_limit: props.current_limit.unwrap_or(DEFAULT_SUPPLY_CURRENT_LIMIT),
            mode: SupplyMode::Voltage,
        }
    }

    pub fn delivered_current(&self, branch_current: Option<f64>) -> f64 {
        if self.pos == self.neg {
            return SHORT_CIRCUIT_CURRENT_CAP.min(self.current_limit.max(0.0));
        }
        match self.mode {
            SupplyMode::Voltage => -branch_current.unwrap_or(0.0),
            SupplyMode::Limited => self.current_limit,
        }
    }
}

impl Stamp for Supply {
    fn stamp(&self, mna: &mut MnaSystem, nets: &NetIndexer, branch: Option<usize>) {
        if self.pos == self.neg {
            return;
        }
        let p = nets.index(self.pos);
        let n = nets.index(self.neg);
        match self.mode {
            SupplyMode::Voltage => {
                if let Some(branch) = branch {
                    mna.stamp_voltage(p, n, branch, self.volts);
                }
            }
            SupplyMode::Limited => {
                mna.stamp_current(n, p, self.current_limit);
            }
        }
    }

    fn num_branches(&self) -> usize {
        if self.pos != self.neg && self.mode == SupplyMode::Voltage {
            1
        } else {
            0
        }
    }
}

/// The 3.3 V rail a controller board exposes between its `3V` and `GND`
/// pins. Powers circuits wired off the controller; pin-level signalling is
/// the bridge's concern, not this stamp's.
#[derive(Debug, Clone)]
pub struct Rail {
    pub pos: NetId,
    pub neg: NetId,
    pub volts: f64,
}

impl Rail {
    /// Build from a controller element's labeled pins. A controller with
    /// no power pins (or one not wired into any circuit) contributes no
    /// rail.
    pub fn from_element(element: &Element, nets: &NetMap) -> Option<Self> {
        let pos = element
            .node_with_placeholder("3V")
            .or_else(|| element.node_with_placeholder("3.3V"))?;
        let neg = element.node_with_placeholder("GND")?;
        Some(Self {
            pos: nets.net_of(&pos.id)?,
            neg: nets.net_of(&neg.id)?,
            volts: CONTROLLER_RAIL_VOLTAGE,
        })
    }

    pub fn delivered_current(&self, branch_current: Option<f64>) -> f64 {
        if self.pos == self.neg {
            SHORT_CIRCUIT_CURRENT_CAP
        } else {
            -branch_current.unwrap_or(0.0)
        }
    }
}

impl Stamp for Rail {
    fn stamp(&self, mna: &mut MnaSystem, nets: &NetIndexer, branch: Option<usize>) {
        if self.pos == self.neg {
            return;
        }
        if let Some(branch) = branch {
            mna.stamp_voltage(
                nets.index(self.pos),
                nets.index(self.neg),
                branch,
                self.volts,
            );
        }
    }

    fn num_branches(&self) -> usize {
        if self.pos != self.neg { 1 } else { 0 }
    }
}

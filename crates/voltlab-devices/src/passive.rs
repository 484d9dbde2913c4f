//! Resistive device models and measurement elements.

use voltlab_core::{MeterMode, MnaSystem, NetId, NetIndexer};

use crate::stamp::Stamp;

/// Fallback for resistors placed without a value.
pub const DEFAULT_RESISTANCE: f64 = 1_000.0;

/// Default potentiometer track resistance.
pub const DEFAULT_POT_RESISTANCE: f64 = 10_000.0;

/// Photoresistor endpoints: fully dark and fully lit.
pub const LDR_DARK_RESISTANCE: f64 = 1_000_000.0;
pub const LDR_BRIGHT_RESISTANCE: f64 = 1_000.0;

/// Floor applied to every stamped resistance so a zero-ohm property or a
/// wiper driven to the very end of the track cannot make the matrix
/// singular.
pub const MIN_RESISTANCE: f64 = 1e-3;

/// Photoresistor resistance for a light level in 0..1.
pub fn photoresistor_resistance(value: f64) -> f64 {
    let v = value.clamp(0.0, 1.0);
    LDR_DARK_RESISTANCE + (LDR_BRIGHT_RESISTANCE - LDR_DARK_RESISTANCE) * v
}

/// A plain linear conductance: resistors, resistive sensors, motor
/// windings.
#[derive(Debug, Clone)]
pub struct Resistive {
    pub pos: NetId,
    pub neg: NetId,
    pub resistance: f64,
}

impl Resistive {
    pub fn new(pos: NetId, neg: NetId, resistance: f64) -> Self {
        Self {
            pos,
            neg,
            resistance: resistance.max(MIN_RESISTANCE),
        }
    }

    pub fn conductance(&self) -> f64 {
        1.0 / self.resistance
    }

    /// Current for a solved terminal voltage, oriented pos -> neg.
    pub fn current(&self, terminal_voltage: f64) -> f64 {
        terminal_voltage * self.conductance()
    }
}

impl Stamp for Resistive {
    fn stamp(&self, mna: &mut MnaSystem, nets: &NetIndexer, _branch: Option<usize>) {
        mna.stamp_conductance(nets.index(self.pos), nets.index(self.neg), self.conductance());
    }
}

/// A potentiometer split at `ratio` into two half-resistances around the
/// wiper. Stateless: the split is re-derived from the property bag every
/// tick.
#[derive(Debug, Clone)]
pub struct Potentiometer {
    pub a: NetId,
    pub wiper: NetId,
    pub b: NetId,
    pub r_first: f64,
    pub r_second: f64,
}

impl Potentiometer {
    pub fn new(a: NetId, wiper: NetId, b: NetId, total: f64, ratio: f64) -> Self {
        let ratio = ratio.clamp(0.0, 1.0);
        Self {
            a,
            wiper,
            b,
            r_first: (total * ratio).max(MIN_RESISTANCE),
            r_second: (total * (1.0 - ratio)).max(MIN_RESISTANCE),
        }
    }
}

impl Stamp for Potentiometer {
    fn stamp(&self, mna: &mut MnaSystem, nets: &NetIndexer, _branch: Option<usize>) {
        mna.stamp_conductance(nets.index(self.a), nets.index(self.wiper), 1.0 / self.r_first);
        mna.stamp_conductance(nets.index(self.wiper), nets.index(self.b), 1.0 / self.r_second);
    }
}

/// A multimeter in current mode: an ideal ammeter, stamped as a 0 V source
/// so its branch variable reads the through current directly.
#[derive(Debug, Clone)]
pub struct Ammeter {
    pub pos: NetId,
    pub neg: NetId,
}

impl Ammeter {
    pub fn new(pos: NetId, neg: NetId) -> Self {
        Self { pos, neg }
    }
}

impl Stamp for Ammeter {
    fn stamp(&self, mna: &mut MnaSystem, nets: &NetIndexer, branch: Option<usize>) {
        if let Some(branch) = branch {
            mna.stamp_voltage(nets.index(self.pos), nets.index(self.neg), branch, 0.0);
        }
    }

    fn num_branches(&self) -> usize {
        1
    }
}

/// A multimeter in voltage or resistance mode: infinite input resistance,
/// no stamp. The reading is derived from solved net voltages after the
/// fact.
#[derive(Debug, Clone)]
pub struct Probe {
    pub pos: NetId,
    pub neg: NetId,
    pub mode: MeterMode,
}

impl Probe {
    pub fn new(pos: NetId, neg: NetId, mode: MeterMode) -> Self {
        Self { pos, neg, mode }
    }

    /// Meter reading for a solved probe voltage. An open meter draws no
    /// current, so resistance mode cannot source a test current and reads
    /// zero.
    pub fn measurement(&self, probe_voltage: f64) -> f64 {
        match self.mode {
            MeterMode::Voltage => probe_voltage,
            MeterMode::Resistance => 0.0,
            // Current mode maps to `Ammeter`, never to a probe.
            MeterMode::Current => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(i: usize) -> NetId {
        NetId::new(i)
    }

    #[test]
    fn test_resistive_stamp() {
        let mut indexer = NetIndexer::new(2);
        indexer.assign(net(0));
        indexer.assign(net(1));

        let r = Resistive::new(net(0), net(1), 1000.0);
        let mut mna = MnaSystem::new(2, 0);
        r.stamp(&mut mna, &indexer, None);

        let g = 0.001;
        assert!((mna.matrix()[(0, 1)] + g).abs() < 1e-12);
        assert!((mna.matrix()[(1, 0)] + g).abs() < 1e-12);
    }

    #[test]
    fn test_zero_ohm_resistance_floored() {
        let r = Resistive::new(net(0), net(1), 0.0);
        assert_eq!(r.resistance, MIN_RESISTANCE);
    }

    #[test]
    fn test_photoresistor_shaping_monotonic() {
        assert_eq!(photoresistor_resistance(0.0), LDR_DARK_RESISTANCE);
        assert_eq!(photoresistor_resistance(1.0), LDR_BRIGHT_RESISTANCE);
        assert!(photoresistor_resistance(0.3) > photoresistor_resistance(0.7));
        // Out-of-range stimulus clamps.
        assert_eq!(photoresistor_resistance(2.0), LDR_BRIGHT_RESISTANCE);
    }

    #[test]
    fn test_potentiometer_split() {
        let pot = Potentiometer::new(net(0), net(1), net(2), 10_000.0, 0.25);
        assert!((pot.r_first - 2_500.0).abs() < 1e-9);
        assert!((pot.r_second - 7_500.0).abs() < 1e-9);

        // Wiper at the very end still stamps a regular matrix.
        let pot = Potentiometer::new(net(0), net(1), net(2), 10_000.0, 0.0);
        assert_eq!(pot.r_first, MIN_RESISTANCE);
    }

    #[test]
    fn test_ammeter_is_zero_volt_source() {
        let mut indexer = NetIndexer::new(2);
        indexer.assign(net(0));
        indexer.assign(net(1));

        let meter = Ammeter::new(net(0), net(1));
        assert_eq!(meter.num_branches(), 1);

        let mut mna = MnaSystem::new(2, 1);
        meter.stamp(&mut mna, &indexer, Some(0));
        assert_eq!(mna.rhs()[2], 0.0);
        assert_eq!(mna.matrix()[(0, 2)], 1.0);
        assert_eq!(mna.matrix()[(2, 1)], -1.0);
    }

    #[test]
    fn test_probe_readings() {
        let v = Probe::new(net(0), net(1), MeterMode::Voltage);
        assert_eq!(v.measurement(4.2), 4.2);

        let ohm = Probe::new(net(0), net(1), MeterMode::Resistance);
        assert_eq!(ohm.measurement(4.2), 0.0);
    }
}

//! Solved electrical state for one tick, across all subcircuits.

use voltlab_core::NetId;

/// Net voltages and per-device branch currents after all subcircuits of a
/// tick have been solved. Nets that were never part of a solvable
/// subcircuit sit at 0 V (floating reads low).
#[derive(Debug, Clone)]
pub struct Solution {
    net_voltages: Vec<f64>,
    /// Branch current per device index, for devices that had a branch
    /// variable this tick.
    branch_currents: Vec<Option<f64>>,
}

impl Solution {
    pub fn new(num_nets: usize, num_devices: usize) -> Self {
        Self {
            net_voltages: vec![0.0; num_nets],
            branch_currents: vec![None; num_devices],
        }
    }

    pub fn voltage(&self, net: NetId) -> f64 {
        self.net_voltages.get(net.index()).copied().unwrap_or(0.0)
    }

    /// Voltage from `pos` to `neg`.
    pub fn voltage_between(&self, pos: NetId, neg: NetId) -> f64 {
        self.voltage(pos) - self.voltage(neg)
    }

    pub fn set_voltage(&mut self, net: NetId, volts: f64) {
        if let Some(slot) = self.net_voltages.get_mut(net.index()) {
            *slot = volts;
        }
    }

    pub fn branch_current(&self, device: usize) -> Option<f64> {
        self.branch_currents.get(device).copied().flatten()
    }

    pub fn set_branch_current(&mut self, device: usize, amps: f64) {
        if let Some(slot) = self.branch_currents.get_mut(device) {
            *slot = Some(amps);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsolved_net_reads_zero() {
        let sol = Solution::new(2, 0);
        assert_eq!(sol.voltage(NetId::new(0)), 0.0);
        assert_eq!(sol.voltage(NetId::new(7)), 0.0);
    }

    #[test]
    fn test_voltage_between() {
        let mut sol = Solution::new(3, 1);
        sol.set_voltage(NetId::new(0), 3.3);
        sol.set_voltage(NetId::new(2), 1.0);
        assert!((sol.voltage_between(NetId::new(0), NetId::new(2)) - 2.3).abs() < 1e-12);
    }

    #[test]
    fn test_branch_current_absent_until_set() {
        let mut sol = Solution::new(1, 2);
        assert_eq!(sol.branch_current(0), None);
        sol.set_branch_current(1, -0.005);
        assert_eq!(sol.branch_current(1), Some(-0.005));
        assert_eq!(sol.branch_current(0), None);
    }
}

//! One tick of nodal analysis.
//!
//! The snapshot is treated as immutable input; a fresh element array with
//! replaced computed bags comes back out. All per-tick structures (net
//! map, device list, matrices) are local to the call, so concurrent
//! simulation instances never share state.

use tracing::{debug, trace};

use voltlab_core::{
    Computed, Element, ElementKind, MnaSystem, NetId, NetIndexer, NetMap, Runtime, Wire,
};
use voltlab_devices::led::CURRENT_EPS;
use voltlab_devices::sources::SupplyMode;
use voltlab_devices::{Device, Stamp};

use crate::linear::solve_dense;
use crate::solution::Solution;

/// Cap on conduction-state flips per subcircuit. On cap-out every LED in
/// the subcircuit defaults to blocking: a false "off" beats a false "on".
const MAX_CONDUCTION_ITERS: usize = 12;

/// Solve one tick: topology, nodal analysis, computed-bag extraction.
///
/// Equivalent to [`solve_on`] with a freshly built net map.
pub fn solve_elements(elements: &[Element], wires: &[Wire]) -> Vec<Element> {
    let nets = NetMap::build(elements, wires);
    solve_on(elements, &nets)
}

/// Solve one tick against an already-resolved net map (the engine reuses
/// the map for the pin bridge afterwards).
pub fn solve_on(elements: &[Element], nets: &NetMap) -> Vec<Element> {
    let mut devices: Vec<Device> = elements
        .iter()
        .map(|e| Device::from_element(e, nets))
        .collect();
    let mut solution = Solution::new(nets.num_nets(), devices.len());
    // Open-circuit voltage seen at each LED position, from the initial
    // all-blocking solve. This is the "drive" the failure rules judge:
    // a conducting LED clamps its terminals to vf, which would hide how
    // hard the circuit is pushing it.
    let mut led_drives: Vec<Option<f64>> = vec![None; devices.len()];

    let gnd_nets = labeled_nets(elements, nets, "GND");
    for group in partition(&devices, nets.num_nets()) {
        solve_subcircuit(&group, &mut devices, &mut solution, &gnd_nets, &mut led_drives);
    }

    elements
        .iter()
        .enumerate()
        .map(|(i, element)| {
            let mut out = element.clone();
            out.computed = extract_computed(&devices[i], i, &solution, led_drives[i]);
            if element.kind == ElementKind::PowerSupply {
                out.runtime = Runtime::Supply {
                    limited: matches!(&devices[i], Device::Supply(s) if s.mode == SupplyMode::Limited),
                };
            }
            out
        })
        .collect()
}

/// Nets containing a node with the given placeholder label.
fn labeled_nets(elements: &[Element], nets: &NetMap, label: &str) -> Vec<NetId> {
    let mut out = Vec::new();
    for element in elements {
        for node in &element.nodes {
            if node.placeholder.as_deref() == Some(label) {
                if let Some(net) = nets.net_of(&node.id) {
                    if !out.contains(&net) {
                        out.push(net);
                    }
                }
            }
        }
    }
    out
}

/// One electrically connected subcircuit: its nets (ascending) and the
/// devices whose terminals live in it (in element order).
struct Subcircuit {
    nets: Vec<NetId>,
    devices: Vec<usize>,
}

/// Group nets into subcircuits joined by device terminal coupling.
/// Probes couple nothing, so an ideal voltmeter never merges two
/// otherwise independent circuits.
fn partition(devices: &[Device], num_nets: usize) -> Vec<Subcircuit> {
    let mut parent: Vec<usize> = (0..num_nets).collect();

    fn find(parent: &mut [usize], x: usize) -> usize {
        let mut root = x;
        while parent[root] != root {
            root = parent[root];
        }
        let mut cur = x;
        while parent[cur] != root {
            let next = parent[cur];
            parent[cur] = root;
            cur = next;
        }
        root
    }

    for device in devices {
        let coupled = device.coupled_nets();
        if let Some(first) = coupled.first() {
            let anchor = find(&mut parent, first.index());
            for net in &coupled[1..] {
                let root = find(&mut parent, net.index());
                parent[root] = anchor;
            }
        }
    }

    let mut groups: Vec<Subcircuit> = Vec::new();
    let mut group_of_root: Vec<Option<usize>> = vec![None; num_nets];
    for net in 0..num_nets {
        let root = find(&mut parent, net);
        let group = *group_of_root[root].get_or_insert_with(|| {
            groups.push(Subcircuit {
                nets: Vec::new(),
                devices: Vec::new(),
            });
            groups.len() - 1
        });
        groups[group].nets.push(NetId::new(net));
    }
    for (i, device) in devices.iter().enumerate() {
        if let Some(first) = device.coupled_nets().first() {
            let root = find(&mut parent, first.index());
            if let Some(group) = group_of_root[root] {
                groups[group].devices.push(i);
            }
        }
    }
    groups
}

/// Solve one subcircuit, iterating conduction states to a fixed point.
fn solve_subcircuit(
    sub: &Subcircuit,
    devices: &mut [Device],
    solution: &mut Solution,
    gnd_nets: &[NetId],
    led_drives: &mut [Option<f64>],
) {
    let has_live_source = sub
        .devices
        .iter()
        .any(|&i| devices[i].is_source() && !devices[i].is_shorted_source());
    if !has_live_source {
        trace!(nets = sub.nets.len(), "subcircuit without a source, zeros");
        return;
    }

    let reference = reference_net(sub, devices, gnd_nets);

    for iteration in 0..MAX_CONDUCTION_ITERS {
        let Some(state) = assemble_and_solve(sub, devices, reference) else {
            return; // degraded to zeros, already logged
        };

        if iteration == 0 {
            // Every LED still holds its initial blocking assumption here,
            // so the solved terminal difference is the open-circuit drive.
            for &i in &sub.devices {
                if let Device::Led(led) = &devices[i] {
                    led_drives[i] = Some(state.voltage(led.anode) - state.voltage(led.cathode));
                }
            }
        }

        if !apply_flips(sub, devices, &state) {
            trace!(iteration, "conduction states consistent");
            commit(sub, state, solution);
            return;
        }
    }

    // Cap reached: prefer a false "off" over a false "on".
    debug!("conduction iteration cap hit, defaulting LEDs to blocking");
    for &i in &sub.devices {
        if let Device::Led(led) = &mut devices[i] {
            led.conducting = false;
        }
    }
    if let Some(state) = assemble_and_solve(sub, devices, reference) {
        commit(sub, state, solution);
    }
}

/// The 0 V reference: a `GND`-labeled net in the subcircuit if present,
/// else the negative terminal of the first source in element order.
fn reference_net(sub: &Subcircuit, devices: &[Device], gnd_nets: &[NetId]) -> NetId {
    for &net in &sub.nets {
        if gnd_nets.contains(&net) {
            return net;
        }
    }
    sub.devices
        .iter()
        .filter_map(|&i| devices[i].source_negative())
        .next()
        .unwrap_or(sub.nets[0])
}

/// Voltages and branch currents of one subcircuit solve.
struct SubSolution {
    indexer: NetIndexer,
    voltages: Vec<f64>,
    branch_of_device: Vec<(usize, usize)>,
    branch_values: Vec<f64>,
}

impl SubSolution {
    fn voltage(&self, net: NetId) -> f64 {
        match self.indexer.index(net) {
            Some(idx) => self.voltages[idx],
            None => 0.0,
        }
    }

    fn branch_current(&self, device: usize) -> Option<f64> {
        self.branch_of_device
            .iter()
            .find(|(dev, _)| *dev == device)
            .map(|&(_, branch)| self.branch_values[branch])
    }
}

fn assemble_and_solve(
    sub: &Subcircuit,
    devices: &[Device],
    reference: NetId,
) -> Option<SubSolution> {
    // Matrix rows in ascending net order, skipping the reference.
    let max_net = sub.nets.iter().map(|n| n.index()).max().unwrap_or(0);
    let mut indexer = NetIndexer::new(max_net + 1);
    for &net in &sub.nets {
        if net != reference {
            indexer.assign(net);
        }
    }

    let mut branch_of_device = Vec::new();
    let mut num_branches = 0;
    for &i in &sub.devices {
        if devices[i].num_branches() > 0 {
            branch_of_device.push((i, num_branches));
            num_branches += 1;
        }
    }

    let mut mna = MnaSystem::new(indexer.num_assigned(), num_branches);
    for &i in &sub.devices {
        let branch = branch_of_device
            .iter()
            .find(|(dev, _)| *dev == i)
            .map(|&(_, b)| b);
        devices[i].stamp(&mut mna, &indexer, branch);
    }

    match solve_dense(mna.matrix(), mna.rhs()) {
        Ok(x) => {
            let n = indexer.num_assigned();
            Some(SubSolution {
                indexer,
                voltages: x.iter().take(n).copied().collect(),
                branch_of_device,
                branch_values: x.iter().skip(n).copied().collect(),
            })
        }
        Err(err) => {
            debug!(%err, "subcircuit solve failed, degrading to zeros");
            None
        }
    }
}

/// Flip inconsistent conduction assumptions. Returns whether anything
/// changed. Supply limiting is one-way within a tick so the loop cannot
/// oscillate between modes.
fn apply_flips(sub: &Subcircuit, devices: &mut [Device], state: &SubSolution) -> bool {
    let mut changed = false;
    for &i in &sub.devices {
        match &mut devices[i] {
            Device::Led(led) => {
                let fv = state.voltage(led.anode) - state.voltage(led.cathode);
                if !led.consistent(fv, state.branch_current(i)) {
                    led.conducting = !led.conducting;
                    changed = true;
                }
            }
            Device::Supply(supply) if supply.mode == SupplyMode::Voltage => {
                let delivered = supply.delivered_current(state.branch_current(i));
                if delivered > supply.current_limit + CURRENT_EPS {
                    supply.mode = SupplyMode::Limited;
                    changed = true;
                }
            }
            _ => {}
        }
    }
    changed
}

fn commit(sub: &Subcircuit, state: SubSolution, solution: &mut Solution) {
    for &net in &sub.nets {
        solution.set_voltage(net, state.voltage(net));
    }
    for &(device, _) in &state.branch_of_device {
        if let Some(amps) = state.branch_current(device) {
            solution.set_branch_current(device, amps);
        }
    }
}

/// Derive one element's computed bag from the committed solution.
fn extract_computed(
    device: &Device,
    index: usize,
    solution: &Solution,
    led_drive: Option<f64>,
) -> Computed {
    match device {
        Device::Battery(d) => {
            let shorted = d.pos == d.neg;
            let volts = solution.voltage_between(d.pos, d.neg);
            let amps = d.delivered_current(volts, solution.branch_current(index));
            source_computed(volts, amps, shorted)
        }
        Device::Supply(d) => {
            let shorted = d.pos == d.neg;
            let volts = solution.voltage_between(d.pos, d.neg);
            let amps = d.delivered_current(solution.branch_current(index));
            source_computed(volts, amps, shorted)
        }
        Device::Rail(d) => {
            let shorted = d.pos == d.neg;
            let volts = solution.voltage_between(d.pos, d.neg);
            let amps = d.delivered_current(solution.branch_current(index));
            source_computed(volts, amps, shorted)
        }
        Device::Resistive(d) => {
            let volts = solution.voltage_between(d.pos, d.neg);
            let amps = d.current(volts);
            Computed {
                current: amps,
                voltage: volts,
                power: volts * amps,
                measurement: None,
                drive: None,
                shorted: false,
            }
        }
        Device::Potentiometer(d) => {
            let va = solution.voltage(d.a);
            let vw = solution.voltage(d.wiper);
            let vb = solution.voltage(d.b);
            Computed {
                current: (va - vw) / d.r_first,
                voltage: va - vb,
                power: (va - vw).powi(2) / d.r_first + (vw - vb).powi(2) / d.r_second,
                measurement: None,
                drive: None,
                shorted: false,
            }
        }
        Device::Led(d) => {
            // Terminal voltage and dissipation come from the committed
            // solve (vf while conducting); the open-circuit drive from the
            // initial all-blocking solve rides along for the failure rules.
            let volts = solution.voltage_between(d.anode, d.cathode);
            let amps = if d.conducting {
                solution.branch_current(index).unwrap_or(0.0).max(0.0)
            } else {
                0.0
            };
            Computed {
                current: amps,
                voltage: volts,
                power: (volts * amps).abs(),
                measurement: None,
                drive: led_drive.or(Some(volts)),
                shorted: false,
            }
        }
        Device::Ammeter(d) => {
            let amps = solution.branch_current(index).unwrap_or(0.0);
            Computed {
                current: amps,
                voltage: solution.voltage_between(d.pos, d.neg),
                power: 0.0,
                measurement: Some(amps),
                drive: None,
                shorted: false,
            }
        }
        Device::Probe(d) => {
            let volts = solution.voltage_between(d.pos, d.neg);
            Computed {
                current: 0.0,
                voltage: volts,
                power: 0.0,
                measurement: Some(d.measurement(volts)),
                drive: None,
                shorted: false,
            }
        }
        Device::Inert => Computed::default(),
    }
}

fn source_computed(volts: f64, amps: f64, shorted: bool) -> Computed {
    Computed {
        current: amps,
        voltage: volts,
        power: (volts * amps).abs(),
        measurement: None,
        drive: None,
        shorted,
    }
}

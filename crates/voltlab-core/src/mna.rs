//! Modified Nodal Analysis matrix system.
//!
//! Each equivalence class from the topology resolver becomes one circuit
//! node; one net per subcircuit is pinned as the 0 V reference and gets no
//! matrix row. Ideal voltage sources extend the system with one branch
//! current variable each.

use nalgebra::{DMatrix, DVector};

use crate::topology::NetId;

/// Maps nets to matrix row indices for one subcircuit assembly.
///
/// The reference net and nets outside the subcircuit map to `None`.
#[derive(Debug, Clone)]
pub struct NetIndexer {
    index_of_net: Vec<Option<usize>>,
    assigned: usize,
}

impl NetIndexer {
    pub fn new(num_nets: usize) -> Self {
        Self {
            index_of_net: vec![None; num_nets],
            assigned: 0,
        }
    }

    /// Give `net` the next matrix row. Idempotent.
    pub fn assign(&mut self, net: NetId) -> usize {
        let slot = &mut self.index_of_net[net.index()];
        match *slot {
            Some(idx) => idx,
            None => {
                let idx = self.assigned;
                *slot = Some(idx);
                self.assigned += 1;
                idx
            }
        }
    }

    /// Matrix row of `net`, `None` for the reference.
    pub fn index(&self, net: NetId) -> Option<usize> {
        self.index_of_net[net.index()]
    }

    pub fn num_assigned(&self) -> usize {
        self.assigned
    }
}

/// The linear system `A x = b` for one subcircuit at one instant.
///
/// `x` holds net voltages followed by branch currents. Every stamp below
/// accumulates; a fresh system starts at zero and is fully re-stamped on
/// each nonlinear iteration rather than patched in place.
#[derive(Debug, Clone)]
pub struct MnaSystem {
    matrix: DMatrix<f64>,
    rhs: DVector<f64>,
    num_nets: usize,
    num_branches: usize,
}

/// Regularization conductance on every net diagonal. Keeps floating nets
/// (blocking LEDs, open meter probes) solvable at 0 V while contributing
/// negligible current everywhere else.
pub const GMIN: f64 = 1e-12;

impl MnaSystem {
    /// Create a zeroed system for `num_nets` non-reference nets and
    /// `num_branches` branch current variables, with the GMIN shunt
    /// pre-stamped on each net diagonal.
    pub fn new(num_nets: usize, num_branches: usize) -> Self {
        let size = num_nets + num_branches;
        let mut matrix = DMatrix::zeros(size, size);
        for k in 0..num_nets {
            matrix[(k, k)] = GMIN;
        }
        Self {
            matrix,
            rhs: DVector::zeros(size),
            num_nets,
            num_branches,
        }
    }

    pub fn size(&self) -> usize {
        self.num_nets + self.num_branches
    }

    pub fn num_nets(&self) -> usize {
        self.num_nets
    }

    pub fn num_branches(&self) -> usize {
        self.num_branches
    }

    /// Stamp a conductance `g` between two nets (`None` = reference).
    pub fn stamp_conductance(&mut self, a: Option<usize>, b: Option<usize>, g: f64) {
        if let Some(i) = a {
            self.matrix[(i, i)] += g;
        }
        if let Some(j) = b {
            self.matrix[(j, j)] += g;
        }
        if let (Some(i), Some(j)) = (a, b) {
            self.matrix[(i, j)] -= g;
            self.matrix[(j, i)] -= g;
        }
    }

    /// Stamp an ideal current source driving `amps` from net `from` into
    /// net `to` through the source.
    pub fn stamp_current(&mut self, from: Option<usize>, to: Option<usize>, amps: f64) {
        if let Some(i) = from {
            self.rhs[i] -= amps;
        }
        if let Some(j) = to {
            self.rhs[j] += amps;
        }
    }

    /// Stamp an ideal voltage source of `volts` between `pos` and `neg`
    /// using branch variable `branch`.
    ///
    /// The solved branch current is oriented from `pos` through the source
    /// to `neg`; a source delivering power therefore reports a negative
    /// branch current.
    pub fn stamp_voltage(
        &mut self,
        pos: Option<usize>,
        neg: Option<usize>,
        branch: usize,
        volts: f64,
    ) {
        let row = self.num_nets + branch;
        if let Some(i) = pos {
            self.matrix[(i, row)] += 1.0;
            self.matrix[(row, i)] += 1.0;
        }
        if let Some(j) = neg {
            self.matrix[(j, row)] -= 1.0;
            self.matrix[(row, j)] -= 1.0;
        }
        self.rhs[row] += volts;
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn rhs(&self) -> &DVector<f64> {
        &self.rhs
    }
}

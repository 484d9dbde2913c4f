//! Dense solve of the assembled subcircuit systems.

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};

/// LU-factor `a` and solve `a * x = b`.
///
/// Shapes are checked up front: a non-square matrix or a mismatched RHS
/// means the assembly indexed a net or branch inconsistently, and that is
/// reported as an error instead of panicking inside the factorization. A
/// singular matrix (typical for contradictory ideal sources) comes back as
/// an error the tick degrades to zeros.
pub fn solve_dense(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
    if a.nrows() != a.ncols() {
        return Err(Error::DimensionMismatch {
            expected: a.nrows(),
            actual: a.ncols(),
        });
    }
    if a.nrows() != b.len() {
        return Err(Error::DimensionMismatch {
            expected: a.nrows(),
            actual: b.len(),
        });
    }

    a.clone().lu().solve(b).ok_or(Error::SingularMatrix)
}

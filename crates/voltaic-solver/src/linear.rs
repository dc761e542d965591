//! Dense LU factorization with partial pivoting.
//!
//! Hand-rolled rather than delegated so that pivot failure is observable at
//! the [`PIVOT_EPS`] threshold: the MNA engine needs `Singular` as a precise,
//! recoverable signal, not a generic solve failure.

use nalgebra::{DMatrix, DVector};
use voltaic_core::error::{Error, Result};

/// A pivot below this magnitude means the system is singular.
pub const PIVOT_EPS: f64 = 1e-18;

/// LU factors of a square matrix, stored in-place with the pivot permutation.
#[derive(Debug, Clone)]
pub struct LuFactors {
    lu: DMatrix<f64>,
    piv: Vec<usize>,
}

/// Factor `A = P·L·U` with partial (row) pivoting.
pub fn factor(a: &DMatrix<f64>) -> Result<LuFactors> {
    let n = a.nrows();
    debug_assert_eq!(n, a.ncols(), "LU requires a square matrix");

    let mut lu = a.clone();
    let mut piv: Vec<usize> = (0..n).collect();

    for k in 0..n {
        let mut p = k;
        let mut best = lu[(k, k)].abs();
        for i in k + 1..n {
            let candidate = lu[(i, k)].abs();
            if candidate > best {
                best = candidate;
                p = i;
            }
        }
        if best < PIVOT_EPS {
            return Err(Error::Singular);
        }
        if p != k {
            lu.swap_rows(k, p);
            piv.swap(k, p);
        }

        let pivot = lu[(k, k)];
        for i in k + 1..n {
            let m = lu[(i, k)] / pivot;
            lu[(i, k)] = m;
            for j in k + 1..n {
                let delta = m * lu[(k, j)];
                lu[(i, j)] -= delta;
            }
        }
    }

    Ok(LuFactors { lu, piv })
}

impl LuFactors {
    /// System dimension.
    pub fn dim(&self) -> usize {
        self.piv.len()
    }

    /// Solve `A·x = b` using the stored factors.
    pub fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        let n = self.dim();
        debug_assert_eq!(n, b.len());

        // Forward substitution on the permuted RHS (L has unit diagonal).
        let mut x = DVector::zeros(n);
        for i in 0..n {
            let mut sum = b[self.piv[i]];
            for j in 0..i {
                sum -= self.lu[(i, j)] * x[j];
            }
            x[i] = sum;
        }

        // Back substitution.
        for i in (0..n).rev() {
            let mut sum = x[i];
            for j in i + 1..n {
                sum -= self.lu[(i, j)] * x[j];
            }
            x[i] = sum / self.lu[(i, i)];
        }

        x
    }
}

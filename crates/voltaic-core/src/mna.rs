//! MNA matrix storage and the stamping surface handed to element plugins.
//!
//! Stamps write through the [`MatrixBuilder`] abstraction, so the dense
//! baseline storage here can be swapped for a sparse backend without touching
//! any device code.

use nalgebra::{DMatrix, DVector};

/// Additive writer into the system matrix and right-hand side.
pub trait MatrixBuilder {
    /// Add `value` at `(row, col)`.
    fn add(&mut self, row: usize, col: usize, value: f64);
    /// Add `value` to the RHS at `row`.
    fn add_rhs(&mut self, row: usize, value: f64);
}

/// Companion-model integration rule for reactive elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationMethod {
    /// First order, A-stable, most robust.
    BackwardEuler,
    /// Second order, A-stable; the default.
    Trapezoidal,
}

/// Dense MNA system: matrix `A` and right-hand side `z`.
///
/// Rows/columns `0..num_nodes` are non-ground node equations; the rest are
/// branch equations of voltage-defined elements. Ground is eliminated: every
/// stamp helper takes `Option<usize>` indices where `None` means ground and
/// the contribution is dropped.
#[derive(Debug, Clone)]
pub struct MnaSystem {
    num_nodes: usize,
    matrix: DMatrix<f64>,
    rhs: DVector<f64>,
}

impl MnaSystem {
    /// Allocate a zeroed system.
    pub fn new(dim: usize, num_nodes: usize) -> Self {
        Self {
            num_nodes,
            matrix: DMatrix::zeros(dim, dim),
            rhs: DVector::zeros(dim),
        }
    }

    /// System dimension.
    pub fn dim(&self) -> usize {
        self.rhs.len()
    }

    /// Count of non-ground node rows.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// The system matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Mutable access to the system matrix.
    pub fn matrix_mut(&mut self) -> &mut DMatrix<f64> {
        &mut self.matrix
    }

    /// The right-hand side.
    pub fn rhs(&self) -> &DVector<f64> {
        &self.rhs
    }

    /// Mutable access to the right-hand side.
    pub fn rhs_mut(&mut self) -> &mut DVector<f64> {
        &mut self.rhs
    }

    /// Zero the matrix and RHS.
    pub fn clear(&mut self) {
        self.matrix.fill(0.0);
        self.rhs.fill(0.0);
    }

    /// Stamp a conductance `g` between two nodes.
    pub fn stamp_conductance(&mut self, a: Option<usize>, b: Option<usize>, g: f64) {
        if let Some(i) = a {
            self.matrix[(i, i)] += g;
        }
        if let Some(i) = b {
            self.matrix[(i, i)] += g;
        }
        if let (Some(i), Some(j)) = (a, b) {
            self.matrix[(i, j)] -= g;
            self.matrix[(j, i)] -= g;
        }
    }

    /// Stamp a current source driving `i` amps from node `from` to node `to`
    /// through the source (injection into `to`).
    pub fn stamp_current_source(&mut self, from: Option<usize>, to: Option<usize>, i: f64) {
        if let Some(n) = from {
            self.rhs[n] -= i;
        }
        if let Some(n) = to {
            self.rhs[n] += i;
        }
    }

    /// Stamp the incidence pattern of a voltage-defined branch: couples the
    /// branch current `aux` into the node equations and the node voltages
    /// into the branch equation. The branch current is positive flowing from
    /// `pos` to `neg` through the element.
    pub fn stamp_voltage_row(&mut self, pos: Option<usize>, neg: Option<usize>, aux: usize) {
        if let Some(i) = pos {
            self.matrix[(i, aux)] += 1.0;
            self.matrix[(aux, i)] += 1.0;
        }
        if let Some(i) = neg {
            self.matrix[(i, aux)] -= 1.0;
            self.matrix[(aux, i)] -= 1.0;
        }
    }
}

impl MatrixBuilder for MnaSystem {
    fn add(&mut self, row: usize, col: usize, value: f64) {
        self.matrix[(row, col)] += value;
    }

    fn add_rhs(&mut self, row: usize, value: f64) {
        self.rhs[row] += value;
    }
}

/// View handed to `stamp_dynamic`: the writable system plus the iteration
/// state the companion and linearized models read.
pub struct StampContext<'a> {
    /// Writable matrix and RHS.
    pub sys: &'a mut MnaSystem,
    /// Current Newton candidate solution.
    pub x: &'a DVector<f64>,
    /// Solution at the previous accepted time step.
    pub x_prev: &'a DVector<f64>,
    /// Step size being attempted.
    pub dt: f64,
    /// Time being solved for (end of the step).
    pub t: f64,
    /// Active integration rule.
    pub method: IntegrationMethod,
}

impl StampContext<'_> {
    /// Candidate voltage at a node index (`None` = ground = 0 V).
    pub fn voltage(&self, index: Option<usize>) -> f64 {
        index.map(|i| self.x[i]).unwrap_or(0.0)
    }

    /// Previously accepted voltage at a node index.
    pub fn prev_voltage(&self, index: Option<usize>) -> f64 {
        index.map(|i| self.x_prev[i]).unwrap_or(0.0)
    }
}

/// View handed to `on_iter_accept` after a time step is accepted.
pub struct AcceptContext<'a> {
    /// The accepted solution.
    pub x: &'a DVector<f64>,
    /// Step size that produced it.
    pub dt: f64,
    /// Accepted time.
    pub t: f64,
    /// Active integration rule.
    pub method: IntegrationMethod,
}

impl AcceptContext<'_> {
    /// Accepted voltage at a node index (`None` = ground = 0 V).
    pub fn voltage(&self, index: Option<usize>) -> f64 {
        index.map(|i| self.x[i]).unwrap_or(0.0)
    }
}

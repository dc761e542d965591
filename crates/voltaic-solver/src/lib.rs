//! Solvers and the transient driver for Voltaic.
//!
//! - [`linear`] - dense LU with partial pivoting
//! - [`mna`] - MNA assembly, Newton iteration, solution accessors
//! - [`transient`] - adaptive step-size driver
//! - [`trace`] - probe-fed result recording and interpolation

pub mod linear;
pub mod mna;
pub mod trace;
pub mod transient;

pub use linear::{LuFactors, PIVOT_EPS, factor};
pub use mna::{ABS_TOL, BuildMna, MAX_NEWTON_ITER, Mna, RELTOL};
pub use trace::{Trace, TracePoint};
pub use transient::{CancelToken, SimOptions, SimStats, simulate, simulate_with};

//! Error types shared across the Voltaic crates.

use crate::ids::ElementId;

/// Errors produced while loading, building, or solving a circuit.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Netlist text is malformed.
    #[error("parse error at line {line}: {reason}")]
    ParseError { line: usize, reason: String },

    /// Element kind prefix is not registered.
    #[error("unknown element kind: {token}")]
    UnknownElementKind { token: String },

    /// Wrong number of wire fields for the element kind.
    #[error("{kind} takes {expected} pins, got {got}")]
    PinCountMismatch {
        kind: &'static str,
        expected: usize,
        got: usize,
    },

    /// No element references the ground wire (wire 0).
    #[error("no element references the ground wire")]
    NoGround,

    /// The circuit produces an empty system (no unknowns to solve for).
    #[error("matrix build failed: circuit has no unknowns")]
    MatrixBuildFailed,

    /// A pivot fell below `PIVOT_EPS` during LU factorization. The transient
    /// driver treats this as per-step non-convergence, not a hard failure.
    #[error("singular matrix")]
    Singular,

    /// The step size shrank to its floor and solves still failed repeatedly.
    #[error("transient analysis failed to converge")]
    ConvergenceFailure,

    /// The host requested termination between time steps.
    #[error("simulation cancelled")]
    Cancelled,

    /// An element id that does not exist in the circuit.
    #[error("unknown element {element}")]
    UnknownElement { element: ElementId },

    /// Two elements were added with the same id.
    #[error("duplicate element {element}")]
    DuplicateElement { element: ElementId },

    /// A current-controlled source references an element that carries no
    /// branch current unknown.
    #[error("element {element} is not a valid control reference")]
    ControlReference { element: ElementId },

    /// Netlist file I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout Voltaic.
pub type Result<T> = std::result::Result<T, Error>;

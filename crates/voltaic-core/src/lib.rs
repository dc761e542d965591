//! Core circuit representation for Voltaic.
//!
//! This crate owns everything the solver and device crates agree on:
//!
//! - [`ids`] - integer identifiers for elements and wires
//! - [`kind`] - element kinds, per-kind metadata, and the prefix registry
//! - [`values`] - named scalar parameters per element
//! - [`waveform`] - time-varying source waveforms
//! - [`graph`] - the element↔wire incidence graph
//! - [`nodes`] - electrical nodes, ground elimination, auxiliary indices
//! - [`netlist`] - the line-oriented netlist reader/emitter
//! - [`mna`] - dense MNA matrix storage and the stamping contract
//! - [`error`] - the shared error taxonomy

pub mod circuit;
pub mod error;
pub mod graph;
pub mod ids;
pub mod kind;
pub mod mna;
pub mod netlist;
pub mod nodes;
pub mod values;
pub mod waveform;

pub use circuit::Circuit;
pub use error::{Error, Result};
pub use graph::{Element, WireLink};
pub use ids::{ElementId, WireId};
pub use kind::{ElementKind, KindRegistry};
pub use mna::{AcceptContext, IntegrationMethod, MatrixBuilder, MnaSystem, StampContext};
pub use nodes::NodeGraph;
pub use values::ValueMap;
pub use waveform::Waveform;

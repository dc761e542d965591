//! Integer identifiers for circuit entities.
//!
//! Elements and wires are referenced by plain integer ids supplied by the
//! netlist. All cross-references in the circuit graph are ids, never owning
//! pointers, so the element↔wire incidence cycle stays acyclic in ownership
//! terms.

use std::fmt;

/// Identifier of a circuit element, unique within a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(u32);

impl ElementId {
    /// Create an element id.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw integer value.
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an electrical net. Wire 0 is the ground reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WireId(u32);

impl WireId {
    /// The ground wire.
    pub const GROUND: WireId = WireId(0);

    /// Create a wire id.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw integer value.
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Whether this wire is the ground reference.
    pub const fn is_ground(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ground_convention() {
        assert!(WireId::GROUND.is_ground());
        assert!(WireId::new(0).is_ground());
        assert!(!WireId::new(1).is_ground());
    }
}

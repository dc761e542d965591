//! The circuit: element table, wire incidence, and kind registry.

use std::path::Path;

use crate::error::{Error, Result};
use crate::graph::{Element, WireLink};
use crate::ids::ElementId;
use crate::kind::KindRegistry;
use crate::netlist;

/// A circuit under construction or loaded from netlist text.
///
/// Topology is append-only: elements may be added but their kind and pin
/// wiring never change. Parameter values are free to change until an MNA
/// system is built from the circuit; afterwards the solver's
/// `stamp_refresh` must be called to pick changes up.
#[derive(Debug, Clone)]
pub struct Circuit {
    registry: KindRegistry,
    link: WireLink,
}

impl Circuit {
    /// An empty circuit with the standard kind registry.
    pub fn new() -> Self {
        Self::with_registry(KindRegistry::standard())
    }

    /// An empty circuit with a caller-supplied registry.
    pub fn with_registry(registry: KindRegistry) -> Self {
        Self {
            registry,
            link: WireLink::new(),
        }
    }

    /// Load a netlist file with the standard registry.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::load_str(&text)
    }

    /// Parse netlist text with the standard registry.
    pub fn load_str(text: &str) -> Result<Self> {
        Self::load_str_with(KindRegistry::standard(), text)
    }

    /// Parse netlist text with a caller-supplied registry.
    pub fn load_str_with(registry: KindRegistry, text: &str) -> Result<Self> {
        netlist::parse(registry, text)
    }

    /// Write the circuit back out as netlist text.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.export_string())?;
        Ok(())
    }

    /// Render the circuit as netlist text.
    pub fn export_string(&self) -> String {
        netlist::emit(self)
    }

    /// The kind registry in use.
    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    /// The element↔wire incidence graph.
    pub fn link(&self) -> &WireLink {
        &self.link
    }

    /// Add an element. Fails on duplicate ids or pin-count mismatches.
    pub fn add_element(&mut self, element: Element) -> Result<()> {
        self.link.insert_element(element)
    }

    /// Look up an element.
    pub fn element(&self, id: ElementId) -> Result<&Element> {
        self.link
            .element(id)
            .ok_or(Error::UnknownElement { element: id })
    }

    /// Set a named parameter on an element.
    ///
    /// If the element carries a source waveform, the waveform keeps
    /// precedence over the `dc` value.
    pub fn set_element_value(&mut self, id: ElementId, name: &str, value: f64) -> Result<()> {
        let element = self
            .link
            .element_mut(id)
            .ok_or(Error::UnknownElement { element: id })?;
        element.values.set(name, value);
        Ok(())
    }
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ElementKind;

    #[test]
    fn test_set_element_value() {
        let mut circuit = Circuit::new();
        circuit
            .add_element(Element::new(1, ElementKind::Resistor, &[1, 0]).with_value("r", 10.0))
            .unwrap();

        circuit
            .set_element_value(ElementId::new(1), "r", 22.0)
            .unwrap();
        assert_eq!(
            circuit.element(ElementId::new(1)).unwrap().values.get("r"),
            Some(22.0)
        );

        let err = circuit
            .set_element_value(ElementId::new(9), "r", 1.0)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownElement { .. }));
    }
}

//! Elements and the element↔wire incidence graph.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::ids::{ElementId, WireId};
use crate::kind::ElementKind;
use crate::values::ValueMap;
use crate::waveform::Waveform;

/// A circuit element: kind, pin wiring, and named parameters.
///
/// Topology (kind and pins) is frozen once the element enters a circuit;
/// parameter values may be mutated until an MNA system is built, and after
/// that only through `set_element_value` + `stamp_refresh`.
#[derive(Debug, Clone)]
pub struct Element {
    pub id: ElementId,
    pub kind: ElementKind,
    /// Wires in pin order; length equals `kind.post_count()`.
    pub pins: Vec<WireId>,
    pub values: ValueMap,
    /// Time-varying drive for independent sources; `None` means the `dc`
    /// value applies.
    pub source: Option<Waveform>,
}

impl Element {
    /// Create an element connecting the given wires.
    pub fn new(id: u32, kind: ElementKind, pins: &[u32]) -> Self {
        Self {
            id: ElementId::new(id),
            kind,
            pins: pins.iter().copied().map(WireId::new).collect(),
            values: ValueMap::new(),
            source: None,
        }
    }

    /// Builder-style parameter assignment.
    pub fn with_value(mut self, name: &str, value: f64) -> Self {
        self.values.set(name, value);
        self
    }

    /// Builder-style waveform assignment (independent sources).
    pub fn with_source(mut self, waveform: Waveform) -> Self {
        self.source = Some(waveform);
        self
    }
}

/// Bipartite incidence between elements and wires.
///
/// Elements are owned by a flat insertion-ordered table; wires hold id
/// back-references. Iteration order is netlist order, which keeps stamping
/// and export deterministic.
#[derive(Debug, Clone, Default)]
pub struct WireLink {
    elements: IndexMap<ElementId, Element>,
    wires: IndexMap<WireId, Vec<(ElementId, usize)>>,
}

impl WireLink {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an element and record all of its pin incidences.
    pub fn insert_element(&mut self, element: Element) -> Result<()> {
        if element.kind.post_count() != element.pins.len() {
            return Err(Error::PinCountMismatch {
                kind: element.kind.name(),
                expected: element.kind.post_count(),
                got: element.pins.len(),
            });
        }
        if self.elements.contains_key(&element.id) {
            return Err(Error::DuplicateElement {
                element: element.id,
            });
        }
        let id = element.id;
        let pins = element.pins.clone();
        self.elements.insert(id, element);
        for (pin_index, wire) in pins.into_iter().enumerate() {
            self.add_pin(wire, id, pin_index);
        }
        Ok(())
    }

    /// Record that `element`'s pin `pin_index` attaches to `wire`.
    /// Idempotent on repeated identical triples.
    pub fn add_pin(&mut self, wire: WireId, element: ElementId, pin_index: usize) {
        let entry = self.wires.entry(wire).or_default();
        if !entry.contains(&(element, pin_index)) {
            entry.push((element, pin_index));
        }
    }

    /// All `(element, pin_index)` attachments on a wire.
    pub fn elements_on(&self, wire: WireId) -> &[(ElementId, usize)] {
        self.wires.get(&wire).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The wires an element's pins attach to, in pin order.
    pub fn wires_of(&self, element: ElementId) -> Option<&[WireId]> {
        self.elements.get(&element).map(|e| e.pins.as_slice())
    }

    /// Look up an element.
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    /// Look up an element mutably.
    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(&id)
    }

    /// Iterate elements in insertion order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// Iterate known wires in first-seen order.
    pub fn wires(&self) -> impl Iterator<Item = WireId> + '_ {
        self.wires.keys().copied()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the graph holds no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

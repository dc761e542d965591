//! Electrical node graph derived from the wire incidence.
//!
//! Wires that are hard-shorted together (jumper elements) collapse into a
//! single node via union-find. Node 0 is ground: the class containing wire 0.
//! Non-ground nodes occupy the first `n_nodes` rows/columns of the MNA
//! matrix; each voltage-defined element gets one auxiliary row/column after
//! them.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::graph::WireLink;
use crate::ids::{ElementId, WireId};

/// Union-find over wire slots with path compression.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut walk = i;
        while self.parent[walk] != root {
            let next = self.parent[walk];
            self.parent[walk] = root;
            walk = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

/// Node indexing for one circuit topology.
#[derive(Debug, Clone)]
pub struct NodeGraph {
    /// Wire → node index; node 0 is ground.
    node_of_wire: IndexMap<WireId, usize>,
    n_nodes: usize,
    /// Voltage-defined element → absolute auxiliary matrix index (≥ n_nodes).
    aux_index_of_element: IndexMap<ElementId, usize>,
    matrix_dim: usize,
}

impl NodeGraph {
    /// Collapse wires into nodes and assign matrix indices.
    ///
    /// Fails with [`Error::NoGround`] when no element pin touches wire 0.
    pub fn build(link: &WireLink) -> Result<Self> {
        let wires: Vec<WireId> = link.wires().collect();
        let slot_of_wire: IndexMap<WireId, usize> =
            wires.iter().enumerate().map(|(i, &w)| (w, i)).collect();

        if !wires.contains(&WireId::GROUND) || link.elements_on(WireId::GROUND).is_empty() {
            return Err(Error::NoGround);
        }

        let mut uf = UnionFind::new(wires.len());
        for element in link.elements() {
            if element.kind.is_short_circuit() && element.pins.len() == 2 {
                uf.union(slot_of_wire[&element.pins[0]], slot_of_wire[&element.pins[1]]);
            }
        }

        // Ground class first, remaining classes indexed 1..=n_nodes in
        // wire-discovery order.
        let ground_root = uf.find(slot_of_wire[&WireId::GROUND]);
        let mut node_of_root: IndexMap<usize, usize> = IndexMap::new();
        node_of_root.insert(ground_root, 0);
        let mut node_of_wire = IndexMap::new();
        for &wire in &wires {
            let root = uf.find(slot_of_wire[&wire]);
            let next = node_of_root.len();
            let node = *node_of_root.entry(root).or_insert(next);
            node_of_wire.insert(wire, node);
        }
        let n_nodes = node_of_root.len() - 1;

        let mut aux_index_of_element = IndexMap::new();
        let mut next_aux = n_nodes;
        for element in link.elements() {
            if element.kind.is_voltage_defined() {
                aux_index_of_element.insert(element.id, next_aux);
                next_aux += 1;
            }
        }

        let graph = Self {
            node_of_wire,
            n_nodes,
            aux_index_of_element,
            matrix_dim: next_aux,
        };
        graph.warn_floating(link);
        Ok(graph)
    }

    /// Cheap floating-node check: a non-ground node attached to fewer than
    /// two element pins cannot carry current. The full DC-path-to-ground
    /// search is intentionally not performed here.
    fn warn_floating(&self, link: &WireLink) {
        let mut pin_count = vec![0usize; self.n_nodes + 1];
        for (&wire, &node) in &self.node_of_wire {
            pin_count[node] += link.elements_on(wire).len();
        }
        for (node, &count) in pin_count.iter().enumerate().skip(1) {
            if count < 2 {
                log::warn!("node {node} is attached to {count} pin(s); it may be floating");
            }
        }
    }

    /// Node index of a wire (0 = ground). `None` for wires absent from the
    /// circuit.
    pub fn node_of_wire(&self, wire: WireId) -> Option<usize> {
        self.node_of_wire.get(&wire).copied()
    }

    /// Matrix row/column of a wire's node; `None` for ground or unknown
    /// wires. Row k holds node k+1.
    pub fn matrix_index(&self, wire: WireId) -> Option<usize> {
        match self.node_of_wire(wire) {
            Some(0) | None => None,
            Some(node) => Some(node - 1),
        }
    }

    /// Absolute auxiliary matrix index of a voltage-defined element.
    pub fn aux_index(&self, element: ElementId) -> Option<usize> {
        self.aux_index_of_element.get(&element).copied()
    }

    /// Count of non-ground nodes.
    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    /// Count of auxiliary current unknowns.
    pub fn n_aux(&self) -> usize {
        self.aux_index_of_element.len()
    }

    /// Full MNA system dimension.
    pub fn matrix_dim(&self) -> usize {
        self.matrix_dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Element;
    use crate::kind::ElementKind;

    fn resistor(id: u32, a: u32, b: u32) -> Element {
        Element::new(id, ElementKind::Resistor, &[a, b]).with_value("r", 1.0)
    }

    #[test]
    fn test_simple_indexing() {
        let mut link = WireLink::new();
        link.insert_element(
            Element::new(0, ElementKind::VoltageSource, &[0, 1]).with_value("dc", 5.0),
        )
        .unwrap();
        link.insert_element(resistor(1, 1, 2)).unwrap();
        link.insert_element(resistor(2, 2, 0)).unwrap();

        let nodes = NodeGraph::build(&link).unwrap();
        assert_eq!(nodes.n_nodes(), 2);
        assert_eq!(nodes.n_aux(), 1);
        assert_eq!(nodes.matrix_dim(), 3);

        assert_eq!(nodes.node_of_wire(WireId::GROUND), Some(0));
        assert_eq!(nodes.matrix_index(WireId::GROUND), None);
        assert_eq!(nodes.matrix_index(WireId::new(1)), Some(0));
        assert_eq!(nodes.matrix_index(WireId::new(2)), Some(1));
        assert_eq!(nodes.aux_index(ElementId::new(0)), Some(2));
    }

    #[test]
    fn test_jumper_collapses_wires() {
        let mut link = WireLink::new();
        link.insert_element(resistor(1, 1, 0)).unwrap();
        link.insert_element(Element::new(2, ElementKind::Jumper, &[1, 2]))
            .unwrap();
        link.insert_element(resistor(3, 2, 0)).unwrap();

        let nodes = NodeGraph::build(&link).unwrap();
        assert_eq!(nodes.n_nodes(), 1, "wires 1 and 2 are one node");
        assert_eq!(
            nodes.matrix_index(WireId::new(1)),
            nodes.matrix_index(WireId::new(2))
        );
    }

    #[test]
    fn test_jumper_to_ground() {
        let mut link = WireLink::new();
        link.insert_element(Element::new(1, ElementKind::Jumper, &[0, 5]))
            .unwrap();
        link.insert_element(resistor(2, 5, 6)).unwrap();
        link.insert_element(resistor(3, 6, 0)).unwrap();

        let nodes = NodeGraph::build(&link).unwrap();
        assert_eq!(nodes.node_of_wire(WireId::new(5)), Some(0), "shorted to ground");
        assert_eq!(nodes.matrix_index(WireId::new(5)), None);
        assert_eq!(nodes.n_nodes(), 1);
    }

    #[test]
    fn test_no_ground_rejected() {
        let mut link = WireLink::new();
        link.insert_element(resistor(1, 1, 2)).unwrap();
        assert!(matches!(NodeGraph::build(&link), Err(Error::NoGround)));
    }

    #[test]
    fn test_aux_per_voltage_defined_element() {
        let mut link = WireLink::new();
        link.insert_element(
            Element::new(0, ElementKind::VoltageSource, &[0, 1]).with_value("dc", 1.0),
        )
        .unwrap();
        link.insert_element(
            Element::new(1, ElementKind::Inductor, &[1, 2]).with_value("l", 1e-3),
        )
        .unwrap();
        link.insert_element(resistor(2, 2, 0)).unwrap();

        let nodes = NodeGraph::build(&link).unwrap();
        assert_eq!(nodes.n_nodes(), 2);
        assert_eq!(nodes.n_aux(), 2);
        assert_eq!(nodes.aux_index(ElementId::new(0)), Some(2));
        assert_eq!(nodes.aux_index(ElementId::new(1)), Some(3));
        assert_eq!(nodes.aux_index(ElementId::new(2)), None);
    }
}

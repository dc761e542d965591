//! Element kinds and the prefix registry.
//!
//! Every element kind carries static metadata: how many pins it has, whether
//! it introduces a branch current unknown, whether its stamp is nonlinear,
//! and whether it needs companion-model integration. The stamping engine and
//! the node graph builder consult this metadata instead of matching on kinds
//! directly wherever possible.

use std::collections::HashMap;

/// The kind of a circuit element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Independent voltage source (`V`). Second pin is the positive terminal.
    VoltageSource,
    /// Independent current source (`I`). Positive current flows from the
    /// first pin to the second through the source.
    CurrentSource,
    /// Resistor (`R`).
    Resistor,
    /// Capacitor (`C`).
    Capacitor,
    /// Inductor (`L`).
    Inductor,
    /// Shockley diode (`D`). First pin is the anode.
    Diode,
    /// Voltage-controlled switch (`S`): two switched pins, two control pins.
    Switch,
    /// Voltage-controlled voltage source (`E`).
    Vcvs,
    /// Voltage-controlled current source (`G`).
    Vccs,
    /// Current-controlled current source (`F`).
    Cccs,
    /// Current-controlled voltage source (`H`).
    Ccvs,
    /// Zero-ohm jumper (`W`). Its two wires collapse into one node.
    Jumper,
    /// Sentinel for unregistered kinds.
    Unknown,
}

/// Positional value schema entry: key name and default (`None` = required).
pub type ValueKey = (&'static str, Option<f64>);

impl ElementKind {
    /// Number of pins (posts) the kind connects.
    pub fn post_count(self) -> usize {
        match self {
            ElementKind::Switch | ElementKind::Vcvs | ElementKind::Vccs => 4,
            ElementKind::Unknown => 0,
            _ => 2,
        }
    }

    /// Whether the kind defines a branch voltage and therefore needs an
    /// auxiliary current unknown in the MNA system.
    pub fn is_voltage_defined(self) -> bool {
        matches!(
            self,
            ElementKind::VoltageSource
                | ElementKind::Inductor
                | ElementKind::Vcvs
                | ElementKind::Ccvs
        )
    }

    /// Whether the kind's stamp depends on the solution (Newton iteration).
    pub fn needs_iteration(self) -> bool {
        matches!(self, ElementKind::Diode)
    }

    /// Whether the kind stores energy and needs companion-model integration.
    pub fn is_reactive(self) -> bool {
        matches!(self, ElementKind::Capacitor | ElementKind::Inductor)
    }

    /// Whether the kind is a hard short: its pin wires belong to the same
    /// electrical node. Controlled switches are *not* shorts; they stamp as
    /// finite resistances so they can toggle mid-run.
    pub fn is_short_circuit(self) -> bool {
        matches!(self, ElementKind::Jumper)
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            ElementKind::VoltageSource => "voltage source",
            ElementKind::CurrentSource => "current source",
            ElementKind::Resistor => "resistor",
            ElementKind::Capacitor => "capacitor",
            ElementKind::Inductor => "inductor",
            ElementKind::Diode => "diode",
            ElementKind::Switch => "switch",
            ElementKind::Vcvs => "VCVS",
            ElementKind::Vccs => "VCCS",
            ElementKind::Cccs => "CCCS",
            ElementKind::Ccvs => "CCVS",
            ElementKind::Jumper => "jumper",
            ElementKind::Unknown => "unknown",
        }
    }

    /// Netlist prefix letter.
    pub fn prefix(self) -> char {
        match self {
            ElementKind::VoltageSource => 'V',
            ElementKind::CurrentSource => 'I',
            ElementKind::Resistor => 'R',
            ElementKind::Capacitor => 'C',
            ElementKind::Inductor => 'L',
            ElementKind::Diode => 'D',
            ElementKind::Switch => 'S',
            ElementKind::Vcvs => 'E',
            ElementKind::Vccs => 'G',
            ElementKind::Cccs => 'F',
            ElementKind::Ccvs => 'H',
            ElementKind::Jumper => 'W',
            ElementKind::Unknown => '?',
        }
    }

    /// Positional value schema: the named parameters the kind accepts after
    /// its pin fields, in netlist order.
    pub fn value_keys(self) -> &'static [ValueKey] {
        match self {
            ElementKind::VoltageSource | ElementKind::CurrentSource => &[("dc", Some(0.0))],
            ElementKind::Resistor => &[("r", None)],
            ElementKind::Capacitor => &[("c", None), ("ic", Some(0.0))],
            ElementKind::Inductor => &[("l", None), ("ic", Some(0.0))],
            ElementKind::Diode => &[("is", Some(1e-14))],
            ElementKind::Switch => &[
                ("vt", Some(0.0)),
                ("ron", Some(1e-3)),
                ("roff", Some(1e9)),
            ],
            ElementKind::Vcvs | ElementKind::Vccs => &[("gain", None)],
            ElementKind::Cccs | ElementKind::Ccvs => &[("ctrl", None), ("gain", None)],
            ElementKind::Jumper | ElementKind::Unknown => &[],
        }
    }
}

/// Registry mapping netlist prefix letters to element kinds.
///
/// Constructed once at program start and handed to the [`Circuit`]; there is
/// no process-wide mutable registry.
///
/// [`Circuit`]: crate::circuit::Circuit
#[derive(Debug, Clone)]
pub struct KindRegistry {
    by_prefix: HashMap<char, ElementKind>,
}

impl KindRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            by_prefix: HashMap::new(),
        }
    }

    /// The registry containing every built-in kind.
    pub fn standard() -> Self {
        let mut reg = Self::new();
        for kind in [
            ElementKind::VoltageSource,
            ElementKind::CurrentSource,
            ElementKind::Resistor,
            ElementKind::Capacitor,
            ElementKind::Inductor,
            ElementKind::Diode,
            ElementKind::Switch,
            ElementKind::Vcvs,
            ElementKind::Vccs,
            ElementKind::Cccs,
            ElementKind::Ccvs,
            ElementKind::Jumper,
        ] {
            reg.register(kind);
        }
        reg
    }

    /// Register a kind under its prefix letter.
    pub fn register(&mut self, kind: ElementKind) {
        self.by_prefix.insert(kind.prefix(), kind);
    }

    /// Look up a prefix letter. Returns [`ElementKind::Unknown`] for
    /// unregistered prefixes.
    pub fn lookup(&self, prefix: char) -> ElementKind {
        self.by_prefix
            .get(&prefix.to_ascii_uppercase())
            .copied()
            .unwrap_or(ElementKind::Unknown)
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_metadata() {
        assert_eq!(ElementKind::Resistor.post_count(), 2);
        assert_eq!(ElementKind::Switch.post_count(), 4);
        assert_eq!(ElementKind::Vcvs.post_count(), 4);

        assert!(ElementKind::VoltageSource.is_voltage_defined());
        assert!(ElementKind::Inductor.is_voltage_defined());
        assert!(!ElementKind::Capacitor.is_voltage_defined());

        assert!(ElementKind::Diode.needs_iteration());
        assert!(!ElementKind::Resistor.needs_iteration());

        assert!(ElementKind::Capacitor.is_reactive());
        assert!(ElementKind::Inductor.is_reactive());
        assert!(!ElementKind::Diode.is_reactive());

        assert!(ElementKind::Jumper.is_short_circuit());
        assert!(!ElementKind::Switch.is_short_circuit());
    }

    #[test]
    fn test_registry_lookup() {
        let reg = KindRegistry::standard();
        assert_eq!(reg.lookup('V'), ElementKind::VoltageSource);
        assert_eq!(reg.lookup('r'), ElementKind::Resistor);
        assert_eq!(reg.lookup('X'), ElementKind::Unknown);
    }

    #[test]
    fn test_prefixes_unique() {
        let mut seen = HashMap::new();
        for kind in [
            ElementKind::VoltageSource,
            ElementKind::CurrentSource,
            ElementKind::Resistor,
            ElementKind::Capacitor,
            ElementKind::Inductor,
            ElementKind::Diode,
            ElementKind::Switch,
            ElementKind::Vcvs,
            ElementKind::Vccs,
            ElementKind::Cccs,
            ElementKind::Ccvs,
            ElementKind::Jumper,
        ] {
            let prev = seen.insert(kind.prefix(), kind);
            assert!(prev.is_none(), "duplicate prefix {}", kind.prefix());
        }
    }
}

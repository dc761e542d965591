//! Resistors.

use nalgebra::DVector;
use voltaic_core::graph::Element;
use voltaic_core::ids::ElementId;
use voltaic_core::mna::MnaSystem;

/// A resistor bound to its matrix indices.
#[derive(Debug, Clone)]
pub struct Resistor {
    pub id: ElementId,
    pub pos: Option<usize>,
    pub neg: Option<usize>,
    g: f64,
}

impl Resistor {
    pub fn new(id: ElementId, pos: Option<usize>, neg: Option<usize>, resistance: f64) -> Self {
        Self {
            id,
            pos,
            neg,
            g: Self::conductance(resistance),
        }
    }

    /// Zero-ohm resistors degrade to a large finite conductance; a true
    /// short belongs to the jumper kind.
    fn conductance(resistance: f64) -> f64 {
        if resistance == 0.0 {
            1e12
        } else {
            1.0 / resistance
        }
    }

    pub fn stamp_static(&self, sys: &mut MnaSystem) {
        sys.stamp_conductance(self.pos, self.neg, self.g);
    }

    pub fn refresh(&mut self, element: &Element) {
        self.g = Self::conductance(element.values.get_or("r", f64::INFINITY));
    }

    /// Current from the first pin to the second.
    pub fn current(&self, x: &DVector<f64>) -> f64 {
        let va = self.pos.map(|i| x[i]).unwrap_or(0.0);
        let vb = self.neg.map(|i| x[i]).unwrap_or(0.0);
        self.g * (va - vb)
    }
}

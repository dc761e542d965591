//! Voltage-controlled switch.

use nalgebra::DVector;
use voltaic_core::graph::Element;
use voltaic_core::ids::ElementId;
use voltaic_core::mna::{AcceptContext, StampContext};

/// A switch bound to its matrix indices.
///
/// Stamps as a resistor: `ron` when closed, `roff` when open. The control
/// voltage is sampled only when a step is accepted, so the state cannot
/// chatter inside one Newton solve.
#[derive(Debug, Clone)]
pub struct Switch {
    pub id: ElementId,
    pub pos: Option<usize>,
    pub neg: Option<usize>,
    pub ctrl_pos: Option<usize>,
    pub ctrl_neg: Option<usize>,
    threshold: f64,
    ron: f64,
    roff: f64,
    closed: bool,
    g: f64,
}

impl Switch {
    pub fn new(
        id: ElementId,
        pos: Option<usize>,
        neg: Option<usize>,
        ctrl_pos: Option<usize>,
        ctrl_neg: Option<usize>,
        element: &Element,
    ) -> Self {
        Self {
            id,
            pos,
            neg,
            ctrl_pos,
            ctrl_neg,
            threshold: element.values.get_or("vt", 0.0),
            ron: element.values.get_or("ron", 1e-3),
            roff: element.values.get_or("roff", 1e9),
            closed: false,
            g: 0.0,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn stamp_dynamic(&mut self, ctx: &mut StampContext<'_>) {
        let r = if self.closed { self.ron } else { self.roff };
        self.g = 1.0 / r;
        ctx.sys.stamp_conductance(self.pos, self.neg, self.g);
    }

    pub fn on_iter_accept(&mut self, ctx: &AcceptContext<'_>) {
        let vc = ctx.voltage(self.ctrl_pos) - ctx.voltage(self.ctrl_neg);
        let now_closed = vc > self.threshold;
        if now_closed != self.closed {
            log::debug!(
                "switch {} {} at t = {:.3e} (control {vc:.3} V)",
                self.id,
                if now_closed { "closes" } else { "opens" },
                ctx.t
            );
            self.closed = now_closed;
        }
    }

    pub fn refresh(&mut self, element: &Element) {
        self.threshold = element.values.get_or("vt", self.threshold);
        self.ron = element.values.get_or("ron", self.ron);
        self.roff = element.values.get_or("roff", self.roff);
    }

    /// Current from the first switched pin to the second.
    pub fn current(&self, x: &DVector<f64>) -> f64 {
        let va = self.pos.map(|i| x[i]).unwrap_or(0.0);
        let vb = self.neg.map(|i| x[i]).unwrap_or(0.0);
        self.g * (va - vb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltaic_core::kind::ElementKind;
    use voltaic_core::mna::{IntegrationMethod, MnaSystem};

    fn switch() -> Switch {
        let element = Element::new(3, ElementKind::Switch, &[1, 0, 2, 0])
            .with_value("vt", 0.5)
            .with_value("ron", 1e-3)
            .with_value("roff", 1e9);
        Switch::new(ElementId::new(3), Some(0), None, Some(1), None, &element)
    }

    #[test]
    fn test_open_stamp() {
        let mut s = switch();
        let mut sys = MnaSystem::new(2, 2);
        let x = DVector::zeros(2);
        let x_prev = DVector::zeros(2);
        let mut ctx = StampContext {
            sys: &mut sys,
            x: &x,
            x_prev: &x_prev,
            dt: 1e-6,
            t: 0.0,
            method: IntegrationMethod::Trapezoidal,
        };
        s.stamp_dynamic(&mut ctx);
        assert!((sys.matrix()[(0, 0)] - 1e-9).abs() < 1e-15, "open = 1/roff");
    }

    #[test]
    fn test_threshold_crossing_toggles() {
        let mut s = switch();
        assert!(!s.is_closed());

        let x = DVector::from_vec(vec![0.0, 1.0]); // control node above threshold
        let ctx = AcceptContext {
            x: &x,
            dt: 1e-6,
            t: 1e-6,
            method: IntegrationMethod::Trapezoidal,
        };
        s.on_iter_accept(&ctx);
        assert!(s.is_closed());

        let x = DVector::from_vec(vec![0.0, 0.2]);
        let ctx = AcceptContext {
            x: &x,
            dt: 1e-6,
            t: 2e-6,
            method: IntegrationMethod::Trapezoidal,
        };
        s.on_iter_accept(&ctx);
        assert!(!s.is_closed());
    }
}

//! Independent voltage and current sources.

use nalgebra::DVector;
use voltaic_core::graph::Element;
use voltaic_core::ids::ElementId;
use voltaic_core::mna::{MatrixBuilder, MnaSystem, StampContext};
use voltaic_core::waveform::Waveform;

fn drive_of(element: &Element) -> Waveform {
    element
        .source
        .clone()
        .unwrap_or(Waveform::Dc(element.values.get_or("dc", 0.0)))
}

/// An independent voltage source.
///
/// Netlist pin order is (negative, positive): `V0 0 1 5` drives wire 1 to
/// +5 V. The incidence pattern is time-invariant; only the RHS value moves.
#[derive(Debug, Clone)]
pub struct VoltageSource {
    pub id: ElementId,
    pub pos: Option<usize>,
    pub neg: Option<usize>,
    pub aux: usize,
    drive: Waveform,
}

impl VoltageSource {
    pub fn new(
        id: ElementId,
        pos: Option<usize>,
        neg: Option<usize>,
        aux: usize,
        element: &Element,
    ) -> Self {
        Self {
            id,
            pos,
            neg,
            aux,
            drive: drive_of(element),
        }
    }

    pub fn stamp_static(&self, sys: &mut MnaSystem) {
        sys.stamp_voltage_row(self.pos, self.neg, self.aux);
    }

    pub fn stamp_dynamic(&self, ctx: &mut StampContext<'_>) {
        let value = self.drive.value_at(ctx.t);
        ctx.sys.add_rhs(self.aux, value);
    }

    pub fn refresh(&mut self, element: &Element) {
        self.drive = drive_of(element);
    }

    /// Current from the first pin to the second through the source. The aux
    /// unknown is the branch current flowing positive-to-negative terminal,
    /// so the sign flips.
    pub fn current(&self, x: &DVector<f64>) -> f64 {
        -x[self.aux]
    }
}

/// An independent current source. Positive current flows from the first pin
/// to the second through the source.
#[derive(Debug, Clone)]
pub struct CurrentSource {
    pub id: ElementId,
    pub from: Option<usize>,
    pub to: Option<usize>,
    drive: Waveform,
}

impl CurrentSource {
    pub fn new(id: ElementId, from: Option<usize>, to: Option<usize>, element: &Element) -> Self {
        Self {
            id,
            from,
            to,
            drive: drive_of(element),
        }
    }

    pub fn stamp_dynamic(&self, ctx: &mut StampContext<'_>) {
        let value = self.drive.value_at(ctx.t);
        ctx.sys.stamp_current_source(self.from, self.to, value);
    }

    pub fn refresh(&mut self, element: &Element) {
        self.drive = drive_of(element);
    }

    pub fn current(&self, t: f64) -> f64 {
        self.drive.value_at(t)
    }
}

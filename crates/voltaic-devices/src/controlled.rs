//! Controlled source models: VCVS (E), VCCS (G), CCCS (F), CCVS (H).
//!
//! Gains are time-invariant, so every stamp here lands in the static matrix.
//! Current-controlled sources read the branch current of a voltage-defined
//! element through its auxiliary column.

use nalgebra::DVector;
use voltaic_core::graph::Element;
use voltaic_core::ids::ElementId;
use voltaic_core::mna::{MatrixBuilder, MnaSystem};

/// Voltage-controlled voltage source:
/// `V(out+, out−) = gain · V(ctrl+, ctrl−)`.
#[derive(Debug, Clone)]
pub struct Vcvs {
    pub id: ElementId,
    pub out_pos: Option<usize>,
    pub out_neg: Option<usize>,
    pub ctrl_pos: Option<usize>,
    pub ctrl_neg: Option<usize>,
    pub aux: usize,
    gain: f64,
}

impl Vcvs {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ElementId,
        out_pos: Option<usize>,
        out_neg: Option<usize>,
        ctrl_pos: Option<usize>,
        ctrl_neg: Option<usize>,
        aux: usize,
        gain: f64,
    ) -> Self {
        Self {
            id,
            out_pos,
            out_neg,
            ctrl_pos,
            ctrl_neg,
            aux,
            gain,
        }
    }

    pub fn stamp_static(&self, sys: &mut MnaSystem) {
        sys.stamp_voltage_row(self.out_pos, self.out_neg, self.aux);
        // Branch equation: V(out+) − V(out−) − gain·(V(ctrl+) − V(ctrl−)) = 0
        if let Some(i) = self.ctrl_pos {
            sys.add(self.aux, i, -self.gain);
        }
        if let Some(i) = self.ctrl_neg {
            sys.add(self.aux, i, self.gain);
        }
    }

    pub fn refresh(&mut self, element: &Element) {
        self.gain = element.values.get_or("gain", self.gain);
    }

    pub fn current(&self, x: &DVector<f64>) -> f64 {
        x[self.aux]
    }
}

/// Voltage-controlled current source:
/// `I(out+ → out−) = gm · V(ctrl+, ctrl−)` flowing through the source.
#[derive(Debug, Clone)]
pub struct Vccs {
    pub id: ElementId,
    pub out_pos: Option<usize>,
    pub out_neg: Option<usize>,
    pub ctrl_pos: Option<usize>,
    pub ctrl_neg: Option<usize>,
    gm: f64,
}

impl Vccs {
    pub fn new(
        id: ElementId,
        out_pos: Option<usize>,
        out_neg: Option<usize>,
        ctrl_pos: Option<usize>,
        ctrl_neg: Option<usize>,
        gm: f64,
    ) -> Self {
        Self {
            id,
            out_pos,
            out_neg,
            ctrl_pos,
            ctrl_neg,
            gm,
        }
    }

    pub fn stamp_static(&self, sys: &mut MnaSystem) {
        // gm·V(ctrl) leaves out+ and returns at out−.
        if let Some(i) = self.out_pos {
            if let Some(j) = self.ctrl_pos {
                sys.add(i, j, self.gm);
            }
            if let Some(j) = self.ctrl_neg {
                sys.add(i, j, -self.gm);
            }
        }
        if let Some(i) = self.out_neg {
            if let Some(j) = self.ctrl_pos {
                sys.add(i, j, -self.gm);
            }
            if let Some(j) = self.ctrl_neg {
                sys.add(i, j, self.gm);
            }
        }
    }

    pub fn refresh(&mut self, element: &Element) {
        self.gm = element.values.get_or("gain", self.gm);
    }

    pub fn current(&self, x: &DVector<f64>) -> f64 {
        let vp = self.ctrl_pos.map(|i| x[i]).unwrap_or(0.0);
        let vn = self.ctrl_neg.map(|i| x[i]).unwrap_or(0.0);
        self.gm * (vp - vn)
    }
}

/// Current-controlled current source:
/// `I(out+ → out−) = gain · I(ctrl)` where `ctrl` is a voltage-defined
/// element's branch current.
#[derive(Debug, Clone)]
pub struct Cccs {
    pub id: ElementId,
    pub out_pos: Option<usize>,
    pub out_neg: Option<usize>,
    pub ctrl_aux: usize,
    gain: f64,
}

impl Cccs {
    pub fn new(
        id: ElementId,
        out_pos: Option<usize>,
        out_neg: Option<usize>,
        ctrl_aux: usize,
        gain: f64,
    ) -> Self {
        Self {
            id,
            out_pos,
            out_neg,
            ctrl_aux,
            gain,
        }
    }

    pub fn stamp_static(&self, sys: &mut MnaSystem) {
        if let Some(i) = self.out_pos {
            sys.add(i, self.ctrl_aux, self.gain);
        }
        if let Some(i) = self.out_neg {
            sys.add(i, self.ctrl_aux, -self.gain);
        }
    }

    pub fn refresh(&mut self, element: &Element) {
        self.gain = element.values.get_or("gain", self.gain);
    }

    pub fn current(&self, x: &DVector<f64>) -> f64 {
        self.gain * x[self.ctrl_aux]
    }
}

/// Current-controlled voltage source:
/// `V(out+, out−) = gain · I(ctrl)`.
#[derive(Debug, Clone)]
pub struct Ccvs {
    pub id: ElementId,
    pub out_pos: Option<usize>,
    pub out_neg: Option<usize>,
    pub ctrl_aux: usize,
    pub aux: usize,
    gain: f64,
}

impl Ccvs {
    pub fn new(
        id: ElementId,
        out_pos: Option<usize>,
        out_neg: Option<usize>,
        ctrl_aux: usize,
        aux: usize,
        gain: f64,
    ) -> Self {
        Self {
            id,
            out_pos,
            out_neg,
            ctrl_aux,
            aux,
            gain,
        }
    }

    pub fn stamp_static(&self, sys: &mut MnaSystem) {
        sys.stamp_voltage_row(self.out_pos, self.out_neg, self.aux);
        // Branch equation: V(out+) − V(out−) − gain·I(ctrl) = 0
        sys.add(self.aux, self.ctrl_aux, -self.gain);
    }

    pub fn refresh(&mut self, element: &Element) {
        self.gain = element.values.get_or("gain", self.gain);
    }

    pub fn current(&self, x: &DVector<f64>) -> f64 {
        x[self.aux]
    }
}

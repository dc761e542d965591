//! Companion models for capacitors and inductors.
//!
//! A capacitor becomes a conductance in parallel with a history current
//! source. An inductor is voltage-defined: it keeps a branch current unknown
//! and its discretized branch equation lives in the auxiliary row.

use nalgebra::DVector;
use voltaic_core::graph::Element;
use voltaic_core::ids::ElementId;
use voltaic_core::mna::{AcceptContext, IntegrationMethod, MatrixBuilder, MnaSystem, StampContext};

/// A capacitor bound to its matrix indices.
#[derive(Debug, Clone)]
pub struct Capacitor {
    pub id: ElementId,
    pub pos: Option<usize>,
    pub neg: Option<usize>,
    capacitance: f64,
    /// Voltage at the previous accepted step.
    v_prev: f64,
    /// Companion current at the previous accepted step (trapezoidal history).
    i_prev: f64,
    geq: f64,
    ieq: f64,
}

impl Capacitor {
    pub fn new(
        id: ElementId,
        pos: Option<usize>,
        neg: Option<usize>,
        capacitance: f64,
        initial_voltage: f64,
    ) -> Self {
        Self {
            id,
            pos,
            neg,
            capacitance,
            v_prev: initial_voltage,
            i_prev: 0.0,
            geq: 0.0,
            ieq: 0.0,
        }
    }

    fn geq_for(&self, dt: f64, method: IntegrationMethod) -> f64 {
        match method {
            IntegrationMethod::BackwardEuler => self.capacitance / dt,
            IntegrationMethod::Trapezoidal => 2.0 * self.capacitance / dt,
        }
    }

    pub fn stamp_dynamic(&mut self, ctx: &mut StampContext<'_>) {
        let geq = self.geq_for(ctx.dt, ctx.method);
        let ieq = match ctx.method {
            IntegrationMethod::BackwardEuler => geq * self.v_prev,
            IntegrationMethod::Trapezoidal => geq * self.v_prev + self.i_prev,
        };
        self.geq = geq;
        self.ieq = ieq;

        ctx.sys.stamp_conductance(self.pos, self.neg, geq);
        // History current charges the positive plate.
        ctx.sys.stamp_current_source(self.neg, self.pos, ieq);
    }

    pub fn on_iter_accept(&mut self, ctx: &AcceptContext<'_>) {
        let v_new = ctx.voltage(self.pos) - ctx.voltage(self.neg);
        self.i_prev = match ctx.method {
            IntegrationMethod::BackwardEuler => self.capacitance / ctx.dt * (v_new - self.v_prev),
            IntegrationMethod::Trapezoidal => {
                2.0 * self.capacitance / ctx.dt * (v_new - self.v_prev) - self.i_prev
            }
        };
        self.v_prev = v_new;
    }

    pub fn on_step_change(&mut self, dt: f64, method: IntegrationMethod) {
        self.geq = self.geq_for(dt, method);
    }

    pub fn refresh(&mut self, element: &Element) {
        self.capacitance = element.values.get_or("c", self.capacitance);
    }

    /// Current from the first pin to the second, via the companion model.
    pub fn current(&self, x: &DVector<f64>) -> f64 {
        let va = self.pos.map(|i| x[i]).unwrap_or(0.0);
        let vb = self.neg.map(|i| x[i]).unwrap_or(0.0);
        self.geq * (va - vb) - self.ieq
    }

    /// Voltage latched at the last accepted step.
    pub fn latched_voltage(&self) -> f64 {
        self.v_prev
    }
}

/// An inductor bound to its matrix indices and auxiliary row.
#[derive(Debug, Clone)]
pub struct Inductor {
    pub id: ElementId,
    pub pos: Option<usize>,
    pub neg: Option<usize>,
    pub aux: usize,
    inductance: f64,
    /// Branch current at the previous accepted step.
    i_prev: f64,
    /// Branch voltage at the previous accepted step (trapezoidal history).
    v_prev: f64,
}

impl Inductor {
    pub fn new(
        id: ElementId,
        pos: Option<usize>,
        neg: Option<usize>,
        aux: usize,
        inductance: f64,
        initial_current: f64,
    ) -> Self {
        Self {
            id,
            pos,
            neg,
            aux,
            inductance,
            i_prev: initial_current,
            v_prev: 0.0,
        }
    }

    fn req_for(&self, dt: f64, method: IntegrationMethod) -> f64 {
        match method {
            IntegrationMethod::BackwardEuler => self.inductance / dt,
            IntegrationMethod::Trapezoidal => 2.0 * self.inductance / dt,
        }
    }

    pub fn stamp_static(&self, sys: &mut MnaSystem) {
        sys.stamp_voltage_row(self.pos, self.neg, self.aux);
    }

    /// Branch equation: `v_new − Req·i_new = −hist`, so that
    /// BE recovers `i_new = i_prev + dt/L·v_new` and trapezoidal recovers
    /// `i_new = i_prev + dt/(2L)·(v_new + v_prev)`.
    pub fn stamp_dynamic(&mut self, ctx: &mut StampContext<'_>) {
        let req = self.req_for(ctx.dt, ctx.method);
        ctx.sys.add(self.aux, self.aux, -req);
        let hist = match ctx.method {
            IntegrationMethod::BackwardEuler => req * self.i_prev,
            IntegrationMethod::Trapezoidal => self.v_prev + req * self.i_prev,
        };
        ctx.sys.add_rhs(self.aux, -hist);
    }

    pub fn on_iter_accept(&mut self, ctx: &AcceptContext<'_>) {
        self.i_prev = ctx.x[self.aux];
        self.v_prev = ctx.voltage(self.pos) - ctx.voltage(self.neg);
    }

    pub fn refresh(&mut self, element: &Element) {
        self.inductance = element.values.get_or("l", self.inductance);
    }

    /// Branch current from the first pin to the second.
    pub fn current(&self, x: &DVector<f64>) -> f64 {
        x[self.aux]
    }
}

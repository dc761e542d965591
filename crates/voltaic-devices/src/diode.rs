//! Shockley diode with Newton linearization.

use nalgebra::DVector;
use voltaic_core::graph::Element;
use voltaic_core::ids::ElementId;
use voltaic_core::mna::{AcceptContext, StampContext};

/// Thermal voltage kT/q near room temperature.
pub const THERMAL_VOLTAGE: f64 = 0.025852;

/// Minimum conductance added across the junction to keep the matrix
/// well-conditioned in deep reverse bias.
pub const GMIN: f64 = 1e-12;

/// Exponent cap: beyond this the linearized model is already a near-short.
const MAX_EXP_ARG: f64 = 80.0;

/// A diode bound to its matrix indices.
///
/// Each Newton iteration linearizes `Id = Is·(exp(Vd/Vt) − 1)` at a limited
/// junction voltage and stamps the tangent conductance plus its offset
/// current.
#[derive(Debug, Clone)]
pub struct Diode {
    pub id: ElementId,
    pub anode: Option<usize>,
    pub cathode: Option<usize>,
    saturation: f64,
    vcrit: f64,
    /// Linearization point carried across iterations and steps.
    vd_last: f64,
    geq: f64,
    ieq: f64,
}

impl Diode {
    pub fn new(id: ElementId, anode: Option<usize>, cathode: Option<usize>, saturation: f64) -> Self {
        Self {
            id,
            anode,
            cathode,
            saturation,
            vcrit: Self::critical_voltage(saturation),
            vd_last: 0.0,
            geq: 0.0,
            ieq: 0.0,
        }
    }

    fn critical_voltage(saturation: f64) -> f64 {
        THERMAL_VOLTAGE * (THERMAL_VOLTAGE / (saturation * std::f64::consts::SQRT_2)).ln()
    }

    /// Junction current at a given voltage.
    fn junction_current(&self, vd: f64) -> f64 {
        self.saturation * ((vd / THERMAL_VOLTAGE).min(MAX_EXP_ARG).exp() - 1.0)
    }

    pub fn stamp_dynamic(&mut self, ctx: &mut StampContext<'_>) {
        let proposed = ctx.voltage(self.anode) - ctx.voltage(self.cathode);
        let vd = limit_junction(proposed, self.vd_last, self.vcrit);
        self.vd_last = vd;

        let exp = (vd / THERMAL_VOLTAGE).min(MAX_EXP_ARG).exp();
        let id = self.saturation * (exp - 1.0);
        let geq = self.saturation / THERMAL_VOLTAGE * exp + GMIN;
        let ieq = id - geq * vd;
        self.geq = geq;
        self.ieq = ieq;

        ctx.sys.stamp_conductance(self.anode, self.cathode, geq);
        ctx.sys.stamp_current_source(self.anode, self.cathode, ieq);
    }

    /// Whether the last stamped tangent agrees with the junction equation at
    /// the solved voltage. Voltage limiting can leave the node voltages
    /// nearly stationary while the linearization point is still marching up
    /// the knee, so the solution-update residual alone is not a convergence
    /// proof.
    pub fn converged(&self, x: &DVector<f64>) -> bool {
        let va = self.anode.map(|i| x[i]).unwrap_or(0.0);
        let vc = self.cathode.map(|i| x[i]).unwrap_or(0.0);
        let vd = va - vc;
        let i_model = self.geq * vd + self.ieq;
        let i_actual = self.junction_current(vd);
        let scale = i_actual.abs().max(i_model.abs());
        (i_actual - i_model).abs() <= 1e-9 + 1e-6 * scale
    }

    pub fn on_iter_accept(&mut self, ctx: &AcceptContext<'_>) {
        self.vd_last = ctx.voltage(self.anode) - ctx.voltage(self.cathode);
    }

    pub fn refresh(&mut self, element: &Element) {
        self.saturation = element.values.get_or("is", self.saturation);
        self.vcrit = Self::critical_voltage(self.saturation);
    }

    /// Forward current anode → cathode at the given solution.
    pub fn current(&self, x: &DVector<f64>) -> f64 {
        let va = self.anode.map(|i| x[i]).unwrap_or(0.0);
        let vc = self.cathode.map(|i| x[i]).unwrap_or(0.0);
        self.junction_current(va - vc)
    }
}

/// Limit a proposed junction voltage against the previous iterate.
///
/// Above the critical voltage the exponential explodes; large excursions are
/// damped logarithmically so Newton walks up the knee instead of
/// overshooting by orders of magnitude.
fn limit_junction(vnew: f64, vold: f64, vcrit: f64) -> f64 {
    let vt = THERMAL_VOLTAGE;
    if vnew > vcrit && (vnew - vold).abs() > 2.0 * vt {
        if vold > 0.0 {
            let arg = 1.0 + (vnew - vold) / vt;
            if arg > 0.0 {
                vold + vt * arg.ln()
            } else {
                vcrit
            }
        } else {
            vt * (vnew / vt).ln()
        }
    } else {
        vnew
    }
}

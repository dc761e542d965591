//! The MNA engine: assembly, Newton iteration, and solution accessors.

use nalgebra::DVector;
use voltaic_core::circuit::Circuit;
use voltaic_core::error::{Error, Result};
use voltaic_core::ids::{ElementId, WireId};
use voltaic_core::mna::{AcceptContext, IntegrationMethod, MnaSystem, StampContext};
use voltaic_core::nodes::NodeGraph;
use voltaic_devices::{Device, bind_all};

use crate::linear::factor;

/// Newton iteration cap per time step.
pub const MAX_NEWTON_ITER: usize = 500;
/// Relative convergence tolerance on the solution update.
pub const RELTOL: f64 = 1e-6;
/// Absolute floor in the relative-residual denominator.
pub const ABS_TOL: f64 = 1e-9;
/// Below this, a matrix row counts as unconstrained.
const ROW_EPS: f64 = 1e-12;

/// Probe callback fired after every accepted step with `(t, &x)`.
pub type Probe = Box<dyn FnMut(f64, &DVector<f64>)>;

/// The assembled MNA system for one circuit.
///
/// Owns the matrices, the solution history, and the bound devices. The
/// transient driver owns the time axis and calls [`solve`](Mna::solve) /
/// [`accept`](Mna::accept) per step.
pub struct Mna {
    circuit: Circuit,
    nodes: NodeGraph,
    devices: Vec<Device>,
    /// Time-invariant contributions only.
    statics: MnaSystem,
    /// Working system rebuilt every Newton iteration.
    sys: MnaSystem,
    x: DVector<f64>,
    x_prev: DVector<f64>,
    method: IntegrationMethod,
    time: f64,
    needs_iteration: bool,
    last_newton_iters: usize,
    probes: Vec<Probe>,
}

impl Mna {
    /// Build the node graph, bind devices, and pre-stamp the static matrix.
    pub fn new(circuit: &Circuit) -> Result<Self> {
        let nodes = NodeGraph::build(circuit.link())?;
        let dim = nodes.matrix_dim();
        if dim == 0 {
            return Err(Error::MatrixBuildFailed);
        }
        let devices = bind_all(circuit, &nodes)?;
        let needs_iteration = devices.iter().any(Device::needs_iteration);
        let n_nodes = nodes.n_nodes();

        let mut mna = Self {
            circuit: circuit.clone(),
            nodes,
            devices,
            statics: MnaSystem::new(dim, n_nodes),
            sys: MnaSystem::new(dim, n_nodes),
            x: DVector::zeros(dim),
            x_prev: DVector::zeros(dim),
            method: IntegrationMethod::Trapezoidal,
            time: 0.0,
            needs_iteration,
            last_newton_iters: 0,
            probes: Vec::new(),
        };
        mna.stamp_refresh();
        Ok(mna)
    }

    /// Select the companion-model integration rule.
    pub fn set_method(&mut self, method: IntegrationMethod) {
        self.method = method;
    }

    /// Builder-style integration rule selection.
    pub fn with_method(mut self, method: IntegrationMethod) -> Self {
        self.method = method;
        self
    }

    /// The node indexing in use.
    pub fn nodes(&self) -> &NodeGraph {
        &self.nodes
    }

    /// Count of non-ground nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.n_nodes()
    }

    /// Full system dimension.
    pub fn matrix_dim(&self) -> usize {
        self.nodes.matrix_dim()
    }

    /// Last accepted simulation time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Newton iterations spent in the most recent [`solve`](Mna::solve).
    pub fn newton_iterations(&self) -> usize {
        self.last_newton_iters
    }

    /// Current solution vector.
    pub fn solution(&self) -> &DVector<f64> {
        &self.x
    }

    /// Register a callback fired after every accepted step with `(t, &x)`.
    /// This is the sole channel external visualizers read from.
    pub fn register_probe(&mut self, probe: impl FnMut(f64, &DVector<f64>) + 'static) {
        self.probes.push(Box::new(probe));
    }

    /// Update a named element parameter. Takes effect at the next
    /// [`stamp_refresh`](Mna::stamp_refresh).
    pub fn set_element_value(&mut self, id: ElementId, name: &str, value: f64) -> Result<()> {
        self.circuit.set_element_value(id, name, value)
    }

    /// Re-read device parameters and rebuild the static matrix.
    pub fn stamp_refresh(&mut self) {
        let Self {
            circuit,
            devices,
            statics,
            ..
        } = self;
        for device in devices.iter_mut() {
            if let Some(element) = circuit.link().element(device.id()) {
                device.refresh(element);
            }
        }
        statics.clear();
        for device in devices.iter() {
            device.stamp_static(statics);
        }
    }

    /// Forward a step-size change to every device.
    pub fn on_step_change(&mut self, dt: f64) {
        let method = self.method;
        for device in self.devices.iter_mut() {
            device.on_step_change(dt, method);
        }
    }

    /// Solve for the state at time `t` (one step of size `dt` past the last
    /// accepted state).
    ///
    /// Returns `Ok(true)` on convergence, `Ok(false)` when the Newton loop
    /// ran out of iterations (the driver will shrink the step), and
    /// `Err(Singular)` when a pivot collapsed.
    pub fn solve(&mut self, dt: f64, t: f64) -> Result<bool> {
        for iter in 0..MAX_NEWTON_ITER {
            self.last_newton_iters = iter + 1;
            self.sys.matrix_mut().copy_from(self.statics.matrix());
            self.sys.rhs_mut().fill(0.0);

            {
                let Self {
                    sys,
                    x,
                    x_prev,
                    devices,
                    method,
                    ..
                } = self;
                let mut ctx = StampContext {
                    sys,
                    x: &*x,
                    x_prev: &*x_prev,
                    dt,
                    t,
                    method: *method,
                };
                for device in devices.iter_mut() {
                    device.stamp_dynamic(&mut ctx);
                }
            }

            regularize(&mut self.sys);

            let x_new = factor(self.sys.matrix())?.solve(self.sys.rhs());
            let r = residual(&x_new, &self.x);
            self.x.copy_from(&x_new);

            if !self.needs_iteration {
                return Ok(true);
            }
            // The update residual alone can look converged while a limited
            // nonlinear model is still walking toward its operating point,
            // so every device must also agree with the solved state.
            if r < RELTOL && self.devices.iter().all(|d| d.converged(&self.x)) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Latch an accepted step: history vectors, device state, probes.
    pub fn accept(&mut self, dt: f64, t: f64) {
        self.x_prev.copy_from(&self.x);
        {
            let Self {
                x,
                devices,
                method,
                ..
            } = self;
            let ctx = AcceptContext {
                x: &*x,
                dt,
                t,
                method: *method,
            };
            for device in devices.iter_mut() {
                device.on_iter_accept(&ctx);
            }
        }
        self.time = t;

        let Self { probes, x, .. } = self;
        for probe in probes.iter_mut() {
            probe(t, &*x);
        }
    }

    /// Voltage of a wire at the current solution. Ground and unknown wires
    /// read 0 V.
    pub fn voltage_of_wire(&self, wire: WireId) -> f64 {
        match self.nodes.matrix_index(wire) {
            Some(index) => self.x[index],
            None => 0.0,
        }
    }

    /// Current through an element from its first pin to its second.
    pub fn current_of_element(&self, id: ElementId) -> Result<f64> {
        self.devices
            .iter()
            .find(|device| device.id() == id)
            .map(|device| device.current(&self.x, self.time))
            .ok_or(Error::UnknownElement { element: id })
    }
}

/// Build an [`Mna`] directly from a circuit.
pub trait BuildMna {
    fn build_mna(&self) -> Result<Mna>;
}

impl BuildMna for Circuit {
    fn build_mna(&self) -> Result<Mna> {
        Mna::new(self)
    }
}

/// Replace all-zero equations (floating subgraphs, unconnected control
/// nodes) with `x_i = 0`. A zero row with a nonzero RHS is a genuine
/// contradiction and is left in place for the LU to report as singular.
fn regularize(sys: &mut MnaSystem) {
    let dim = sys.dim();
    for i in 0..dim {
        let mut row_max = 0.0f64;
        for j in 0..dim {
            row_max = row_max.max(sys.matrix()[(i, j)].abs());
        }
        if row_max < ROW_EPS && sys.rhs()[i].abs() < ROW_EPS {
            sys.matrix_mut()[(i, i)] = 1.0;
            sys.rhs_mut()[i] = 0.0;
        }
    }
}

/// Largest relative change between successive Newton iterates.
fn residual(x_new: &DVector<f64>, x_old: &DVector<f64>) -> f64 {
    let mut worst = 0.0f64;
    for i in 0..x_new.len() {
        let r = (x_new[i] - x_old[i]).abs() / (x_new[i].abs() + ABS_TOL);
        worst = worst.max(r);
    }
    worst
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solve_once(mna: &mut Mna) {
        let dt = 1e-6;
        assert!(mna.solve(dt, dt).unwrap());
        mna.accept(dt, dt);
    }

    #[test]
    fn test_resistive_divider() {
        let circuit = Circuit::load_str("V0 0 1 5\nR1 1 2 10\nR2 2 0 10\n").unwrap();
        let mut mna = circuit.build_mna().unwrap();
        solve_once(&mut mna);

        assert!((mna.voltage_of_wire(WireId::new(1)) - 5.0).abs() < 1e-9);
        assert!((mna.voltage_of_wire(WireId::new(2)) - 2.5).abs() < 1e-9);
        assert!((mna.current_of_element(ElementId::new(1)).unwrap() - 0.25).abs() < 1e-9);
        assert!(
            (mna.current_of_element(ElementId::new(0)).unwrap() - 0.25).abs() < 1e-9,
            "source delivers the loop current"
        );
    }

    #[test]
    fn test_linear_circuit_converges_in_one_pass() {
        // No element needs iteration, so a single factor/solve must land.
        let circuit = Circuit::load_str("I0 0 1 1m\nR1 1 0 1k\n").unwrap();
        let mut mna = circuit.build_mna().unwrap();
        assert!(mna.solve(1e-6, 1e-6).unwrap());
        assert!((mna.solution()[0] - 1.0).abs() < 1e-9, "1 mA into 1 kΩ");
    }

    #[test]
    fn test_empty_circuit_rejected() {
        let circuit = Circuit::load_str("").unwrap();
        assert!(matches!(circuit.build_mna(), Err(Error::NoGround)));
    }

    #[test]
    fn test_stamp_refresh_idempotent() {
        let circuit = Circuit::load_str("V0 0 1 5\nR1 1 0 10\n").unwrap();
        let mut mna = circuit.build_mna().unwrap();

        mna.stamp_refresh();
        let first = mna.statics.matrix().clone();
        mna.stamp_refresh();
        assert_eq!(
            first,
            *mna.statics.matrix(),
            "repeated refresh is bit-identical"
        );
    }

    #[test]
    fn test_refresh_picks_up_value_change() {
        let circuit = Circuit::load_str("V0 0 1 5\nR1 1 0 10\n").unwrap();
        let mut mna = circuit.build_mna().unwrap();
        solve_once(&mut mna);
        assert!((mna.current_of_element(ElementId::new(1)).unwrap() - 0.5).abs() < 1e-9);

        mna.set_element_value(ElementId::new(1), "r", 20.0).unwrap();
        mna.stamp_refresh();
        solve_once(&mut mna);
        assert!((mna.current_of_element(ElementId::new(1)).unwrap() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_floating_control_node_regularized() {
        // The switch control wire 5 has no conducting path; its equation is
        // all-zero and must regularize to 0 V instead of going singular.
        let circuit =
            Circuit::load_str("V0 0 1 5\nS1 1 2 5 0 0.5 1m 1g\nR2 2 0 10\n").unwrap();
        let mut mna = circuit.build_mna().unwrap();
        solve_once(&mut mna);

        assert_eq!(mna.voltage_of_wire(WireId::new(5)), 0.0);
        // Switch starts open: almost no drop across the load.
        assert!(mna.voltage_of_wire(WireId::new(2)).abs() < 1e-3);
    }

    #[test]
    fn test_shorted_voltage_source_is_singular() {
        // Both source pins on the same wire: contradictory branch row.
        let circuit = Circuit::load_str("V0 1 1 5\nR1 1 0 10\n").unwrap();
        let mut mna = circuit.build_mna().unwrap();
        assert!(matches!(mna.solve(1e-6, 1e-6), Err(Error::Singular)));
    }

    #[test]
    fn test_ground_never_indexed() {
        let circuit = Circuit::load_str("V0 0 1 5\nR1 1 0 10\n").unwrap();
        let mna = circuit.build_mna().unwrap();

        assert_eq!(mna.num_nodes(), 1);
        assert_eq!(mna.matrix_dim(), 2, "one node plus one branch current");
        assert_eq!(mna.voltage_of_wire(WireId::GROUND), 0.0);
        assert_eq!(mna.nodes().matrix_index(WireId::GROUND), None);
    }

    #[test]
    fn test_probe_fires_on_accept() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let circuit = Circuit::load_str("V0 0 1 5\nR1 1 0 10\n").unwrap();
        let mut mna = circuit.build_mna().unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        mna.register_probe(move |t, x| sink.borrow_mut().push((t, x[0])));

        solve_once(&mut mna);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!((seen[0].1 - 5.0).abs() < 1e-9);
    }
}

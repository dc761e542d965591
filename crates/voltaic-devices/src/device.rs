//! The element plugin dispatch table and circuit binding.

use nalgebra::DVector;
use voltaic_core::circuit::Circuit;
use voltaic_core::error::{Error, Result};
use voltaic_core::graph::Element;
use voltaic_core::ids::ElementId;
use voltaic_core::kind::ElementKind;
use voltaic_core::mna::{AcceptContext, IntegrationMethod, MnaSystem, StampContext};
use voltaic_core::nodes::NodeGraph;

use crate::controlled::{Cccs, Ccvs, Vccs, Vcvs};
use crate::diode::Diode;
use crate::passive::Resistor;
use crate::reactive::{Capacitor, Inductor};
use crate::sources::{CurrentSource, VoltageSource};
use crate::switch::Switch;

/// A bound element: one variant per kind, dispatched through a single table.
#[derive(Debug, Clone)]
pub enum Device {
    Resistor(Resistor),
    Capacitor(Capacitor),
    Inductor(Inductor),
    VoltageSource(VoltageSource),
    CurrentSource(CurrentSource),
    Diode(Diode),
    Switch(Switch),
    Vcvs(Vcvs),
    Vccs(Vccs),
    Cccs(Cccs),
    Ccvs(Ccvs),
    /// Jumpers are absorbed by the node graph; the variant only keeps the id
    /// resolvable.
    Jumper(ElementId),
}

impl Device {
    /// Bind an element to its matrix indices.
    pub fn bind(nodes: &NodeGraph, element: &Element) -> Result<Self> {
        let pin = |i: usize| nodes.matrix_index(element.pins[i]);
        let aux = || {
            nodes
                .aux_index(element.id)
                .ok_or(Error::MatrixBuildFailed)
        };
        let values = &element.values;

        Ok(match element.kind {
            ElementKind::Resistor => Device::Resistor(Resistor::new(
                element.id,
                pin(0),
                pin(1),
                values.get_or("r", f64::INFINITY),
            )),
            ElementKind::Capacitor => Device::Capacitor(Capacitor::new(
                element.id,
                pin(0),
                pin(1),
                values.get_or("c", 0.0),
                values.get_or("ic", 0.0),
            )),
            ElementKind::Inductor => Device::Inductor(Inductor::new(
                element.id,
                pin(0),
                pin(1),
                aux()?,
                values.get_or("l", 0.0),
                values.get_or("ic", 0.0),
            )),
            // Second netlist pin is the positive terminal.
            ElementKind::VoltageSource => Device::VoltageSource(VoltageSource::new(
                element.id,
                pin(1),
                pin(0),
                aux()?,
                element,
            )),
            ElementKind::CurrentSource => Device::CurrentSource(CurrentSource::new(
                element.id,
                pin(0),
                pin(1),
                element,
            )),
            ElementKind::Diode => Device::Diode(Diode::new(
                element.id,
                pin(0),
                pin(1),
                values.get_or("is", 1e-14),
            )),
            ElementKind::Switch => Device::Switch(Switch::new(
                element.id,
                pin(0),
                pin(1),
                pin(2),
                pin(3),
                element,
            )),
            ElementKind::Vcvs => Device::Vcvs(Vcvs::new(
                element.id,
                pin(0),
                pin(1),
                pin(2),
                pin(3),
                aux()?,
                values.get_or("gain", 0.0),
            )),
            ElementKind::Vccs => Device::Vccs(Vccs::new(
                element.id,
                pin(0),
                pin(1),
                pin(2),
                pin(3),
                values.get_or("gain", 0.0),
            )),
            ElementKind::Cccs => {
                let (ctrl_aux, gain) = control_of(nodes, element)?;
                Device::Cccs(Cccs::new(element.id, pin(0), pin(1), ctrl_aux, gain))
            }
            ElementKind::Ccvs => {
                let (ctrl_aux, gain) = control_of(nodes, element)?;
                Device::Ccvs(Ccvs::new(
                    element.id,
                    pin(0),
                    pin(1),
                    ctrl_aux,
                    aux()?,
                    gain,
                ))
            }
            ElementKind::Jumper => Device::Jumper(element.id),
            ElementKind::Unknown => {
                return Err(Error::UnknownElementKind {
                    token: element.id.to_string(),
                });
            }
        })
    }

    /// Id of the underlying element.
    pub fn id(&self) -> ElementId {
        match self {
            Device::Resistor(d) => d.id,
            Device::Capacitor(d) => d.id,
            Device::Inductor(d) => d.id,
            Device::VoltageSource(d) => d.id,
            Device::CurrentSource(d) => d.id,
            Device::Diode(d) => d.id,
            Device::Switch(d) => d.id,
            Device::Vcvs(d) => d.id,
            Device::Vccs(d) => d.id,
            Device::Cccs(d) => d.id,
            Device::Ccvs(d) => d.id,
            Device::Jumper(id) => *id,
        }
    }

    /// Whether this device's stamp depends on the candidate solution.
    pub fn needs_iteration(&self) -> bool {
        matches!(self, Device::Diode(_))
    }

    /// Whether this device carries companion-model history.
    pub fn is_reactive(&self) -> bool {
        matches!(self, Device::Capacitor(_) | Device::Inductor(_))
    }

    /// Write time-/solution-invariant contributions.
    pub fn stamp_static(&self, sys: &mut MnaSystem) {
        match self {
            Device::Resistor(d) => d.stamp_static(sys),
            Device::Inductor(d) => d.stamp_static(sys),
            Device::VoltageSource(d) => d.stamp_static(sys),
            Device::Vcvs(d) => d.stamp_static(sys),
            Device::Vccs(d) => d.stamp_static(sys),
            Device::Cccs(d) => d.stamp_static(sys),
            Device::Ccvs(d) => d.stamp_static(sys),
            Device::Capacitor(_)
            | Device::CurrentSource(_)
            | Device::Diode(_)
            | Device::Switch(_)
            | Device::Jumper(_) => {}
        }
    }

    /// Write per-iteration contributions.
    pub fn stamp_dynamic(&mut self, ctx: &mut StampContext<'_>) {
        match self {
            Device::Capacitor(d) => d.stamp_dynamic(ctx),
            Device::Inductor(d) => d.stamp_dynamic(ctx),
            Device::VoltageSource(d) => d.stamp_dynamic(ctx),
            Device::CurrentSource(d) => d.stamp_dynamic(ctx),
            Device::Diode(d) => d.stamp_dynamic(ctx),
            Device::Switch(d) => d.stamp_dynamic(ctx),
            Device::Resistor(_)
            | Device::Vcvs(_)
            | Device::Vccs(_)
            | Device::Cccs(_)
            | Device::Ccvs(_)
            | Device::Jumper(_) => {}
        }
    }

    /// Latch per-step state after an accepted solve.
    pub fn on_iter_accept(&mut self, ctx: &AcceptContext<'_>) {
        match self {
            Device::Capacitor(d) => d.on_iter_accept(ctx),
            Device::Inductor(d) => d.on_iter_accept(ctx),
            Device::Diode(d) => d.on_iter_accept(ctx),
            Device::Switch(d) => d.on_iter_accept(ctx),
            _ => {}
        }
    }

    /// React to a step-size change from the transient driver. The inductor
    /// derives its companion factors inside `stamp_dynamic` and caches
    /// nothing across steps.
    pub fn on_step_change(&mut self, dt: f64, method: IntegrationMethod) {
        match self {
            Device::Capacitor(d) => d.on_step_change(dt, method),
            _ => {}
        }
    }

    /// Whether the device's stamped model is consistent with the solved
    /// state. Always true for devices whose stamps do not depend on the
    /// solution.
    pub fn converged(&self, x: &DVector<f64>) -> bool {
        match self {
            Device::Diode(d) => d.converged(x),
            _ => true,
        }
    }

    /// Re-read parameters from the element after a value change.
    pub fn refresh(&mut self, element: &Element) {
        match self {
            Device::Resistor(d) => d.refresh(element),
            Device::Capacitor(d) => d.refresh(element),
            Device::Inductor(d) => d.refresh(element),
            Device::VoltageSource(d) => d.refresh(element),
            Device::CurrentSource(d) => d.refresh(element),
            Device::Diode(d) => d.refresh(element),
            Device::Switch(d) => d.refresh(element),
            Device::Vcvs(d) => d.refresh(element),
            Device::Vccs(d) => d.refresh(element),
            Device::Cccs(d) => d.refresh(element),
            Device::Ccvs(d) => d.refresh(element),
            Device::Jumper(_) => {}
        }
    }

    /// Current through the device from its first pin to its second, at the
    /// given solution. Jumper currents are untracked and read as zero.
    pub fn current(&self, x: &DVector<f64>, t: f64) -> f64 {
        match self {
            Device::Resistor(d) => d.current(x),
            Device::Capacitor(d) => d.current(x),
            Device::Inductor(d) => d.current(x),
            Device::VoltageSource(d) => d.current(x),
            Device::CurrentSource(d) => d.current(t),
            Device::Diode(d) => d.current(x),
            Device::Switch(d) => d.current(x),
            Device::Vcvs(d) => d.current(x),
            Device::Vccs(d) => d.current(x),
            Device::Cccs(d) => d.current(x),
            Device::Ccvs(d) => d.current(x),
            Device::Jumper(_) => 0.0,
        }
    }
}

fn control_of(nodes: &NodeGraph, element: &Element) -> Result<(usize, f64)> {
    let ctrl = element
        .values
        .get("ctrl")
        .map(|v| ElementId::new(v as u32))
        .ok_or(Error::ControlReference {
            element: element.id,
        })?;
    let ctrl_aux = nodes
        .aux_index(ctrl)
        .ok_or(Error::ControlReference { element: ctrl })?;
    Ok((ctrl_aux, element.values.get_or("gain", 0.0)))
}

/// Bind every element of a circuit in netlist order.
pub fn bind_all(circuit: &Circuit, nodes: &NodeGraph) -> Result<Vec<Device>> {
    circuit
        .link()
        .elements()
        .map(|element| Device::bind(nodes, element))
        .collect()
}

//! End-to-end transient scenarios with analytic expectations.

use voltaic_core::circuit::Circuit;
use voltaic_core::error::Error;
use voltaic_core::ids::{ElementId, WireId};
use voltaic_solver::mna::BuildMna;
use voltaic_solver::trace::Trace;
use voltaic_solver::transient::{SimOptions, simulate, simulate_with};

fn node_index(mna: &voltaic_solver::Mna, wire: u32) -> usize {
    mna.nodes()
        .matrix_index(WireId::new(wire))
        .expect("wire should have a matrix index")
}

#[test]
fn test_dc_through_resistor() {
    let circuit = Circuit::load_str("V0 0 1  5.0\nR1 1 0  10.0\n").unwrap();
    let mut mna = circuit.build_mna().unwrap();
    let trace = Trace::attach(&mut mna);

    simulate(1.0, &mut mna).unwrap();

    let node = node_index(&mna, 1);
    for point in trace.borrow().points() {
        assert!(
            (point.solution[node] - 5.0).abs() < 1e-9,
            "V(1) = {} at t = {} (expected 5.0)",
            point.solution[node],
            point.time
        );
    }
    let i = mna.current_of_element(ElementId::new(1)).unwrap();
    assert!((i - 0.5).abs() < 1e-9, "I(R1) = {i} (expected 0.5)");
}

#[test]
fn test_rc_charging() {
    // tau = R*C = 10 * 0.01 = 0.1 s; v(2, t) = 5 * (1 - exp(-t/tau))
    let circuit = Circuit::load_str("V0 0 1  5\nR1 1 2  10\nC2 2 0  0.01\n").unwrap();
    let mut mna = circuit.build_mna().unwrap();
    let trace = Trace::attach(&mut mna);

    simulate(0.5, &mut mna).unwrap();

    let node = node_index(&mna, 2);
    let v_at_tau = trace.borrow().value_at(node, 0.1).unwrap();
    let expected = 5.0 * (1.0 - (-1.0f64).exp()); // ~3.1606
    assert!(
        (v_at_tau - expected).abs() / expected < 0.01,
        "V(2) at tau = {v_at_tau} (expected {expected} within 1%)"
    );

    // After 5 tau the capacitor is essentially charged.
    let v_final = mna.voltage_of_wire(WireId::new(2));
    assert!((v_final - 5.0).abs() < 0.05, "V(2) final = {v_final}");
}

#[test]
fn test_rc_discharge_from_initial_condition() {
    // Capacitor pre-charged to 5 V, no source: v(t) = 5 * exp(-t/tau).
    let circuit = Circuit::load_str("C1 1 0  0.01 5\nR2 1 0  10\n").unwrap();
    let mut mna = circuit.build_mna().unwrap();
    let trace = Trace::attach(&mut mna);

    simulate(0.5, &mut mna).unwrap();

    let node = node_index(&mna, 1);
    let v_at_tau = trace.borrow().value_at(node, 0.1).unwrap();
    let expected = 5.0 / std::f64::consts::E; // ~1.8394
    assert!(
        (v_at_tau - expected).abs() / expected < 0.01,
        "V(1) at tau = {v_at_tau} (expected {expected} within 1%)"
    );
}

#[test]
fn test_low_pass_ladder() {
    let circuit = Circuit::load_str(
        "V0 0 1 5\nR1 1 2 10\nC2 2 0 0.01\nR3 2 3 10\nC4 3 0 0.01\n",
    )
    .unwrap();
    let mut mna = circuit.build_mna().unwrap();
    let trace = Trace::attach(&mut mna);

    simulate(2.0, &mut mna).unwrap();

    // v(3, inf) = 5 (no DC load on the output node).
    let v_final = mna.voltage_of_wire(WireId::new(3));
    assert!((v_final - 5.0).abs() < 0.05, "V(3) final = {v_final}");

    // Monotonic approach: each accepted point at least as high as the last,
    // up to integration noise.
    let node = node_index(&mna, 3);
    let trace = trace.borrow();
    let mut previous = 0.0f64;
    for point in trace.points() {
        let v = point.solution[node];
        assert!(
            v >= previous - 1e-3,
            "V(3) dipped from {previous} to {v} at t = {}",
            point.time
        );
        previous = previous.max(v);
    }
}

#[test]
fn test_shorted_source_recovers_cleanly() {
    // Both source pins on one wire: the branch equation is contradictory.
    // Every solve reports Singular; the governor must walk the step down and
    // end in ConvergenceFailure without panicking or spinning forever.
    let circuit = Circuit::load_str("V0 1 1 5\nR1 1 0 10\n").unwrap();
    let mut mna = circuit.build_mna().unwrap();

    let result = simulate(1.0, &mut mna);
    assert!(
        matches!(result, Err(Error::ConvergenceFailure)),
        "expected ConvergenceFailure, got {result:?}"
    );
    assert_eq!(mna.time(), 0.0, "no step was ever accepted");
}

#[test]
fn test_diode_clamp() {
    // Series 5 V source and 1k resistor into a diode: the diode clamps its
    // node near one forward drop.
    let circuit = Circuit::load_str("V0 0 1 5\nR1 1 2 1k\nD2 2 0\n").unwrap();
    let mut mna = circuit.build_mna().unwrap();

    let stats = simulate(1e-3, &mut mna).unwrap();
    assert_eq!(stats.rejected_steps, 0, "diode must converge every step");

    let vd = mna.voltage_of_wire(WireId::new(2));
    assert!(
        (0.6..=0.75).contains(&vd),
        "diode drop = {vd} (expected 0.6..0.75)"
    );
    assert!(
        mna.newton_iterations() <= 20,
        "warm-started Newton took {} iterations",
        mna.newton_iterations()
    );

    // KVL: the resistor carries the rest of the supply.
    let i_r = mna.current_of_element(ElementId::new(1)).unwrap();
    assert!(((5.0 - vd) / 1000.0 - i_r).abs() < 1e-9);
}

#[test]
fn test_cold_start_newton_bounded() {
    // From an all-zero initial guess, junction limiting must still land the
    // first solve within 20 iterations.
    let circuit = Circuit::load_str("V0 0 1 5\nR1 1 2 1k\nD2 2 0\n").unwrap();
    let mut mna = circuit.build_mna().unwrap();

    assert!(mna.solve(1e-6, 1e-6).unwrap());
    assert!(
        mna.newton_iterations() <= 20,
        "cold-start Newton took {} iterations",
        mna.newton_iterations()
    );
}

#[test]
fn test_linear_solve_is_single_iteration() {
    let circuit = Circuit::load_str("V0 0 1 5\nR1 1 2 10\nC2 2 0 0.01\n").unwrap();
    let mut mna = circuit.build_mna().unwrap();

    simulate(0.1, &mut mna).unwrap();
    assert_eq!(
        mna.newton_iterations(),
        1,
        "linear circuits never iterate"
    );
}

#[test]
fn test_kcl_at_internal_node() {
    // Sum of currents into wire 2 of the RC charging circuit stays below
    // tolerance at every accepted solution we can observe.
    let circuit = Circuit::load_str("V0 0 1 5\nR1 1 2 10\nC2 2 0 0.01\n").unwrap();
    let mut mna = circuit.build_mna().unwrap();

    simulate(0.25, &mut mna).unwrap();

    // Element currents flow from first pin to second; wire 2 is R1's second
    // pin and C2's first.
    let into = mna.current_of_element(ElementId::new(1)).unwrap();
    let out_of = mna.current_of_element(ElementId::new(2)).unwrap();
    assert!(
        (into - out_of).abs() < 1e-6,
        "KCL residual at node 2: {}",
        into - out_of
    );

    // Wire 1: source feeds the resistor.
    let src = mna.current_of_element(ElementId::new(0)).unwrap();
    assert!((src - into).abs() < 1e-6, "KCL residual at node 1");
}

#[test]
fn test_energy_decays_without_sources() {
    // Two capacitors discharging through resistors: total stored energy
    // (1/2)*sum(C*Vc^2) never increases across accepted steps.
    let circuit =
        Circuit::load_str("C1 1 0 0.01 5\nR2 1 2 10\nC3 2 0 0.02 1\nR4 2 0 20\n").unwrap();
    let mut mna = circuit.build_mna().unwrap();
    let trace = Trace::attach(&mut mna);

    simulate(0.5, &mut mna).unwrap();

    let n1 = node_index(&mna, 1);
    let n2 = node_index(&mna, 2);
    let trace = trace.borrow();
    let mut last_energy = f64::INFINITY;
    for point in trace.points() {
        let e = 0.5 * 0.01 * point.solution[n1].powi(2)
            + 0.5 * 0.02 * point.solution[n2].powi(2);
        assert!(
            e <= last_energy + 1e-6,
            "stored energy rose to {e} at t = {}",
            point.time
        );
        last_energy = e;
    }
    assert!(last_energy < 0.125, "energy must have decayed");
}

#[test]
fn test_sin_source_drives_output() {
    let circuit = Circuit::load_str("V0 0 1 SIN(0 2 10)\nR1 1 0 100\n").unwrap();
    let mut mna = circuit.build_mna().unwrap();
    let trace = Trace::attach(&mut mna);

    simulate(0.1, &mut mna).unwrap();

    // One full period at 10 Hz; peak near t = 25 ms.
    let node = node_index(&mna, 1);
    let v_peak = trace.borrow().value_at(node, 0.025).unwrap();
    assert!((v_peak - 2.0).abs() < 0.05, "sine peak = {v_peak}");
}

#[test]
fn test_switch_closes_on_control_ramp() {
    // PWL control ramps past the 0.5 V threshold halfway through; the
    // switched branch then pulls the divider output low.
    let circuit = Circuit::load_str(
        "V0 0 1 5\nI1 0 3 PWL(0 0 1 1m)\nR2 3 0 1k\nR3 1 2 1k\nS4 2 0 3 0 0.5 1m 1g\n",
    )
    .unwrap();
    let mut mna = circuit.build_mna().unwrap();
    let trace = Trace::attach(&mut mna);

    simulate(1.0, &mut mna).unwrap();

    let out = node_index(&mna, 2);
    let trace = trace.borrow();
    let early = trace.value_at(out, 0.1).unwrap();
    let late = trace.value_at(out, 0.95).unwrap();
    assert!((early - 5.0).abs() < 0.01, "switch open early: V(2) = {early}");
    assert!(late < 0.05, "switch closed late: V(2) = {late}");
}

#[test]
fn test_inductor_reaches_dc_current() {
    // RL charging: i(t) = (V/R) * (1 - exp(-t*R/L)); tau = L/R = 10 ms.
    let circuit = Circuit::load_str("V0 0 1 5\nR1 1 2 10\nL2 2 0 0.1\n").unwrap();
    let mut mna = circuit.build_mna().unwrap();

    simulate(0.1, &mut mna).unwrap();

    let i = mna.current_of_element(ElementId::new(2)).unwrap();
    assert!(
        (i - 0.5).abs() < 0.005,
        "inductor current after 10 tau = {i} (expected 0.5)"
    );
}

#[test]
fn test_vcvs_amplifies() {
    // E3 doubles the divider midpoint: out = 2 * 2.5 = 5.
    let circuit = Circuit::load_str(
        "V0 0 1 5\nR1 1 2 10\nR2 2 0 10\nE3 3 0 2 0 2.0\nR4 3 0 1k\n",
    )
    .unwrap();
    let mut mna = circuit.build_mna().unwrap();
    simulate(1e-3, &mut mna).unwrap();

    let v_out = mna.voltage_of_wire(WireId::new(3));
    assert!((v_out - 5.0).abs() < 1e-6, "VCVS output = {v_out}");
}

#[test]
fn test_cccs_mirrors_current() {
    // F2 mirrors the source branch current (0.5 A) into a 1 ohm load.
    let circuit =
        Circuit::load_str("V0 0 1 5\nR1 1 0 10\nF2 0 2 V0 1.0\nR3 2 0 1\n").unwrap();
    let mut mna = circuit.build_mna().unwrap();
    simulate(1e-3, &mut mna).unwrap();

    let v_load = mna.voltage_of_wire(WireId::new(2));
    assert!(
        (v_load.abs() - 0.5).abs() < 1e-6,
        "mirrored drop = {v_load} (expected magnitude 0.5)"
    );
}

#[test]
fn test_netlist_round_trip_simulates_identically() {
    let text = "V0 0 1 5\nR1 1 2 10\nC2 2 0 0.01\n";
    let first = Circuit::load_str(text).unwrap();
    let reloaded = Circuit::load_str(&first.export_string()).unwrap();

    let mut mna_a = first.build_mna().unwrap();
    let mut mna_b = reloaded.build_mna().unwrap();
    let options = SimOptions::for_end_time(0.2);
    simulate_with(0.2, &mut mna_a, &options).unwrap();
    simulate_with(0.2, &mut mna_b, &options).unwrap();

    assert_eq!(
        mna_a.voltage_of_wire(WireId::new(2)),
        mna_b.voltage_of_wire(WireId::new(2)),
        "identical netlists step identically"
    );
}

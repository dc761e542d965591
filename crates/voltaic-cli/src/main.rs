//! Voltaic command line: run a transient simulation over a netlist file.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use voltaic_core::circuit::Circuit;
use voltaic_core::ids::WireId;
use voltaic_core::mna::IntegrationMethod;
use voltaic_solver::mna::BuildMna;
use voltaic_solver::trace::Trace;
use voltaic_solver::transient::{SimOptions, simulate_with};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Method {
    /// Backward Euler.
    Be,
    /// Trapezoidal.
    Trap,
}

impl From<Method> for IntegrationMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::Be => IntegrationMethod::BackwardEuler,
            Method::Trap => IntegrationMethod::Trapezoidal,
        }
    }
}

/// Transient circuit simulator.
#[derive(Debug, Parser)]
#[command(name = "voltaic", version, about)]
struct Args {
    /// Netlist file.
    netlist: PathBuf,

    /// Simulation end time (s).
    #[arg(long)]
    tstop: f64,

    /// Initial step size (s); defaults to tstop/1000.
    #[arg(long)]
    dt: Option<f64>,

    /// Integration method.
    #[arg(long, value_enum, default_value_t = Method::Trap)]
    method: Method,

    /// Comma-separated wire ids to print; defaults to every non-ground wire.
    #[arg(long)]
    wires: Option<String>,

    /// Number of evenly-spaced output rows.
    #[arg(long, default_value_t = 50)]
    samples: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if args.tstop <= 0.0 {
        bail!("tstop must be positive");
    }

    let circuit = Circuit::load(&args.netlist)
        .with_context(|| format!("loading {}", args.netlist.display()))?;

    let mut mna = circuit.build_mna().context("building MNA system")?;
    mna.set_method(args.method.into());
    let trace = Trace::attach(&mut mna);

    let mut options = SimOptions::for_end_time(args.tstop);
    if let Some(dt) = args.dt {
        options.dt_init = dt;
    }
    let stats = simulate_with(args.tstop, &mut mna, &options).context("transient analysis")?;

    // Wires to print: explicit list, or every wire with a matrix index.
    let wires: Vec<WireId> = match &args.wires {
        Some(list) => list
            .split(',')
            .map(|token| {
                token
                    .trim()
                    .parse::<u32>()
                    .map(WireId::new)
                    .map_err(|_| anyhow::anyhow!("bad wire id '{token}'"))
            })
            .collect::<Result<_>>()?,
        None => circuit
            .link()
            .wires()
            .filter(|w| mna.nodes().matrix_index(*w).is_some())
            .collect(),
    };

    let trace = trace.borrow();
    let step = args.tstop / args.samples.max(1) as f64;
    let sampled = trace.sample_at_times(step, 0.0, args.tstop);

    print!("{:>14}", "Time");
    for wire in &wires {
        print!("{:>14}", format!("V({wire})"));
    }
    println!();
    println!("{}", "-".repeat(14 * (1 + wires.len())));

    for point in sampled.points() {
        print!("{:>14.6e}", point.time);
        for wire in &wires {
            let v = mna
                .nodes()
                .matrix_index(*wire)
                .map(|i| point.solution[i])
                .unwrap_or(0.0);
            print!("{v:>14.6}");
        }
        println!();
    }

    println!();
    println!(
        "Transient complete: {} accepted steps, {} rejected, final dt = {:.3e}.",
        stats.accepted_steps, stats.rejected_steps, stats.final_dt
    );
    Ok(())
}

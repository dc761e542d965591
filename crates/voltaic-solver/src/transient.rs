//! Adaptive transient driver.
//!
//! One outer pass per time step: a step-size governor, a cancellation poll,
//! then one MNA solve. Non-convergence and singular pivots are governor
//! signals, never immediately fatal; only an accumulated failure streak
//! surfaces as [`Error::ConvergenceFailure`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use voltaic_core::error::{Error, Result};

use crate::mna::Mna;

/// Step growth factor.
const DT_GROW: f64 = 1.2;
/// Step shrink divisor.
const DT_SHRINK: f64 = 1.5;
/// Accepted-step streak that earns a larger step.
const GROW_AFTER: i32 = 10;
/// Failure debt that forces a smaller step.
const SHRINK_AFTER: i32 = -5;

/// Cooperative cancellation flag; clone it into the host side and flip it
/// from anywhere. The driver polls between steps.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request termination at the next step boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Driver tuning knobs.
#[derive(Debug, Clone)]
pub struct SimOptions {
    /// Initial step size.
    pub dt_init: f64,
    /// Smallest step the governor may reach.
    pub dt_min: f64,
    /// Largest step the governor may reach.
    pub dt_max: f64,
    /// Failed solves tolerated since the last step-size change before the
    /// run aborts.
    pub max_failures: usize,
    /// Optional host cancellation flag.
    pub cancel: Option<CancelToken>,
}

impl SimOptions {
    /// Defaults scaled to the simulated interval.
    pub fn for_end_time(end_time: f64) -> Self {
        Self {
            dt_init: end_time / 1e3,
            dt_min: end_time / 1e9,
            dt_max: end_time / 50.0,
            max_failures: 100,
            cancel: None,
        }
    }
}

/// Outcome counters for a completed run.
#[derive(Debug, Clone, Copy)]
pub struct SimStats {
    /// Accepted time steps.
    pub accepted_steps: usize,
    /// Steps rejected by non-convergence or singular pivots.
    pub rejected_steps: usize,
    /// Step size at termination.
    pub final_dt: f64,
}

/// Run a transient from t = 0 to `end_time` with default options.
pub fn simulate(end_time: f64, mna: &mut Mna) -> Result<SimStats> {
    simulate_with(end_time, mna, &SimOptions::for_end_time(end_time))
}

/// Run a transient with explicit options.
pub fn simulate_with(end_time: f64, mna: &mut Mna, options: &SimOptions) -> Result<SimStats> {
    let mut t = 0.0f64;
    let mut dt = options.dt_init.clamp(options.dt_min, options.dt_max);
    // Signed so short failure streaks amortize against earlier successes.
    let mut good_iters: i32 = 0;
    let mut max_good_iter: usize = 0;
    let mut accepted = 0usize;
    let mut rejected = 0usize;

    mna.on_step_change(dt);

    loop {
        // Governor. The branch order is load-bearing: range clamps first,
        // then growth/shrink, then the abort and termination checks.
        if dt > options.dt_max {
            dt = (dt / DT_SHRINK).max(options.dt_min);
        } else if dt < options.dt_min {
            dt = (dt * DT_GROW).min(options.dt_max);
        } else if good_iters > GROW_AFTER && dt < options.dt_max {
            let next = (dt * DT_GROW).min(options.dt_max);
            if next != dt {
                log::debug!("t = {t:.3e}: step grows {dt:.3e} -> {next:.3e}");
                dt = next;
                mna.on_step_change(dt);
                good_iters = 0;
                max_good_iter = 0;
            }
        } else if good_iters < SHRINK_AFTER && dt > options.dt_min {
            let next = (dt / DT_SHRINK).max(options.dt_min);
            if next != dt {
                log::debug!("t = {t:.3e}: step shrinks {dt:.3e} -> {next:.3e}");
                dt = next;
                mna.on_step_change(dt);
                good_iters = 0;
                max_good_iter = 0;
            }
        } else if max_good_iter > options.max_failures {
            return Err(Error::ConvergenceFailure);
        } else if t > end_time {
            break;
        }

        if let Some(cancel) = &options.cancel {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
        }

        match mna.solve(dt, t + dt) {
            Ok(true) => {
                good_iters += 1;
                accepted += 1;
                t += dt;
                mna.accept(dt, t);
            }
            Ok(false) => {
                good_iters -= 1;
                max_good_iter += 1;
                rejected += 1;
            }
            // A collapsed pivot is non-convergence, not a hard failure: the
            // governor shrinks the step and the failure cap bounds retries.
            Err(Error::Singular) => {
                good_iters -= 1;
                max_good_iter += 1;
                rejected += 1;
            }
            Err(other) => return Err(other),
        }
    }

    Ok(SimStats {
        accepted_steps: accepted,
        rejected_steps: rejected,
        final_dt: dt,
    })
}

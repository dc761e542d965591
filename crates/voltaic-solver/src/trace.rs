//! Probe-fed recording of a transient run, with interpolation.

use std::cell::RefCell;
use std::rc::Rc;

use nalgebra::DVector;

use crate::mna::Mna;

/// A single recorded timepoint.
#[derive(Debug, Clone)]
pub struct TracePoint {
    /// Accepted time (s).
    pub time: f64,
    /// Solution vector at this time.
    pub solution: DVector<f64>,
}

/// A sequence of accepted `(t, x)` points.
#[derive(Debug, Clone)]
pub struct Trace {
    points: Vec<TracePoint>,
    num_nodes: usize,
}

impl Trace {
    /// An empty trace.
    pub fn new(num_nodes: usize) -> Self {
        Self {
            points: Vec::new(),
            num_nodes,
        }
    }

    /// Register a recording probe on the MNA and return the shared trace.
    pub fn attach(mna: &mut Mna) -> Rc<RefCell<Trace>> {
        let trace = Rc::new(RefCell::new(Trace::new(mna.num_nodes())));
        let sink = trace.clone();
        mna.register_probe(move |t, x| sink.borrow_mut().push(t, x));
        trace
    }

    /// Append a point.
    pub fn push(&mut self, time: f64, solution: &DVector<f64>) {
        self.points.push(TracePoint {
            time,
            solution: solution.clone(),
        });
    }

    /// Recorded points in time order.
    pub fn points(&self) -> &[TracePoint] {
        &self.points
    }

    /// Count of non-ground nodes in each solution vector.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// `(t, v)` pairs for one solution index.
    pub fn waveform(&self, index: usize) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .map(|p| (p.time, p.solution[index]))
            .collect()
    }

    /// Linearly interpolate the solution at `time`; clamped at both ends.
    /// `None` on an empty trace.
    pub fn interpolate_at(&self, time: f64) -> Option<DVector<f64>> {
        let first = self.points.first()?;
        if time <= first.time {
            return Some(first.solution.clone());
        }
        let last = self.points.last()?;
        if time >= last.time {
            return Some(last.solution.clone());
        }

        for pair in self.points.windows(2) {
            let (p0, p1) = (&pair[0], &pair[1]);
            if time >= p0.time && time <= p1.time {
                let alpha = (time - p0.time) / (p1.time - p0.time);
                return Some(&p0.solution * (1.0 - alpha) + &p1.solution * alpha);
            }
        }
        None
    }

    /// Interpolated value of one solution index at `time`.
    pub fn value_at(&self, index: usize, time: f64) -> Option<f64> {
        self.interpolate_at(time).map(|x| x[index])
    }

    /// Resample onto a uniform grid, interpolating between accepted points.
    pub fn sample_at_times(&self, tstep: f64, tstart: f64, tstop: f64) -> Trace {
        let mut sampled = Trace::new(self.num_nodes);
        let mut t = tstart;
        while t <= tstop + tstep * 1e-3 {
            if let Some(solution) = self.interpolate_at(t) {
                sampled.push(t, &solution);
            }
            t += tstep;
        }
        sampled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_trace() -> Trace {
        let mut trace = Trace::new(2);
        trace.push(0.0, &DVector::from_vec(vec![0.0, 0.0]));
        trace.push(1.0, &DVector::from_vec(vec![1.0, 2.0]));
        trace.push(2.0, &DVector::from_vec(vec![2.0, 4.0]));
        trace
    }

    #[test]
    fn test_interpolate_at() {
        let trace = ramp_trace();

        let mid = trace.interpolate_at(0.5).unwrap();
        assert!((mid[0] - 0.5).abs() < 1e-12);
        assert!((mid[1] - 1.0).abs() < 1e-12);

        let exact = trace.interpolate_at(1.0).unwrap();
        assert!((exact[0] - 1.0).abs() < 1e-12);

        // Clamped outside the recorded range.
        assert_eq!(trace.interpolate_at(-1.0).unwrap()[0], 0.0);
        assert_eq!(trace.interpolate_at(5.0).unwrap()[0], 2.0);
    }

    #[test]
    fn test_sample_at_times() {
        let trace = ramp_trace();
        let sampled = trace.sample_at_times(0.5, 0.0, 2.0);
        assert_eq!(sampled.len(), 5);
        assert!((sampled.points()[1].time - 0.5).abs() < 1e-12);
        assert!((sampled.points()[3].solution[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_waveform() {
        let trace = ramp_trace();
        let wave = trace.waveform(1);
        assert_eq!(wave.len(), 3);
        assert_eq!(wave[2], (2.0, 4.0));
    }
}

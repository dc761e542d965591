//! Time-varying source waveforms.

use std::f64::consts::PI;

/// Waveform driven by an independent source.
#[derive(Debug, Clone, PartialEq)]
pub enum Waveform {
    /// Constant value.
    Dc(f64),
    /// Damped sine: `offset + amplitude·e^(−theta·(t−delay))·sin(2πf·(t−delay))`
    /// for `t ≥ delay`, `offset` before.
    Sin {
        offset: f64,
        amplitude: f64,
        freq: f64,
        delay: f64,
        theta: f64,
    },
    /// Pulse train with linear ramps. `period == 0` means one-shot.
    Pulse {
        v1: f64,
        v2: f64,
        delay: f64,
        rise: f64,
        fall: f64,
        width: f64,
        period: f64,
    },
    /// Piecewise-linear points `(t, v)`, clamped at both ends.
    Pwl(Vec<(f64, f64)>),
}

impl Waveform {
    /// Constant source.
    pub fn dc(value: f64) -> Self {
        Waveform::Dc(value)
    }

    /// Undamped, undelayed sine.
    pub fn sin(offset: f64, amplitude: f64, freq: f64) -> Self {
        Self::sin_full(offset, amplitude, freq, 0.0, 0.0)
    }

    /// Sine with delay and damping factor.
    pub fn sin_full(offset: f64, amplitude: f64, freq: f64, delay: f64, theta: f64) -> Self {
        Waveform::Sin {
            offset,
            amplitude,
            freq,
            delay,
            theta,
        }
    }

    /// Pulse waveform.
    pub fn pulse(v1: f64, v2: f64, delay: f64, rise: f64, fall: f64, width: f64, period: f64) -> Self {
        Waveform::Pulse {
            v1,
            v2,
            delay,
            rise,
            fall,
            width,
            period,
        }
    }

    /// Piecewise-linear waveform.
    pub fn pwl(points: Vec<(f64, f64)>) -> Self {
        Waveform::Pwl(points)
    }

    /// Evaluate the waveform at time `t`.
    pub fn value_at(&self, t: f64) -> f64 {
        match *self {
            Waveform::Dc(v) => v,
            Waveform::Sin {
                offset,
                amplitude,
                freq,
                delay,
                theta,
            } => {
                if t < delay {
                    offset
                } else {
                    let tau = t - delay;
                    offset + amplitude * (-theta * tau).exp() * (2.0 * PI * freq * tau).sin()
                }
            }
            Waveform::Pulse {
                v1,
                v2,
                delay,
                rise,
                fall,
                width,
                period,
            } => {
                if t < delay {
                    return v1;
                }
                let mut tp = t - delay;
                if period > 0.0 {
                    tp %= period;
                }
                if tp < rise {
                    // rise == 0 never reaches this branch
                    v1 + (v2 - v1) * tp / rise
                } else if tp < rise + width {
                    v2
                } else if tp < rise + width + fall {
                    v2 + (v1 - v2) * (tp - rise - width) / fall
                } else {
                    v1
                }
            }
            Waveform::Pwl(ref points) => {
                let Some(&(t0, v0)) = points.first() else {
                    return 0.0;
                };
                if t <= t0 {
                    return v0;
                }
                for pair in points.windows(2) {
                    let (ta, va) = pair[0];
                    let (tb, vb) = pair[1];
                    if t <= tb {
                        if tb <= ta {
                            return vb;
                        }
                        return va + (vb - va) * (t - ta) / (tb - ta);
                    }
                }
                points.last().map(|&(_, v)| v).unwrap_or(0.0)
            }
        }
    }
}

//! Band-limited oscillator
//!
//! Square and sawtooth use polyBLEP correction at their discontinuities.
//! The phase accumulator survives waveform changes, so switching shape
//! mid-note does not click.

use dubmix_core::Waveform;

#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    phase: f64,
    sample_rate: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform, sample_rate: f32) -> Self {
        Self {
            waveform,
            phase: 0.0,
            sample_rate: sample_rate as f64,
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Normalized phase in `[0, 1)`
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Render one sample at `frequency_hz` and advance the phase.
    /// Negative frequencies run the phase backwards.
    #[inline]
    pub fn next_sample(&mut self, frequency_hz: f32) -> f32 {
        let dt = frequency_hz as f64 / self.sample_rate;
        let p = self.phase;
        let step = dt.abs();

        let value = match self.waveform {
            Waveform::Sine => (std::f64::consts::TAU * p).sin(),
            Waveform::Triangle => 4.0 * (((p + 0.75) % 1.0) - 0.5).abs() - 1.0,
            Waveform::Sawtooth => {
                let shifted = (p + 0.5) % 1.0;
                2.0 * shifted - 1.0 - poly_blep(shifted, step)
            }
            Waveform::Square => {
                let naive = if p < 0.5 { 1.0 } else { -1.0 };
                naive + poly_blep(p, step) - poly_blep((p + 0.5) % 1.0, step)
            }
        };

        self.phase = (p + dt).rem_euclid(1.0);
        value as f32
    }
}

/// Two-sample polynomial band-limited step residual
#[inline]
fn poly_blep(t: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        return 0.0;
    }
    if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}

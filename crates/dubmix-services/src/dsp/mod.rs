//! Sample-level building blocks used by the signal graph

pub mod delay_line;
pub mod oscillator;

pub use delay_line::DelayLine;
pub use oscillator::Oscillator;

/// Butterworth Q, two fundsp SVF sections at this Q give a Linkwitz-Riley slope
pub const BUTTERWORTH_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Cutoffs are held below this fraction of the sample rate. The SVF
/// prewarp `tan(pi * f / sr)` diverges at Nyquist.
pub const MAX_CUTOFF_RATIO: f32 = 0.45;

/// Filter center/cutoff that is safe to hand to a fundsp SVF at `sample_rate`
pub fn limit_cutoff(hz: f32, sample_rate: f32) -> f32 {
    hz.clamp(1.0, sample_rate * MAX_CUTOFF_RATIO)
}

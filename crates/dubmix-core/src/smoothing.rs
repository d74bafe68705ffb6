//! Exponential parameter smoothing
//!
//! Every control value in the graph moves toward its target along a
//! one-pole exponential curve instead of jumping, which is what keeps
//! fader rides, kill switches and knob drags free of zipper noise.

/// Time constant for preamp band gains and mutes
pub const BAND_GAIN_TIME_CONSTANT_SECS: f32 = 0.05;
/// Time constant for graphic EQ gains
pub const EQ_TIME_CONSTANT_SECS: f32 = 0.1;
/// Time constant for all dub delay controls
pub const DELAY_TIME_CONSTANT_SECS: f32 = 0.1;
/// Time constant for siren frequency, rate, depth and level
pub const SIREN_TIME_CONSTANT_SECS: f32 = 0.05;

const SETTLE_EPSILON: f64 = 1e-6;

/// A value that approaches its target with a fixed time constant.
///
/// After one time constant the value has covered ~63% of the distance to
/// the target, after five it is within 1%.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedParam {
    // f64: an f32 ramp stalls short of the target
    current: f64,
    target: f64,
    coeff: f64,
}

impl SmoothedParam {
    pub fn new(initial: f32, time_constant_secs: f32, sample_rate: f32) -> Self {
        let samples = (time_constant_secs as f64 * sample_rate as f64).max(f64::EPSILON);
        Self {
            current: initial as f64,
            target: initial as f64,
            coeff: 1.0 - (-1.0 / samples).exp(),
        }
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target as f64;
    }

    pub fn target(&self) -> f32 {
        self.target as f32
    }

    pub fn current(&self) -> f32 {
        self.current as f32
    }

    /// Skip the ramp and sit on `value`
    pub fn jump_to(&mut self, value: f32) {
        self.current = value as f64;
        self.target = value as f64;
    }

    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }

    /// Advance one sample and return the new value
    pub fn tick(&mut self) -> f32 {
        if self.current == self.target {
            return self.current as f32;
        }
        self.current += (self.target - self.current) * self.coeff;
        if (self.target - self.current).abs() <= SETTLE_EPSILON * self.target.abs().max(1.0) {
            self.current = self.target;
        }
        self.current as f32
    }

    /// Advance `samples` steps
    pub fn advance(&mut self, samples: usize) -> f32 {
        for _ in 0..samples {
            if self.is_settled() {
                break;
            }
            self.tick();
        }
        self.current as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    #[test]
    fn test_starts_settled() {
        let mut p = SmoothedParam::new(0.5, 0.05, SR);
        assert!(p.is_settled());
        assert_eq!(p.tick(), 0.5);
    }

    #[test]
    fn test_one_time_constant() {
        let mut p = SmoothedParam::new(0.0, 0.05, SR);
        p.set_target(1.0);
        let v = p.advance((0.05 * SR) as usize);
        // 1 - e^-1
        assert!((v - 0.632).abs() < 0.01, "v={v}");
    }

    #[test]
    fn test_never_steps_instantly() {
        let mut p = SmoothedParam::new(0.0, 0.05, SR);
        p.set_target(1.0);
        let first = p.tick();
        assert!(first > 0.0 && first < 0.01);
    }

    #[test]
    fn test_settles_on_target() {
        let mut p = SmoothedParam::new(0.8, 0.1, SR);
        p.set_target(0.0);
        p.advance((2.0 * SR) as usize);
        assert!(p.is_settled());
        assert_eq!(p.current(), 0.0);
    }

    #[test]
    fn test_retarget_mid_ramp() {
        let mut p = SmoothedParam::new(0.0, 0.05, SR);
        p.set_target(1.0);
        p.advance(1000);
        let mid = p.current();
        p.set_target(0.25);
        p.advance((1.0 * SR) as usize);
        assert!(mid > 0.25);
        assert_eq!(p.current(), 0.25);
    }

    #[test]
    fn test_jump() {
        let mut p = SmoothedParam::new(0.0, 0.05, SR);
        p.set_target(1.0);
        p.jump_to(0.3);
        assert!(p.is_settled());
        assert_eq!(p.tick(), 0.3);
    }
}

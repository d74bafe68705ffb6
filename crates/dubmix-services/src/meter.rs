//! Metering taps with read-only handles for visualization

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use fundsp::math::amp_db;

const PEAK_DECAY: f32 = 0.95;

/// Shared metering state (lock-free reads from UI).
///
/// Consumers only get `&MeterState` through an `Arc`; the write side is
/// crate-private and driven by the renderer.
#[derive(Debug)]
pub struct MeterState {
    peak_raw: AtomicU32,
    rms_raw: AtomicU32,
    clipped: AtomicBool,
}

impl MeterState {
    pub(crate) fn new() -> Self {
        Self {
            peak_raw: AtomicU32::new(0),
            rms_raw: AtomicU32::new(0),
            clipped: AtomicBool::new(false),
        }
    }

    pub fn peak(&self) -> f32 {
        f32::from_bits(self.peak_raw.load(Ordering::Relaxed))
    }

    pub fn rms(&self) -> f32 {
        f32::from_bits(self.rms_raw.load(Ordering::Relaxed))
    }

    /// Peak in dBFS, negative infinity when silent
    pub fn peak_db(&self) -> f32 {
        amp_db(self.peak())
    }

    pub fn rms_db(&self) -> f32 {
        amp_db(self.rms())
    }

    pub fn is_clipped(&self) -> bool {
        self.clipped.load(Ordering::Relaxed)
    }

    pub fn clear_clip(&self) {
        self.clipped.store(false, Ordering::Relaxed);
    }

    fn set_peak(&self, val: f32) {
        self.peak_raw.store(val.to_bits(), Ordering::Relaxed);
    }

    fn set_rms(&self, val: f32) {
        self.rms_raw.store(val.to_bits(), Ordering::Relaxed);
    }

    fn set_clipped(&self) {
        self.clipped.store(true, Ordering::Relaxed);
    }
}

/// Renderer-side accumulator feeding one [`MeterState`]
#[derive(Debug, Default)]
pub(crate) struct MeterTap {
    peak_hold: f32,
    block_peak: f32,
    sum_squares: f32,
    count: usize,
}

impl MeterTap {
    pub fn observe(&mut self, samples: &[f32]) {
        for &s in samples {
            self.block_peak = self.block_peak.max(s.abs());
            self.sum_squares += s * s;
        }
        self.count += samples.len();
    }

    /// Push the accumulated block to the shared state and start over
    pub fn publish(&mut self, state: &MeterState) {
        if self.count == 0 {
            return;
        }
        self.peak_hold = f32::max(self.block_peak, self.peak_hold * PEAK_DECAY);
        state.set_peak(self.peak_hold);
        state.set_rms((self.sum_squares / self.count as f32).sqrt());
        if self.block_peak > 1.0 {
            state.set_clipped();
        }
        self.block_peak = 0.0;
        self.sum_squares = 0.0;
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_peak_and_rms() {
        let state = MeterState::new();
        let mut tap = MeterTap::default();
        tap.observe(&[0.5, -0.5, 0.5, -0.5]);
        tap.publish(&state);
        assert_eq!(state.peak(), 0.5);
        assert!((state.peak_db() + 6.02).abs() < 0.01);
        assert!((state.rms() - 0.5).abs() < 1e-6);
        assert!(!state.is_clipped());
    }

    #[test]
    fn test_peak_decays() {
        let state = MeterState::new();
        let mut tap = MeterTap::default();
        tap.observe(&[0.8]);
        tap.publish(&state);
        tap.observe(&[0.0; 64]);
        tap.publish(&state);
        assert!((state.peak() - 0.8 * PEAK_DECAY).abs() < 1e-6);
        assert_eq!(state.rms(), 0.0);
    }

    #[test]
    fn test_clip_is_sticky_until_cleared() {
        let state = MeterState::new();
        let mut tap = MeterTap::default();
        tap.observe(&[1.2]);
        tap.publish(&state);
        tap.observe(&[0.1]);
        tap.publish(&state);
        assert!(state.is_clipped());
        state.clear_clip();
        assert!(!state.is_clipped());
    }
}

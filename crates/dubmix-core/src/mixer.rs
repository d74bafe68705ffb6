//! Control-side mixer state: preamp band gains with mute memory, EQ gains

use serde::{Deserialize, Serialize};

use crate::band::FrequencyBand;
use crate::error::{DubmixError, Result};
use crate::params::{BAND_GAIN, EQ_BAND_COUNT, EQ_GAIN_DB};

/// User gain and kill switch for one preamp band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandState {
    /// Last gain the user set, kept while muted
    pub gain: f32,
    pub muted: bool,
}

impl Default for BandState {
    fn default() -> Self {
        Self {
            gain: BAND_GAIN.default,
            muted: false,
        }
    }
}

impl BandState {
    /// Gain the band's gain node should be driven to
    pub fn effective_gain(&self) -> f32 {
        if self.muted { 0.0 } else { self.gain }
    }
}

/// All five preamp bands
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PreampState {
    bands: [BandState; FrequencyBand::COUNT],
}

impl PreampState {
    pub fn band(&self, band: FrequencyBand) -> BandState {
        self.bands[band.index()]
    }

    /// Store a new user gain. Returns the effective gain to apply.
    pub fn set_gain(&mut self, band: FrequencyBand, gain: f32) -> f32 {
        let state = &mut self.bands[band.index()];
        state.gain = BAND_GAIN.clamp(gain);
        state.effective_gain()
    }

    /// Toggle the kill switch. Returns the effective gain to apply.
    pub fn set_muted(&mut self, band: FrequencyBand, muted: bool) -> f32 {
        let state = &mut self.bands[band.index()];
        state.muted = muted;
        state.effective_gain()
    }
}

/// Gains of the ten graphic EQ bands, in dB
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EqState {
    gains_db: [f32; EQ_BAND_COUNT],
}

impl EqState {
    pub fn gain_db(&self, index: usize) -> Option<f32> {
        self.gains_db.get(index).copied()
    }

    pub fn gains_db(&self) -> &[f32; EQ_BAND_COUNT] {
        &self.gains_db
    }

    /// Store a gain for one band. Returns the clamped value.
    pub fn set_gain_db(&mut self, index: usize, gain_db: f32) -> Result<f32> {
        let slot = self
            .gains_db
            .get_mut(index)
            .ok_or(DubmixError::EqIndexOutOfRange(index))?;
        *slot = EQ_GAIN_DB.clamp(gain_db);
        Ok(*slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_gain_is_half() {
        let preamp = PreampState::default();
        for band in FrequencyBand::ALL {
            assert_eq!(preamp.band(band).effective_gain(), 0.5);
        }
    }

    #[test]
    fn test_mute_restores_exact_gain() {
        let mut preamp = PreampState::default();
        for g in [0.0, 0.13, 0.5, 0.77, 1.0] {
            preamp.set_gain(FrequencyBand::Mid, g);
            assert_eq!(preamp.set_muted(FrequencyBand::Mid, true), 0.0);
            assert_eq!(preamp.set_muted(FrequencyBand::Mid, false), g);
        }
    }

    #[test]
    fn test_gain_change_while_muted_stays_silent() {
        let mut preamp = PreampState::default();
        preamp.set_muted(FrequencyBand::Bass, true);
        assert_eq!(preamp.set_gain(FrequencyBand::Bass, 0.9), 0.0);
        assert_eq!(preamp.set_muted(FrequencyBand::Bass, false), 0.9);
    }

    #[test]
    fn test_mute_leaves_other_bands() {
        let mut preamp = PreampState::default();
        preamp.set_gain(FrequencyBand::Sub, 0.2);
        preamp.set_gain(FrequencyBand::Bass, 0.8);
        preamp.set_muted(FrequencyBand::Bass, true);
        assert_eq!(preamp.band(FrequencyBand::Sub).effective_gain(), 0.2);
        assert_eq!(preamp.band(FrequencyBand::Bass).effective_gain(), 0.0);
    }

    #[test]
    fn test_gain_clamped() {
        let mut preamp = PreampState::default();
        assert_eq!(preamp.set_gain(FrequencyBand::High, 3.0), 1.0);
        assert_eq!(preamp.set_gain(FrequencyBand::High, -3.0), 0.0);
    }

    #[test]
    fn test_eq_set_and_clamp() {
        let mut eq = EqState::default();
        assert_eq!(eq.set_gain_db(0, 6.0), Ok(6.0));
        assert_eq!(eq.set_gain_db(9, -40.0), Ok(-12.0));
        assert_eq!(eq.set_gain_db(10, 3.0), Err(DubmixError::EqIndexOutOfRange(10)));
        assert_eq!(eq.gain_db(0), Some(6.0));
        assert_eq!(eq.gain_db(10), None);
    }
}

//! Control cells shared between the control thread and the renderer
//!
//! The [`ControlSurface`] is built once per session and never reshaped:
//! one cell per controllable node parameter. The control thread stores
//! targets, the renderer loads them at the start of every block and feeds
//! them into its smoothers. Stores and loads are single atomic words, so
//! neither side ever waits on the other.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use dubmix_core::params::{
    BAND_GAIN, DELAY_FEEDBACK, DELAY_HIGHPASS_HZ, DELAY_LOWPASS_HZ, DELAY_MUSIC_SEND,
    DELAY_RETURN, DELAY_SIREN_SEND, DELAY_TIME_SECS, EQ_BAND_COUNT, EQ_GAIN_DB,
    SIREN_FREQUENCY_HZ, SIREN_LEVEL, SIREN_LFO_RATE_HZ,
};
use dubmix_core::{DelayParams, FrequencyBand, SirenMode, SirenParams};

/// Lock-free f32 cell
#[derive(Debug)]
pub struct ControlValue {
    bits: AtomicU32,
}

impl ControlValue {
    pub fn new(value: f32) -> Self {
        Self {
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn set(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Delay unit control cells
#[derive(Debug)]
pub struct DelayControls {
    pub time_secs: ControlValue,
    pub feedback: ControlValue,
    pub return_level: ControlValue,
    pub music_send: ControlValue,
    pub siren_send: ControlValue,
    pub highpass_hz: ControlValue,
    pub lowpass_hz: ControlValue,
}

impl DelayControls {
    fn new() -> Self {
        Self {
            time_secs: ControlValue::new(DELAY_TIME_SECS.default),
            feedback: ControlValue::new(DELAY_FEEDBACK.default),
            return_level: ControlValue::new(DELAY_RETURN.default),
            music_send: ControlValue::new(DELAY_MUSIC_SEND.default),
            siren_send: ControlValue::new(DELAY_SIREN_SEND.default),
            highpass_hz: ControlValue::new(DELAY_HIGHPASS_HZ.default),
            lowpass_hz: ControlValue::new(DELAY_LOWPASS_HZ.default),
        }
    }

    /// Store already-clamped params
    pub fn store(&self, params: &DelayParams) {
        self.time_secs.set(params.time_secs);
        self.feedback.set(params.feedback);
        self.return_level.set(params.return_level);
        self.music_send.set(params.music_send);
        self.siren_send.set(params.siren_send);
        self.highpass_hz.set(params.highpass_hz);
        self.lowpass_hz.set(params.lowpass_hz);
    }

    pub fn load(&self) -> DelayParams {
        DelayParams {
            time_secs: self.time_secs.get(),
            feedback: self.feedback.get(),
            return_level: self.return_level.get(),
            music_send: self.music_send.get(),
            siren_send: self.siren_send.get(),
            highpass_hz: self.highpass_hz.get(),
            lowpass_hz: self.lowpass_hz.get(),
        }
    }
}

/// Siren control cells
#[derive(Debug)]
pub struct SirenControls {
    pub frequency_hz: ControlValue,
    pub lfo_rate_hz: ControlValue,
    pub level: ControlValue,
    mode: AtomicU8,
}

impl SirenControls {
    fn new() -> Self {
        Self {
            frequency_hz: ControlValue::new(SIREN_FREQUENCY_HZ.default),
            lfo_rate_hz: ControlValue::new(SIREN_LFO_RATE_HZ.default),
            level: ControlValue::new(SIREN_LEVEL.default),
            mode: AtomicU8::new(SirenMode::default().index()),
        }
    }

    pub fn mode(&self) -> SirenMode {
        SirenMode::from_index(self.mode.load(Ordering::Relaxed))
    }

    /// Store already-clamped params
    pub fn store(&self, params: &SirenParams) {
        self.frequency_hz.set(params.frequency_hz);
        self.lfo_rate_hz.set(params.lfo_rate_hz);
        self.level.set(params.level);
        self.mode.store(params.mode.index(), Ordering::Relaxed);
    }

    pub fn load(&self) -> SirenParams {
        SirenParams {
            frequency_hz: self.frequency_hz.get(),
            lfo_rate_hz: self.lfo_rate_hz.get(),
            mode: self.mode(),
            level: self.level.get(),
        }
    }
}

/// Registry of every controllable parameter in the graph
#[derive(Debug)]
pub struct ControlSurface {
    pub band_gains: [ControlValue; FrequencyBand::COUNT],
    pub eq_gains_db: [ControlValue; EQ_BAND_COUNT],
    pub delay: DelayControls,
    pub siren: SirenControls,
}

impl ControlSurface {
    pub fn new() -> Self {
        Self {
            band_gains: std::array::from_fn(|_| ControlValue::new(BAND_GAIN.default)),
            eq_gains_db: std::array::from_fn(|_| ControlValue::new(EQ_GAIN_DB.default)),
            delay: DelayControls::new(),
            siren: SirenControls::new(),
        }
    }

    pub fn band_gain(&self, band: FrequencyBand) -> &ControlValue {
        &self.band_gains[band.index()]
    }
}

impl Default for ControlSurface {
    fn default() -> Self {
        Self::new()
    }
}

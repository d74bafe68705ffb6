//! Parameter ranges and the value types exchanged with the engine
//!
//! Every numeric control has a [`ParamRange`]. Out-of-range input is
//! clamped to the nearest boundary instead of being rejected, so a live
//! gesture never fails halfway through a performance.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DubmixError;

/// Inclusive range with a default value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ParamRange {
    pub const fn new(min: f32, max: f32, default: f32) -> Self {
        Self { min, max, default }
    }

    /// Clamp into the range. NaN maps to `min`.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

// Preamp
pub const BAND_GAIN: ParamRange = ParamRange::new(0.0, 1.0, 0.5);

// Graphic EQ
pub const EQ_BAND_COUNT: usize = 10;
pub const EQ_CENTER_FREQUENCIES_HZ: [f32; EQ_BAND_COUNT] = [
    31.0, 63.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];
pub const EQ_Q: f32 = 1.4;
pub const EQ_GAIN_DB: ParamRange = ParamRange::new(-12.0, 12.0, 0.0);

// Siren
pub const SIREN_FREQUENCY_HZ: ParamRange = ParamRange::new(100.0, 1500.0, 440.0);
pub const SIREN_LFO_RATE_HZ: ParamRange = ParamRange::new(0.05, 15.0, 5.0);
pub const SIREN_LEVEL: ParamRange = ParamRange::new(0.0, 1.0, 0.1);

// Dub delay
pub const DELAY_MAX_TIME_SECS: f32 = 5.0;
pub const DELAY_FILTER_Q: f32 = 0.7;
pub const DELAY_TIME_SECS: ParamRange = ParamRange::new(0.05, 1.5, 0.3);
pub const DELAY_FEEDBACK: ParamRange = ParamRange::new(0.0, 0.99, 0.4);
pub const DELAY_RETURN: ParamRange = ParamRange::new(0.0, 1.0, 0.5);
pub const DELAY_MUSIC_SEND: ParamRange = ParamRange::new(0.0, 1.0, 0.0);
pub const DELAY_SIREN_SEND: ParamRange = ParamRange::new(0.0, 1.0, 1.0);
pub const DELAY_HIGHPASS_HZ: ParamRange = ParamRange::new(20.0, 1000.0, 100.0);
pub const DELAY_LOWPASS_HZ: ParamRange = ParamRange::new(500.0, 15000.0, 3000.0);

/// Oscillator waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// Siren circuit character: carrier/LFO waveform pair and modulation depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SirenMode {
    /// Sine tone swept by a triangle LFO
    Roots,
    /// Square tone swept by a triangle LFO, the classic 555 sound
    #[default]
    Digital,
    /// Sawtooth tone swept by a sawtooth LFO
    Alarm,
}

impl SirenMode {
    /// Mode for a raw selector index, clamped onto the nearest mode
    pub fn from_index(index: u8) -> Self {
        match index {
            0 => Self::Roots,
            1 => Self::Digital,
            _ => Self::Alarm,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Self::Roots => 0,
            Self::Digital => 1,
            Self::Alarm => 2,
        }
    }

    pub fn carrier_waveform(self) -> Waveform {
        match self {
            Self::Roots => Waveform::Sine,
            Self::Digital => Waveform::Square,
            Self::Alarm => Waveform::Sawtooth,
        }
    }

    pub fn lfo_waveform(self) -> Waveform {
        match self {
            Self::Roots | Self::Digital => Waveform::Triangle,
            Self::Alarm => Waveform::Sawtooth,
        }
    }

    /// LFO depth as a fraction of the carrier frequency
    pub fn depth_ratio(self) -> f32 {
        match self {
            Self::Roots => 0.25,
            Self::Digital => 0.4,
            Self::Alarm => 0.6,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Roots => "ROOTS",
            Self::Digital => "DIGI",
            Self::Alarm => "ALARM",
        }
    }
}

impl fmt::Display for SirenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SirenMode {
    type Err = DubmixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(index) = s.parse::<u8>() {
            return Ok(Self::from_index(index));
        }
        match s.to_ascii_lowercase().as_str() {
            "roots" => Ok(Self::Roots),
            "digital" | "digi" => Ok(Self::Digital),
            "alarm" => Ok(Self::Alarm),
            _ => Err(DubmixError::UnknownSirenMode(s.to_string())),
        }
    }
}

/// Map a linear 0..1 control position onto the LFO rate (exponential)
pub fn lfo_rate_from_control(position: f32) -> f32 {
    let position = position.clamp(0.0, 1.0);
    let ratio = SIREN_LFO_RATE_HZ.max / SIREN_LFO_RATE_HZ.min;
    SIREN_LFO_RATE_HZ.min * ratio.powf(position)
}

/// Inverse of [`lfo_rate_from_control`]
pub fn control_from_lfo_rate(rate_hz: f32) -> f32 {
    let rate_hz = SIREN_LFO_RATE_HZ.clamp(rate_hz);
    let ratio = SIREN_LFO_RATE_HZ.max / SIREN_LFO_RATE_HZ.min;
    (rate_hz / SIREN_LFO_RATE_HZ.min).ln() / ratio.ln()
}

/// Siren settings as sent by the control surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SirenParams {
    pub frequency_hz: f32,
    pub lfo_rate_hz: f32,
    pub mode: SirenMode,
    pub level: f32,
}

impl Default for SirenParams {
    fn default() -> Self {
        Self {
            frequency_hz: SIREN_FREQUENCY_HZ.default,
            lfo_rate_hz: SIREN_LFO_RATE_HZ.default,
            mode: SirenMode::default(),
            level: SIREN_LEVEL.default,
        }
    }
}

impl SirenParams {
    pub fn clamped(self) -> Self {
        Self {
            frequency_hz: SIREN_FREQUENCY_HZ.clamp(self.frequency_hz),
            lfo_rate_hz: SIREN_LFO_RATE_HZ.clamp(self.lfo_rate_hz),
            mode: self.mode,
            level: SIREN_LEVEL.clamp(self.level),
        }
    }

    /// Carrier frequency swing produced by the LFO, in Hz
    pub fn depth_hz(&self) -> f32 {
        self.frequency_hz * self.mode.depth_ratio()
    }
}

/// Dub delay settings as sent by the control surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayParams {
    pub time_secs: f32,
    pub feedback: f32,
    pub return_level: f32,
    pub music_send: f32,
    pub siren_send: f32,
    pub highpass_hz: f32,
    pub lowpass_hz: f32,
}

impl Default for DelayParams {
    fn default() -> Self {
        Self {
            time_secs: DELAY_TIME_SECS.default,
            feedback: DELAY_FEEDBACK.default,
            return_level: DELAY_RETURN.default,
            music_send: DELAY_MUSIC_SEND.default,
            siren_send: DELAY_SIREN_SEND.default,
            highpass_hz: DELAY_HIGHPASS_HZ.default,
            lowpass_hz: DELAY_LOWPASS_HZ.default,
        }
    }
}

impl DelayParams {
    /// Clamp every field. Feedback always ends up strictly below 1.0.
    pub fn clamped(self) -> Self {
        Self {
            time_secs: DELAY_TIME_SECS.clamp(self.time_secs),
            feedback: DELAY_FEEDBACK.clamp(self.feedback),
            return_level: DELAY_RETURN.clamp(self.return_level),
            music_send: DELAY_MUSIC_SEND.clamp(self.music_send),
            siren_send: DELAY_SIREN_SEND.clamp(self.siren_send),
            highpass_hz: DELAY_HIGHPASS_HZ.clamp(self.highpass_hz),
            lowpass_hz: DELAY_LOWPASS_HZ.clamp(self.lowpass_hz),
        }
    }
}

/// Siren hardware character selector. Stored and reported only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SirenModel {
    #[default]
    RetroBox,
    DigitalRack,
    ModularSynth,
}

/// Echo hardware character selector. Stored and reported only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DelayModel {
    #[default]
    TapeEcho,
    DigitalDelay,
    BucketBrigade,
}

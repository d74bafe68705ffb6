//! Siren voice and its trigger state machine
//!
//! A voice is a carrier oscillator whose frequency is swept by an LFO
//! through a depth gain. The voice slot is filled on the first trigger and
//! emptied shortly after the release tail, so an idle siren costs nothing
//! per sample.
//!
//! ```text
//! Idle ──on──► Attack ──env=1──► Sustained ──off──► Release ──250ms──► Idle
//!                ▲                                     │
//!                └──────────────────on─────────────────┘
//! ```

use std::fmt;

use dubmix_core::params::SIREN_LEVEL;
use dubmix_core::smoothing::SIREN_TIME_CONSTANT_SECS;
use dubmix_core::{SirenParams, SmoothedParam, Waveform};

use crate::dsp::Oscillator;

pub const ATTACK_SECS: f32 = 0.01;
pub const RELEASE_SECS: f32 = 0.15;
/// Oscillators stop this long after the release starts
pub const STOP_AFTER_SECS: f32 = 0.2;
/// Voice slot is emptied this long after the release starts
pub const TEARDOWN_AFTER_SECS: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SirenPhase {
    #[default]
    Idle,
    Attack,
    Sustained,
    Release,
}

impl SirenPhase {
    pub fn index(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Attack => 1,
            Self::Sustained => 2,
            Self::Release => 3,
        }
    }

    pub fn from_index(index: u8) -> Self {
        match index {
            1 => Self::Attack,
            2 => Self::Sustained,
            3 => Self::Release,
            _ => Self::Idle,
        }
    }

    /// Whether the siren is sounding or about to
    pub fn is_gate_open(self) -> bool {
        matches!(self, Self::Attack | Self::Sustained)
    }
}

impl fmt::Display for SirenPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Attack => "attack",
            Self::Sustained => "sustained",
            Self::Release => "release",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
struct SirenVoice {
    carrier: Oscillator,
    lfo: Oscillator,
    frequency_hz: SmoothedParam,
    lfo_rate_hz: SmoothedParam,
    depth_hz: SmoothedParam,
    running: bool,
}

impl SirenVoice {
    fn new(params: &SirenParams, sample_rate: f32) -> Self {
        let smoothed = |value: f32| SmoothedParam::new(value, SIREN_TIME_CONSTANT_SECS, sample_rate);
        Self {
            carrier: Oscillator::new(params.mode.carrier_waveform(), sample_rate),
            lfo: Oscillator::new(params.mode.lfo_waveform(), sample_rate),
            frequency_hz: smoothed(params.frequency_hz),
            lfo_rate_hz: smoothed(params.lfo_rate_hz),
            depth_hz: smoothed(params.depth_hz()),
            running: true,
        }
    }

    fn retarget(&mut self, params: &SirenParams) {
        self.carrier.set_waveform(params.mode.carrier_waveform());
        self.lfo.set_waveform(params.mode.lfo_waveform());
        self.frequency_hz.set_target(params.frequency_hz);
        self.lfo_rate_hz.set_target(params.lfo_rate_hz);
        self.depth_hz.set_target(params.depth_hz());
    }

    #[inline]
    fn next_sample(&mut self) -> f32 {
        let frequency = self.frequency_hz.tick();
        let rate = self.lfo_rate_hz.tick();
        let depth = self.depth_hz.tick();
        if !self.running {
            return 0.0;
        }
        let sweep = self.lfo.next_sample(rate) * depth;
        self.carrier.next_sample(frequency + sweep)
    }
}

/// Snapshot of the live voice, for inspection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceInfo {
    pub carrier: Waveform,
    pub lfo: Waveform,
    pub frequency_hz: f32,
    pub lfo_rate_hz: f32,
    pub depth_hz: f32,
    pub running: bool,
}

pub struct SirenUnit {
    sample_rate: f32,
    params: SirenParams,
    phase: SirenPhase,
    voice: Option<SirenVoice>,
    level: SmoothedParam,
    envelope: f32,
    envelope_step: f32,
    release_elapsed: usize,
    stop_after: usize,
    teardown_after: usize,
    allocations: u64,
}

impl SirenUnit {
    pub fn new(params: SirenParams, sample_rate: f32) -> Self {
        let params = params.clamped();
        Self {
            sample_rate,
            params,
            phase: SirenPhase::Idle,
            voice: None,
            level: SmoothedParam::new(params.level, SIREN_TIME_CONSTANT_SECS, sample_rate),
            envelope: 0.0,
            envelope_step: 0.0,
            release_elapsed: 0,
            stop_after: (STOP_AFTER_SECS * sample_rate) as usize,
            teardown_after: (TEARDOWN_AFTER_SECS * sample_rate) as usize,
            allocations: 0,
        }
    }

    pub fn phase(&self) -> SirenPhase {
        self.phase
    }

    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    /// Number of voices allocated over the unit's lifetime
    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    pub fn params(&self) -> SirenParams {
        self.params
    }

    pub fn voice(&self) -> Option<VoiceInfo> {
        self.voice.as_ref().map(|voice| VoiceInfo {
            carrier: voice.carrier.waveform(),
            lfo: voice.lfo.waveform(),
            frequency_hz: voice.frequency_hz.target(),
            lfo_rate_hz: voice.lfo_rate_hz.target(),
            depth_hz: voice.depth_hz.target(),
            running: voice.running,
        })
    }

    /// Retarget the siren controls. A mode change on a live voice swaps
    /// waveforms and depth in place, without retriggering.
    pub fn set_params(&mut self, params: &SirenParams) {
        self.params = params.clamped();
        self.level.set_target(SIREN_LEVEL.clamp(self.params.level));
        if let Some(voice) = self.voice.as_mut() {
            voice.retarget(&self.params);
        }
    }

    pub fn set_gate(&mut self, open: bool) {
        if open {
            self.trigger_on();
        } else {
            self.trigger_off();
        }
    }

    fn trigger_on(&mut self) {
        match self.phase {
            SirenPhase::Attack | SirenPhase::Sustained => {}
            SirenPhase::Idle => {
                self.allocate_voice();
                self.start_attack();
            }
            SirenPhase::Release => {
                let reusable = self.voice.as_ref().is_some_and(|voice| voice.running);
                if !reusable {
                    self.allocate_voice();
                }
                self.start_attack();
            }
        }
    }

    fn trigger_off(&mut self) {
        if !self.phase.is_gate_open() {
            return;
        }
        self.phase = SirenPhase::Release;
        self.release_elapsed = 0;
        self.envelope_step = self.envelope / (RELEASE_SECS * self.sample_rate);
    }

    fn allocate_voice(&mut self) {
        self.voice = Some(SirenVoice::new(&self.params, self.sample_rate));
        self.allocations += 1;
    }

    /// Ramp from wherever the envelope is to 1 over the attack time
    fn start_attack(&mut self) {
        self.phase = SirenPhase::Attack;
        self.envelope_step = (1.0 - self.envelope) / (ATTACK_SECS * self.sample_rate);
    }

    /// Render one block of the siren output (post level)
    pub fn process(&mut self, output: &mut [f32]) {
        for out in output.iter_mut() {
            let level = self.level.tick();
            let Some(voice) = self.voice.as_mut() else {
                *out = 0.0;
                continue;
            };
            let tone = voice.next_sample();
            self.advance_envelope();
            *out = tone * self.envelope * level;
        }
    }

    #[inline]
    fn advance_envelope(&mut self) {
        match self.phase {
            SirenPhase::Idle | SirenPhase::Sustained => {}
            SirenPhase::Attack => {
                self.envelope += self.envelope_step;
                if self.envelope >= 1.0 {
                    self.envelope = 1.0;
                    self.phase = SirenPhase::Sustained;
                }
            }
            SirenPhase::Release => {
                self.envelope = (self.envelope - self.envelope_step).max(0.0);
                self.release_elapsed += 1;
                if self.release_elapsed >= self.teardown_after {
                    self.voice = None;
                    self.envelope = 0.0;
                    self.phase = SirenPhase::Idle;
                } else if self.release_elapsed >= self.stop_after {
                    if let Some(voice) = self.voice.as_mut() {
                        voice.running = false;
                    }
                }
            }
        }
    }
}

impl fmt::Debug for SirenUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SirenUnit")
            .field("phase", &self.phase)
            .field("params", &self.params)
            .field("envelope", &self.envelope)
            .field("allocations", &self.allocations)
            .finish()
    }
}

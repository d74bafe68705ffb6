//! Transport state and controls

use serde::{Deserialize, Serialize};

/// Transport playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Transport controls and position over the loaded source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transport {
    pub state: TransportState,
    /// Current position in samples
    pub position_samples: u64,
    /// Sample rate for time conversion
    pub sample_rate: u32,
    /// Source length in samples, 0 when nothing is loaded
    pub length_samples: u64,
    /// Wrap to the start at the end of the source
    pub loop_enabled: bool,
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            state: TransportState::Stopped,
            position_samples: 0,
            sample_rate: 44100,
            length_samples: 0,
            loop_enabled: true,
        }
    }
}

impl Transport {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Default::default()
        }
    }

    pub fn play(&mut self) {
        self.state = TransportState::Playing;
    }

    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.position_samples = 0;
    }

    pub fn pause(&mut self) {
        self.state = TransportState::Paused;
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    /// Point the transport at a new source: stopped, at the start
    pub fn reset_for_source(&mut self, length_samples: u64) {
        self.length_samples = length_samples;
        self.stop();
    }

    /// Position in seconds
    pub fn position_secs(&self) -> f64 {
        self.position_samples as f64 / self.sample_rate as f64
    }

    /// Set position from seconds
    pub fn set_position_secs(&mut self, secs: f64) {
        self.position_samples = (secs.max(0.0) * self.sample_rate as f64) as u64;
    }

    /// Advance position by given samples, wrapping or stopping at the end
    pub fn advance(&mut self, samples: u64) {
        self.position_samples += samples;

        if self.length_samples == 0 || self.position_samples < self.length_samples {
            return;
        }
        if self.loop_enabled {
            self.position_samples %= self.length_samples;
        } else {
            self.stop();
        }
    }

    /// Format position as MM:SS.ss
    pub fn format_time(&self) -> String {
        format_secs(self.position_secs())
    }
}

/// Format seconds as MM:SS.ss
pub fn format_secs(secs: f64) -> String {
    let mins = (secs / 60.0) as u32;
    let secs_rem = secs % 60.0;
    format!("{:02}:{:05.2}", mins, secs_rem)
}

//! Crossover frequency bands

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DubmixError;

/// Crossover edge between SUB and BASS
pub const SUB_BASS_EDGE_HZ: f32 = 90.0;
/// Crossover edge between BASS and MID
pub const BASS_MID_EDGE_HZ: f32 = 250.0;
/// Crossover edge between MID and HIGH
pub const MID_HIGH_EDGE_HZ: f32 = 3500.0;
/// Crossover edge between HIGH and TWEET
pub const HIGH_TWEET_EDGE_HZ: f32 = 7000.0;

/// All crossover edges, lowest first
pub const CROSSOVER_EDGES_HZ: [f32; 4] = [
    SUB_BASS_EDGE_HZ,
    BASS_MID_EDGE_HZ,
    MID_HIGH_EDGE_HZ,
    HIGH_TWEET_EDGE_HZ,
];

/// One of the five preamp bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyBand {
    Sub,
    Bass,
    Mid,
    High,
    Tweet,
}

impl FrequencyBand {
    pub const COUNT: usize = 5;

    pub const ALL: [FrequencyBand; Self::COUNT] = [
        Self::Sub,
        Self::Bass,
        Self::Mid,
        Self::High,
        Self::Tweet,
    ];

    /// Position in `ALL`, used to index per-band arrays
    pub fn index(self) -> usize {
        match self {
            Self::Sub => 0,
            Self::Bass => 1,
            Self::Mid => 2,
            Self::High => 3,
            Self::Tweet => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Sub => "SUB",
            Self::Bass => "BASS",
            Self::Mid => "MID",
            Self::High => "HIGH",
            Self::Tweet => "TWEET",
        }
    }

    /// Highpass edge below the band, if any
    pub fn lower_edge_hz(self) -> Option<f32> {
        match self {
            Self::Sub => None,
            Self::Bass => Some(SUB_BASS_EDGE_HZ),
            Self::Mid => Some(BASS_MID_EDGE_HZ),
            Self::High => Some(MID_HIGH_EDGE_HZ),
            Self::Tweet => Some(HIGH_TWEET_EDGE_HZ),
        }
    }

    /// Lowpass edge above the band, if any
    pub fn upper_edge_hz(self) -> Option<f32> {
        match self {
            Self::Sub => Some(SUB_BASS_EDGE_HZ),
            Self::Bass => Some(BASS_MID_EDGE_HZ),
            Self::Mid => Some(MID_HIGH_EDGE_HZ),
            Self::High => Some(HIGH_TWEET_EDGE_HZ),
            Self::Tweet => None,
        }
    }

    /// Crossover edges this band does not cut at
    pub fn foreign_edges_hz(self) -> impl Iterator<Item = f32> {
        let lower = self.lower_edge_hz();
        let upper = self.upper_edge_hz();
        CROSSOVER_EDGES_HZ
            .into_iter()
            .filter(move |edge| Some(*edge) != lower && Some(*edge) != upper)
    }
}

impl fmt::Display for FrequencyBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FrequencyBand {
    type Err = DubmixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sub" | "1" => Ok(Self::Sub),
            "bass" | "2" => Ok(Self::Bass),
            "mid" | "3" => Ok(Self::Mid),
            "high" | "4" => Ok(Self::High),
            "tweet" | "top" | "5" => Ok(Self::Tweet),
            _ => Err(DubmixError::UnknownBand(s.to_string())),
        }
    }
}

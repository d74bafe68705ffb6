//! Decoded source media
//!
//! Sources are decoded on the control thread, mixed down to mono and
//! resampled to the session rate, so the renderer only ever copies samples.

use std::path::Path;

use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to decode WAV: {0}")]
    Wav(#[from] hound::Error),

    #[error("Resample error: {0}")]
    Resample(String),

    #[error("Source contains no samples")]
    Empty,
}

/// Mono track at the session sample rate
#[derive(Debug, Clone)]
pub struct SourceTrack {
    pub name: String,
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl SourceTrack {
    pub fn from_samples(name: impl Into<String>, samples: Vec<f32>, sample_rate: u32) -> Result<Self, SourceError> {
        if samples.is_empty() {
            return Err(SourceError::Empty);
        }
        Ok(Self {
            name: name.into(),
            samples,
            sample_rate,
        })
    }

    /// Decode a WAV file and convert it to mono at `target_rate`
    pub fn from_wav(path: &Path, target_rate: u32) -> Result<Self, SourceError> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let channels = spec.channels as usize;

        let raw: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<Vec<f32>, _>>()?,
            hound::SampleFormat::Int => {
                let max_val = (1_i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|s| s as f32 / max_val))
                    .collect::<Result<Vec<f32>, _>>()?
            }
        };
        if raw.is_empty() {
            return Err(SourceError::Empty);
        }

        let mono = to_mono(&raw, channels);
        debug!(
            channels,
            source_rate = spec.sample_rate,
            target_rate,
            frames = mono.len(),
            "Decoded WAV"
        );
        let samples = resample_if_needed(&mono, spec.sample_rate, target_rate)?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        info!(name = %name, secs = samples.len() as f64 / target_rate as f64, "Source loaded");

        Self::from_samples(name, samples, target_rate)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Convert interleaved samples to mono by averaging channels
pub fn to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

fn resample_if_needed(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, SourceError> {
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        to_rate as f64 / from_rate as f64,
        2.0,
        params,
        samples.len(),
        1,
    )
    .map_err(|e| SourceError::Resample(e.to_string()))?;

    let input = vec![samples.to_vec()];
    let output = resampler
        .process(&input, None)
        .map_err(|e| SourceError::Resample(e.to_string()))?;

    Ok(output.into_iter().flatten().collect())
}

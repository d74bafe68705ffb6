//! Real-time audio output on the default device

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{StreamConfig, SupportedStreamConfig};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum AudioOutputError {
    #[error("No audio output devices found")]
    NoDevices,
    #[error("Failed to get default output config: {0}")]
    ConfigError(String),
    #[error("Failed to build output stream: {0}")]
    StreamError(String),
}

/// Default output device together with the config it will be opened with
pub struct OutputDevice {
    device: cpal::Device,
    config: SupportedStreamConfig,
    pub name: String,
}

impl OutputDevice {
    pub fn open_default() -> Result<Self, AudioOutputError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioOutputError::NoDevices)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioOutputError::ConfigError(e.to_string()))?;

        let name = device.name().unwrap_or_default();
        Ok(Self { device, config, name })
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate().0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels()
    }
}

/// Real-time output stream driving a render callback
pub struct RealtimeOutputStream {
    stop_flag: Arc<AtomicBool>,
    _stream: cpal::Stream,
}

impl RealtimeOutputStream {
    /// Start a real-time output stream that pulls interleaved frames from
    /// `render(buffer, channels)`
    pub fn start<F>(output: OutputDevice, mut render: F) -> Result<Self, AudioOutputError>
    where
        F: FnMut(&mut [f32], usize) + Send + 'static,
    {
        let sample_rate = output.sample_rate();
        let channels = output.channels();

        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_clone = stop_flag.clone();

        let config: StreamConfig = output.config.into();

        let stream = output
            .device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if stop_clone.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }
                    render(data, channels as usize);
                },
                move |err| error!("Output stream error: {}", err),
                None,
            )
            .map_err(|e| AudioOutputError::StreamError(e.to_string()))?;

        stream.play().map_err(|e| AudioOutputError::StreamError(e.to_string()))?;

        info!(device = %output.name, sample_rate, channels, "Started realtime output stream");

        Ok(Self { stop_flag, _stream: stream })
    }

    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}

impl Drop for RealtimeOutputStream {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}

//! Five-way crossover with per-band gain and metering
//!
//! Each band cuts with Linkwitz-Riley slopes (two Butterworth SVF sections
//! per edge). A band also runs a second-order allpass at every edge it does
//! not cut, so all five bands carry the same phase rotation and their sum is
//! flat in magnitude.

use std::fmt;
use std::sync::Arc;

use fundsp::hacker::{allpass_hz, highpass_hz, lowpass_hz, AudioUnit, Complex64};

use dubmix_core::params::BAND_GAIN;
use dubmix_core::smoothing::BAND_GAIN_TIME_CONSTANT_SECS;
use dubmix_core::{FrequencyBand, SmoothedParam};

use crate::dsp::{limit_cutoff, BUTTERWORTH_Q};
use crate::meter::{MeterState, MeterTap};

struct BandChain {
    stages: Vec<Box<dyn AudioUnit>>,
    gain: SmoothedParam,
    tap: MeterTap,
}

impl BandChain {
    fn new(band: FrequencyBand, sample_rate: f32) -> Self {
        let edge_hz = |edge: f32| limit_cutoff(edge, sample_rate);
        let mut stages: Vec<Box<dyn AudioUnit>> = Vec::with_capacity(6);
        if let Some(edge) = band.lower_edge_hz() {
            stages.push(Box::new(highpass_hz(edge_hz(edge), BUTTERWORTH_Q)));
            stages.push(Box::new(highpass_hz(edge_hz(edge), BUTTERWORTH_Q)));
        }
        if let Some(edge) = band.upper_edge_hz() {
            stages.push(Box::new(lowpass_hz(edge_hz(edge), BUTTERWORTH_Q)));
            stages.push(Box::new(lowpass_hz(edge_hz(edge), BUTTERWORTH_Q)));
        }
        for edge in band.foreign_edges_hz() {
            stages.push(Box::new(allpass_hz(edge_hz(edge), BUTTERWORTH_Q)));
        }
        for stage in &mut stages {
            stage.set_sample_rate(sample_rate as f64);
        }
        Self {
            stages,
            gain: SmoothedParam::new(BAND_GAIN.default, BAND_GAIN_TIME_CONSTANT_SECS, sample_rate),
            tap: MeterTap::default(),
        }
    }

    #[inline]
    fn filter(&mut self, sample: f32) -> f32 {
        self.stages
            .iter_mut()
            .fold(sample, |x, stage| stage.filter_mono(x))
    }

    fn response(&mut self, freq: f64) -> Option<Complex64> {
        self.stages
            .iter_mut()
            .try_fold(Complex64::new(1.0, 0.0), |acc, stage| {
                stage.response(0, freq).map(|r| acc * r)
            })
    }
}

pub struct Crossover {
    bands: [BandChain; FrequencyBand::COUNT],
}

impl Crossover {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            bands: FrequencyBand::ALL.map(|band| BandChain::new(band, sample_rate)),
        }
    }

    pub fn set_gain_target(&mut self, band: FrequencyBand, gain: f32) {
        self.bands[band.index()].gain.set_target(BAND_GAIN.clamp(gain));
    }

    pub fn gain_target(&self, band: FrequencyBand) -> f32 {
        self.bands[band.index()].gain.target()
    }

    /// Gain the band is applying right now (mid-ramp value)
    pub fn current_gain(&self, band: FrequencyBand) -> f32 {
        self.bands[band.index()].gain.current()
    }

    /// Split `input`, weight each band and write the band sum to `output`
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        for (&x, out) in input.iter().zip(output.iter_mut()) {
            let mut sum = 0.0;
            for chain in &mut self.bands {
                let y = chain.filter(x) * chain.gain.tick();
                chain.tap.observe(&[y]);
                sum += y;
            }
            *out = sum;
        }
    }

    pub fn publish_meters(&mut self, meters: &[Arc<MeterState>; FrequencyBand::COUNT]) {
        for (chain, meter) in self.bands.iter_mut().zip(meters.iter()) {
            chain.tap.publish(meter);
        }
    }

    /// Filter response of one band, gain excluded
    pub fn band_response(&mut self, band: FrequencyBand, freq: f64) -> Option<Complex64> {
        self.bands[band.index()].response(freq)
    }

    /// Sum of all band filter responses at unity gain
    pub fn summed_response(&mut self, freq: f64) -> Option<Complex64> {
        self.bands
            .iter_mut()
            .try_fold(Complex64::new(0.0, 0.0), |acc, chain| {
                chain.response(freq).map(|r| acc + r)
            })
    }
}

impl fmt::Debug for Crossover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let gains: Vec<f32> = self.bands.iter().map(|chain| chain.gain.target()).collect();
        f.debug_struct("Crossover").field("gains", &gains).finish()
    }
}

#[cfg(test)]
mod tests {
    use fundsp::math::amp_db;

    use super::*;

    const SR: f32 = 48_000.0;

    fn db(response: Option<Complex64>) -> f64 {
        response.map_or(f64::NEG_INFINITY, |r| amp_db(r.norm()))
    }

    #[test]
    fn test_bands_sum_flat() {
        let mut xo = Crossover::new(SR);
        let steps = 200;
        for i in 0..=steps {
            let freq = 20.0 * (18_000.0f64 / 20.0).powf(i as f64 / steps as f64);
            let level = db(xo.summed_response(freq));
            assert!(level.abs() < 0.5, "{freq:.1} Hz sums to {level:.3} dB");
        }
    }

    #[test]
    fn test_band_isolation() {
        let mut xo = Crossover::new(SR);
        // each band passes its own center and rejects far-away content
        let sub = db(xo.band_response(FrequencyBand::Sub, 40.0));
        let sub_far = db(xo.band_response(FrequencyBand::Sub, 2000.0));
        assert!(sub > -1.0);
        assert!(sub_far < -60.0);

        let mid = db(xo.band_response(FrequencyBand::Mid, 1000.0));
        assert!(mid > -1.0);
        assert!(db(xo.band_response(FrequencyBand::Mid, 30.0)) < -40.0);

        let tweet = db(xo.band_response(FrequencyBand::Tweet, 15_000.0));
        assert!(tweet > -1.0);
    }

    #[test]
    fn test_gain_ramps_toward_target() {
        let mut xo = Crossover::new(SR);
        assert_eq!(xo.current_gain(FrequencyBand::Bass), 0.5);
        xo.set_gain_target(FrequencyBand::Bass, 1.0);
        let input = vec![0.0f32; 256];
        let mut output = vec![0.0f32; 256];
        xo.process(&input, &mut output);
        let after_block = xo.current_gain(FrequencyBand::Bass);
        assert!(after_block > 0.5 && after_block < 0.6, "gain={after_block}");
        for _ in 0..1000 {
            xo.process(&input, &mut output);
        }
        assert_eq!(xo.current_gain(FrequencyBand::Bass), 1.0);
    }

    #[test]
    fn test_gain_target_clamped() {
        let mut xo = Crossover::new(SR);
        xo.set_gain_target(FrequencyBand::Sub, 3.0);
        assert_eq!(xo.gain_target(FrequencyBand::Sub), 1.0);
        xo.set_gain_target(FrequencyBand::Sub, -1.0);
        assert_eq!(xo.gain_target(FrequencyBand::Sub), 0.0);
    }

    #[test]
    fn test_unity_gains_reconstruct_tone() {
        let mut xo = Crossover::new(SR);
        for band in FrequencyBand::ALL {
            xo.set_gain_target(band, 1.0);
        }
        let mut peak = 0.0f32;
        let mut n = 0usize;
        let mut input = vec![0.0f32; 480];
        let mut output = vec![0.0f32; 480];
        for block in 0..200 {
            for sample in input.iter_mut() {
                *sample = (std::f32::consts::TAU * 1000.0 * n as f32 / SR).sin();
                n += 1;
            }
            xo.process(&input, &mut output);
            if block > 150 {
                peak = output.iter().fold(peak, |p, s| p.max(s.abs()));
            }
        }
        assert!((peak - 1.0).abs() < 0.05, "peak={peak}");
    }

    #[test]
    fn test_meters_follow_band_gain() {
        let mut xo = Crossover::new(SR);
        xo.set_gain_target(FrequencyBand::Mid, 0.0);
        let meters: [Arc<MeterState>; FrequencyBand::COUNT] =
            std::array::from_fn(|_| Arc::new(MeterState::new()));
        let mut n = 0usize;
        let mut input = vec![0.0f32; 480];
        let mut output = vec![0.0f32; 480];
        for _ in 0..200 {
            for sample in input.iter_mut() {
                *sample = (std::f32::consts::TAU * 1000.0 * n as f32 / SR).sin();
                n += 1;
            }
            xo.process(&input, &mut output);
            xo.publish_meters(&meters);
        }
        assert!(meters[FrequencyBand::Mid.index()].rms() < 1e-3);
        assert!(meters[FrequencyBand::Sub.index()].rms() < 1e-2);
    }

    #[test]
    fn test_edges_above_nyquist_stay_stable() {
        // the 7 kHz edge sits above Nyquist here
        let sr = 11_025.0;
        let mut xo = Crossover::new(sr);
        let input: Vec<f32> = (0..sr as usize)
            .map(|n| (std::f32::consts::TAU * 440.0 * n as f32 / sr).sin())
            .collect();
        let mut output = vec![0.0f32; input.len()];
        xo.process(&input, &mut output);
        assert!(output.iter().all(|s| s.is_finite() && s.abs() < 2.0));
    }
}

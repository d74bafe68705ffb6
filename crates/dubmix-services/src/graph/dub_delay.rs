//! Tape-style feedback delay with tone filters inside the loop
//!
//! ```text
//! music ─[music send]─┐
//!                     ├─► delay line ─┬─[return]─► out
//! siren ─[siren send]─┘      ▲        │
//!                            └─ lp ◄─ hp ◄─[feedback]
//! ```
//!
//! Every repeat passes the highpass and lowpass once more, so echoes thin
//! out and darken as they decay.

use std::fmt;

use fundsp::hacker::{highpass_hz, lowpass_hz, An, FixedSvf, Frame, HighpassMode, LowpassMode, Setting};

use dubmix_core::params::{DELAY_FILTER_Q, DELAY_MAX_TIME_SECS};
use dubmix_core::smoothing::DELAY_TIME_CONSTANT_SECS;
use dubmix_core::{DelayParams, SmoothedParam};

use crate::dsp::{limit_cutoff, DelayLine};

/// Cutoff moves smaller than this do not recompute filter coefficients
const CUTOFF_EPSILON_HZ: f32 = 0.01;

pub struct DubDelay {
    line: DelayLine,
    sample_rate: f32,

    time_secs: SmoothedParam,
    feedback: SmoothedParam,
    return_level: SmoothedParam,
    music_send: SmoothedParam,
    siren_send: SmoothedParam,
    highpass_hz: SmoothedParam,
    lowpass_hz: SmoothedParam,

    highpass: An<FixedSvf<f64, HighpassMode<f64>>>,
    lowpass: An<FixedSvf<f64, LowpassMode<f64>>>,
    applied_highpass_hz: f32,
    applied_lowpass_hz: f32,
}

impl DubDelay {
    pub fn new(params: DelayParams, sample_rate: f32) -> Self {
        let params = params.clamped();
        let smoothed = |value: f32| SmoothedParam::new(value, DELAY_TIME_CONSTANT_SECS, sample_rate);

        let highpass_cutoff = limit_cutoff(params.highpass_hz, sample_rate);
        let lowpass_cutoff = limit_cutoff(params.lowpass_hz, sample_rate);
        let mut highpass = highpass_hz(highpass_cutoff, DELAY_FILTER_Q);
        highpass.set_sample_rate(sample_rate as f64);
        let mut lowpass = lowpass_hz(lowpass_cutoff, DELAY_FILTER_Q);
        lowpass.set_sample_rate(sample_rate as f64);

        Self {
            line: DelayLine::new(DELAY_MAX_TIME_SECS, sample_rate),
            sample_rate,
            time_secs: smoothed(params.time_secs),
            feedback: smoothed(params.feedback),
            return_level: smoothed(params.return_level),
            music_send: smoothed(params.music_send),
            siren_send: smoothed(params.siren_send),
            highpass_hz: smoothed(params.highpass_hz),
            lowpass_hz: smoothed(params.lowpass_hz),
            highpass,
            lowpass,
            applied_highpass_hz: highpass_cutoff,
            applied_lowpass_hz: lowpass_cutoff,
        }
    }

    /// Retarget all seven controls; values are clamped first
    pub fn set_targets(&mut self, params: &DelayParams) {
        let params = params.clamped();
        self.time_secs.set_target(params.time_secs);
        self.feedback.set_target(params.feedback);
        self.return_level.set_target(params.return_level);
        self.music_send.set_target(params.music_send);
        self.siren_send.set_target(params.siren_send);
        self.highpass_hz.set_target(params.highpass_hz);
        self.lowpass_hz.set_target(params.lowpass_hz);
    }

    pub fn targets(&self) -> DelayParams {
        DelayParams {
            time_secs: self.time_secs.target(),
            feedback: self.feedback.target(),
            return_level: self.return_level.target(),
            music_send: self.music_send.target(),
            siren_send: self.siren_send.target(),
            highpass_hz: self.highpass_hz.target(),
            lowpass_hz: self.lowpass_hz.target(),
        }
    }

    /// Feed one block of the music and siren buses, write the return signal
    /// to `output`
    pub fn process(&mut self, music: &[f32], siren: &[f32], output: &mut [f32]) {
        for ((&m, &s), out) in music.iter().zip(siren.iter()).zip(output.iter_mut()) {
            *out = self.process_sample(m, s);
        }
    }

    #[inline]
    fn process_sample(&mut self, music: f32, siren: f32) -> f32 {
        let delay_samples = self.time_secs.tick() * self.sample_rate;
        let feedback = self.feedback.tick();
        let return_level = self.return_level.tick();
        let music_send = self.music_send.tick();
        let siren_send = self.siren_send.tick();
        self.update_filters();

        let delayed = self.line.read(delay_samples);
        let fed_back = delayed * feedback;
        let fed_back = self.highpass.tick(&Frame::from([fed_back]))[0];
        let fed_back = self.lowpass.tick(&Frame::from([fed_back]))[0];

        self.line.write(music * music_send + siren * siren_send + fed_back);
        delayed * return_level
    }

    fn update_filters(&mut self) {
        let hp = limit_cutoff(self.highpass_hz.tick(), self.sample_rate);
        if (hp - self.applied_highpass_hz).abs() > CUTOFF_EPSILON_HZ {
            self.highpass.set(Setting::center(hp));
            self.applied_highpass_hz = hp;
        }
        let lp = limit_cutoff(self.lowpass_hz.tick(), self.sample_rate);
        if (lp - self.applied_lowpass_hz).abs() > CUTOFF_EPSILON_HZ {
            self.lowpass.set(Setting::center(lp));
            self.applied_lowpass_hz = lp;
        }
    }
}

impl fmt::Debug for DubDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DubDelay")
            .field("targets", &self.targets())
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    fn wide_open() -> DelayParams {
        DelayParams {
            time_secs: 0.3,
            feedback: 0.4,
            return_level: 1.0,
            music_send: 1.0,
            siren_send: 0.0,
            highpass_hz: 20.0,
            lowpass_hz: 15_000.0,
        }
    }

    /// Hann-windowed 1 kHz burst, 40 ms long
    fn burst(len: usize) -> Vec<f32> {
        let burst_len = (0.04 * SR) as usize;
        (0..len)
            .map(|n| {
                if n >= burst_len {
                    return 0.0;
                }
                let t = n as f32 / SR;
                let window = 0.5 - 0.5 * (std::f32::consts::TAU * n as f32 / burst_len as f32).cos();
                window * (std::f32::consts::TAU * 1000.0 * t).sin()
            })
            .collect()
    }

    fn window_peak(signal: &[f32], start_secs: f32, end_secs: f32) -> f32 {
        let start = (start_secs * SR) as usize;
        let end = ((end_secs * SR) as usize).min(signal.len());
        signal[start..end].iter().fold(0.0, |p, s| p.max(s.abs()))
    }

    fn run(delay: &mut DubDelay, music: &[f32]) -> Vec<f32> {
        let silence = vec![0.0; music.len()];
        let mut out = vec![0.0; music.len()];
        delay.process(music, &silence, &mut out);
        out
    }

    #[test]
    fn test_repeats_decay_by_feedback() {
        let mut delay = DubDelay::new(wide_open(), SR);
        let input = burst((1.2 * SR) as usize);
        let out = run(&mut delay, &input);

        let echo1 = window_peak(&out, 0.29, 0.38);
        let echo2 = window_peak(&out, 0.59, 0.68);
        let echo3 = window_peak(&out, 0.89, 0.98);
        assert!(echo1 > 0.9, "echo1={echo1}");
        assert!((echo2 / echo1 - 0.4).abs() < 0.03, "ratio={}", echo2 / echo1);
        assert!((echo3 / echo2 - 0.4).abs() < 0.03, "ratio={}", echo3 / echo2);
        // nothing between the repeats
        assert!(window_peak(&out, 0.05, 0.28) < 1e-6);
    }

    #[test]
    fn test_closed_send_adds_no_energy() {
        let params = DelayParams { music_send: 0.0, ..wide_open() };
        let mut delay = DubDelay::new(params, SR);
        let out = run(&mut delay, &burst((1.0 * SR) as usize));
        assert!(out.iter().all(|s| s.abs() < 1e-9));
    }

    #[test]
    fn test_return_level_scales_output() {
        let params = DelayParams { return_level: 0.5, ..wide_open() };
        let mut delay = DubDelay::new(params, SR);
        let out = run(&mut delay, &burst((0.5 * SR) as usize));
        let echo1 = window_peak(&out, 0.29, 0.38);
        assert!((echo1 - 0.5).abs() < 0.03, "echo1={echo1}");
    }

    #[test]
    fn test_siren_send_feeds_line() {
        let params = DelayParams { music_send: 0.0, siren_send: 1.0, ..wide_open() };
        let mut delay = DubDelay::new(params, SR);
        let siren = burst((0.5 * SR) as usize);
        let music = vec![0.0; siren.len()];
        let mut out = vec![0.0; siren.len()];
        delay.process(&music, &siren, &mut out);
        assert!(window_peak(&out, 0.29, 0.38) > 0.9);
    }

    #[test]
    fn test_targets_clamped() {
        let mut delay = DubDelay::new(DelayParams::default(), SR);
        delay.set_targets(&DelayParams { feedback: 1.5, time_secs: 9.0, ..Default::default() });
        let targets = delay.targets();
        assert!(targets.feedback < 1.0);
        assert_eq!(targets.time_secs, 1.5);
    }

    #[test]
    fn test_max_feedback_stays_bounded() {
        let params = DelayParams {
            time_secs: 0.05,
            feedback: 0.99,
            ..wide_open()
        };
        let mut delay = DubDelay::new(params, SR);
        let out = run(&mut delay, &burst((5.0 * SR) as usize));
        assert!(out.iter().all(|s| s.is_finite() && s.abs() < 2.0));
    }

    #[test]
    fn test_lowpass_above_nyquist_stays_bounded() {
        // 15 kHz lowpass is past Nyquist at 22.05 kHz
        let sr = 22_050.0;
        let params = DelayParams {
            time_secs: 0.1,
            feedback: 0.9,
            music_send: 0.0,
            siren_send: 1.0,
            lowpass_hz: 15_000.0,
            ..wide_open()
        };
        let mut delay = DubDelay::new(params, sr);
        let siren: Vec<f32> = (0..(2.0 * sr) as usize)
            .map(|n| 0.5 * (std::f32::consts::TAU * 880.0 * n as f32 / sr).sin())
            .collect();
        let music = vec![0.0; siren.len()];
        let mut out = vec![0.0; siren.len()];
        delay.process(&music, &siren, &mut out);
        assert!(out.iter().all(|s| s.is_finite() && s.abs() < 10.0));

        // retargeting between in-range values keeps the loop stable too
        delay.set_targets(&DelayParams { lowpass_hz: 12_000.0, ..params });
        delay.process(&music, &siren, &mut out);
        assert!(out.iter().all(|s| s.is_finite() && s.abs() < 10.0));
    }
}

//! Ten-band graphic equalizer

use std::fmt;

use fundsp::hacker::{bell_hz, AudioNode, An, BellMode, Complex64, FixedSvf, Setting};
use fundsp::math::db_amp;

use dubmix_core::params::{EQ_CENTER_FREQUENCIES_HZ, EQ_GAIN_DB, EQ_Q};
use dubmix_core::smoothing::EQ_TIME_CONSTANT_SECS;
use dubmix_core::SmoothedParam;

use crate::dsp::limit_cutoff;

#[derive(Clone)]
struct EqStage {
    center_hz: f32,
    filter: An<FixedSvf<f64, BellMode<f64>>>,
    gain_db: SmoothedParam,
}

impl EqStage {
    fn new(center_hz: f32, sample_rate: f32) -> Self {
        let center_hz = limit_cutoff(center_hz, sample_rate);
        let mut filter = bell_hz(center_hz, EQ_Q, db_amp(EQ_GAIN_DB.default));
        filter.set_sample_rate(sample_rate as f64);
        Self {
            center_hz,
            filter,
            gain_db: SmoothedParam::new(EQ_GAIN_DB.default, EQ_TIME_CONSTANT_SECS, sample_rate),
        }
    }

    fn apply_gain_db(&mut self, gain_db: f32) {
        self.filter
            .set(Setting::center_q_gain(self.center_hz, EQ_Q, db_amp(gain_db)));
    }
}

/// Bell filters in series, lowest center first
#[derive(Clone)]
pub struct GraphicEq {
    stages: Vec<EqStage>,
}

impl GraphicEq {
    pub fn new(sample_rate: f32) -> Self {
        let stages = EQ_CENTER_FREQUENCIES_HZ
            .iter()
            .map(|&center| EqStage::new(center, sample_rate))
            .collect();
        Self { stages }
    }

    /// Retarget one stage. Indices outside the bank are ignored.
    pub fn set_target_db(&mut self, index: usize, gain_db: f32) {
        if let Some(stage) = self.stages.get_mut(index) {
            stage.gain_db.set_target(EQ_GAIN_DB.clamp(gain_db));
        }
    }

    /// Gain a stage is currently applying
    pub fn current_db(&self, index: usize) -> Option<f32> {
        self.stages.get(index).map(|stage| stage.gain_db.current())
    }

    pub fn process(&mut self, samples: &mut [f32]) {
        for stage in &mut self.stages {
            if stage.gain_db.is_settled() {
                for sample in samples.iter_mut() {
                    *sample = stage.filter.filter_mono(*sample);
                }
                continue;
            }
            for sample in samples.iter_mut() {
                let gain = stage.gain_db.tick();
                stage.apply_gain_db(gain);
                *sample = stage.filter.filter_mono(*sample);
            }
        }
    }

    /// Combined response of the chain at its current gains
    pub fn response(&mut self, freq: f64) -> Option<Complex64> {
        self.stages
            .iter_mut()
            .try_fold(Complex64::new(1.0, 0.0), |acc, stage| {
                stage.filter.response(0, freq).map(|r| acc * r)
            })
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl fmt::Debug for GraphicEq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let gains: Vec<f32> = self.stages.iter().map(|stage| stage.gain_db.target()).collect();
        f.debug_struct("GraphicEq").field("gains_db", &gains).finish()
    }
}

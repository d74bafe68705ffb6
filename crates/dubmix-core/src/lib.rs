//! dubmix-core: Domain types for the dubmix live console

pub mod band;
mod error;
pub mod mixer;
pub mod params;
pub mod smoothing;
mod transport;

pub use band::{FrequencyBand, CROSSOVER_EDGES_HZ};
pub use error::{DubmixError, Result};
pub use mixer::{BandState, EqState, PreampState};
pub use params::{
    control_from_lfo_rate, lfo_rate_from_control, DelayModel, DelayParams, ParamRange,
    SirenMode, SirenModel, SirenParams, Waveform,
};
pub use smoothing::SmoothedParam;
pub use transport::{format_secs, Transport, TransportState};

//! dubmix-services: Audio engine, signal graph and device I/O

pub mod audio_io;
pub mod control;
pub mod dsp;
pub mod engine;
pub mod graph;
pub mod meter;
pub mod source;

pub use audio_io::{AudioOutputError, OutputDevice, RealtimeOutputStream};
pub use control::{ControlSurface, ControlValue};
pub use engine::{AudioSession, EngineError, MixEngine, TransportError};
pub use graph::{GraphCommand, GraphMeters, GraphStatus, SignalGraph, SirenPhase, MAX_BLOCK};
pub use meter::MeterState;
pub use source::{SourceError, SourceTrack};

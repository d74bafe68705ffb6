//! The signal graph and its renderer
//!
//! ```text
//! source ─► eq ─► crossover ─┬──────────────────────────► master ─► out
//!                            └─[music send]─► delay ─[return]─┘   ▲
//! siren ─────────────────────┬─[siren send]──┘                    │
//!                            └────────────────────────────────────┘
//! ```
//!
//! The graph is built once per session. Its topology never changes; the
//! control thread only moves parameter targets (through the
//! [`ControlSurface`]) and sends discrete [`GraphCommand`]s. Scratch
//! buffers are sized at construction, so rendering does not allocate.

mod crossover;
mod dub_delay;
mod eq;
mod siren;
mod source_player;

pub use crossover::Crossover;
pub use dub_delay::DubDelay;
pub use eq::GraphicEq;
pub use siren::{SirenPhase, SirenUnit, VoiceInfo};
pub use source_player::SourcePlayer;

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use dubmix_core::params::EQ_BAND_COUNT;
use dubmix_core::FrequencyBand;
use tracing::trace;

use crate::control::ControlSurface;
use crate::meter::{MeterState, MeterTap};
use crate::source::SourceTrack;

/// Largest number of frames processed in one pass
pub const MAX_BLOCK: usize = 512;

/// Discrete commands applied at the start of the next block
#[derive(Debug)]
pub enum GraphCommand {
    SirenGate(bool),
    LoadSource(Arc<SourceTrack>),
    Play,
    Pause,
    Stop,
}

/// Renderer state readable from the control side
#[derive(Debug, Default)]
pub struct GraphStatus {
    playing: AtomicBool,
    position_samples: AtomicU64,
    sample_clock: AtomicU64,
    siren_phase: AtomicU8,
}

impl GraphStatus {
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    pub fn position_samples(&self) -> u64 {
        self.position_samples.load(Ordering::Relaxed)
    }

    /// Frames rendered since the session started
    pub fn sample_clock(&self) -> u64 {
        self.sample_clock.load(Ordering::Relaxed)
    }

    pub fn siren_phase(&self) -> SirenPhase {
        SirenPhase::from_index(self.siren_phase.load(Ordering::Relaxed))
    }
}

/// Read-only metering handles: one master, one per band
#[derive(Debug, Clone)]
pub struct GraphMeters {
    pub master: Arc<MeterState>,
    pub bands: [Arc<MeterState>; FrequencyBand::COUNT],
}

impl GraphMeters {
    fn new() -> Self {
        Self {
            master: Arc::new(MeterState::new()),
            bands: std::array::from_fn(|_| Arc::new(MeterState::new())),
        }
    }

    pub fn band(&self, band: FrequencyBand) -> &Arc<MeterState> {
        &self.bands[band.index()]
    }
}

/// Control-side ends of a graph's channels and shared state
#[derive(Debug)]
pub struct GraphHandles {
    pub controls: Arc<ControlSurface>,
    pub status: Arc<GraphStatus>,
    pub meters: GraphMeters,
    pub commands: Sender<GraphCommand>,
    /// Sources the renderer no longer uses, to be dropped off the audio thread
    pub retired: Receiver<Arc<SourceTrack>>,
}

pub struct SignalGraph {
    sample_rate: u32,
    controls: Arc<ControlSurface>,
    status: Arc<GraphStatus>,
    meters: GraphMeters,
    commands: Receiver<GraphCommand>,
    retired: Sender<Arc<SourceTrack>>,

    source: SourcePlayer,
    eq: GraphicEq,
    crossover: Crossover,
    delay: DubDelay,
    siren: SirenUnit,
    master_tap: MeterTap,

    music: Vec<f32>,
    bus: Vec<f32>,
    siren_out: Vec<f32>,
    delay_out: Vec<f32>,
    master: Vec<f32>,
}

/// Commands queued between two blocks
const COMMAND_CAPACITY: usize = 64;

impl SignalGraph {
    /// Build the graph for `sample_rate` and hand back the control-side
    /// handles. Initial parameter values come from `controls`.
    pub fn build(sample_rate: u32, controls: Arc<ControlSurface>) -> (Self, GraphHandles) {
        let (command_tx, command_rx) = crossbeam_channel::bounded(COMMAND_CAPACITY);
        let (retired_tx, retired_rx) = crossbeam_channel::bounded(COMMAND_CAPACITY);
        let status = Arc::new(GraphStatus::default());
        let meters = GraphMeters::new();
        let sr = sample_rate as f32;

        let mut graph = Self {
            sample_rate,
            controls: controls.clone(),
            status: status.clone(),
            meters: meters.clone(),
            commands: command_rx,
            retired: retired_tx,
            source: SourcePlayer::new(sample_rate),
            eq: GraphicEq::new(sr),
            crossover: Crossover::new(sr),
            delay: DubDelay::new(controls.delay.load(), sr),
            siren: SirenUnit::new(controls.siren.load(), sr),
            master_tap: MeterTap::default(),
            music: vec![0.0; MAX_BLOCK],
            bus: vec![0.0; MAX_BLOCK],
            siren_out: vec![0.0; MAX_BLOCK],
            delay_out: vec![0.0; MAX_BLOCK],
            master: vec![0.0; MAX_BLOCK],
        };
        graph.sync_controls();

        let handles = GraphHandles {
            controls,
            status,
            meters,
            commands: command_tx,
            retired: retired_rx,
        };
        (graph, handles)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Render interleaved output with the mono master copied to every channel
    pub fn render(&mut self, buffer: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        for chunk in buffer.chunks_mut(MAX_BLOCK * channels) {
            let frames = chunk.len() / channels;
            self.render_block(frames);
            for (frame, &sample) in chunk.chunks_mut(channels).zip(self.master[..frames].iter()) {
                frame.fill(sample);
            }
        }
    }

    /// Render mono master output
    pub fn render_mono(&mut self, output: &mut [f32]) {
        for chunk in output.chunks_mut(MAX_BLOCK) {
            let frames = chunk.len();
            self.render_block(frames);
            chunk.copy_from_slice(&self.master[..frames]);
        }
    }

    fn render_block(&mut self, frames: usize) {
        self.sync_controls();
        self.drain_commands();

        let music = &mut self.music[..frames];
        let bus = &mut self.bus[..frames];
        let siren = &mut self.siren_out[..frames];
        let delay = &mut self.delay_out[..frames];
        let master = &mut self.master[..frames];

        self.source.render(music);
        self.eq.process(music);
        self.crossover.process(music, bus);
        self.siren.process(siren);
        self.delay.process(bus, siren, delay);

        for (i, out) in master.iter_mut().enumerate() {
            *out = bus[i] + siren[i] + delay[i];
        }

        self.master_tap.observe(master);
        self.master_tap.publish(&self.meters.master);
        self.crossover.publish_meters(&self.meters.bands);
        self.publish_status(frames);
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                GraphCommand::SirenGate(open) => {
                    self.siren.set_gate(open);
                    trace!(open, phase = %self.siren.phase(), "Siren gate");
                }
                GraphCommand::LoadSource(track) => {
                    if let Some(previous) = self.source.load(track) {
                        // a full channel means the control side is gone; drop here then
                        let _ = self.retired.try_send(previous);
                    }
                }
                GraphCommand::Play => {
                    let started = self.source.play();
                    trace!(started, "Transport play");
                }
                GraphCommand::Pause => self.source.pause(),
                GraphCommand::Stop => self.source.stop(),
            }
        }
    }

    /// Pull the latest targets from the control cells
    fn sync_controls(&mut self) {
        for band in FrequencyBand::ALL {
            self.crossover
                .set_gain_target(band, self.controls.band_gain(band).get());
        }
        for index in 0..EQ_BAND_COUNT {
            self.eq
                .set_target_db(index, self.controls.eq_gains_db[index].get());
        }
        self.delay.set_targets(&self.controls.delay.load());

        let siren = self.controls.siren.load();
        if siren != self.siren.params() {
            self.siren.set_params(&siren);
        }
    }

    fn publish_status(&self, frames: usize) {
        self.status.playing.store(self.source.is_playing(), Ordering::Relaxed);
        self.status
            .position_samples
            .store(self.source.position_samples(), Ordering::Relaxed);
        self.status
            .sample_clock
            .fetch_add(frames as u64, Ordering::Relaxed);
        self.status
            .siren_phase
            .store(self.siren.phase().index(), Ordering::Relaxed);
    }

    pub fn crossover(&self) -> &Crossover {
        &self.crossover
    }

    pub fn eq(&self) -> &GraphicEq {
        &self.eq
    }

    pub fn siren(&self) -> &SirenUnit {
        &self.siren
    }

    pub fn delay(&self) -> &DubDelay {
        &self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 48_000;

    fn tone_track(freq: f32, secs: f32) -> Arc<SourceTrack> {
        let len = (secs * SR as f32) as usize;
        let samples = (0..len)
            .map(|n| (std::f32::consts::TAU * freq * n as f32 / SR as f32).sin() * 0.5)
            .collect();
        Arc::new(SourceTrack::from_samples("tone", samples, SR).unwrap())
    }

    #[test]
    fn test_silent_when_idle() {
        let (mut graph, handles) = SignalGraph::build(SR, Arc::new(ControlSurface::new()));
        let mut out = vec![1.0f32; 2048];
        graph.render(&mut out, 2);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(handles.status.sample_clock(), 1024);
        assert!(!handles.status.is_playing());
    }

    #[test]
    fn test_render_fans_out_to_channels() {
        let (mut graph, handles) = SignalGraph::build(SR, Arc::new(ControlSurface::new()));
        handles.commands.send(GraphCommand::LoadSource(tone_track(1000.0, 1.0))).unwrap();
        handles.commands.send(GraphCommand::Play).unwrap();
        let mut out = vec![0.0f32; 1500 * 2];
        graph.render(&mut out, 2);
        for frame in out.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
        assert!(out.iter().any(|s| s.abs() > 0.01));
        assert!(handles.status.is_playing());
        assert_eq!(handles.status.position_samples(), 1500);
    }

    #[test]
    fn test_load_retires_previous_source() {
        let (mut graph, handles) = SignalGraph::build(SR, Arc::new(ControlSurface::new()));
        let first = tone_track(100.0, 0.1);
        handles.commands.send(GraphCommand::LoadSource(first.clone())).unwrap();
        graph.render_mono(&mut [0.0; 64]);
        handles.commands.send(GraphCommand::LoadSource(tone_track(200.0, 0.1))).unwrap();
        graph.render_mono(&mut [0.0; 64]);
        let retired = handles.retired.try_recv().unwrap();
        assert!(Arc::ptr_eq(&retired, &first));
    }

    #[test]
    fn test_siren_reaches_master_and_status() {
        let (mut graph, handles) = SignalGraph::build(SR, Arc::new(ControlSurface::new()));
        handles.commands.send(GraphCommand::SirenGate(true)).unwrap();
        let mut out = vec![0.0f32; 4800];
        graph.render_mono(&mut out);
        assert_eq!(handles.status.siren_phase(), SirenPhase::Sustained);
        assert!(handles.meters.master.peak() > 0.05);
        assert_eq!(graph.siren().allocations(), 1);
    }

    #[test]
    fn test_band_meters_published() {
        let (mut graph, handles) = SignalGraph::build(SR, Arc::new(ControlSurface::new()));
        handles.commands.send(GraphCommand::LoadSource(tone_track(40.0, 1.0))).unwrap();
        handles.commands.send(GraphCommand::Play).unwrap();
        let mut out = vec![0.0f32; 24_000];
        graph.render_mono(&mut out);
        let sub = handles.meters.band(FrequencyBand::Sub).rms();
        let tweet = handles.meters.band(FrequencyBand::Tweet).rms();
        assert!(sub > 0.05, "sub={sub}");
        assert!(tweet < 1e-3, "tweet={tweet}");
    }
}

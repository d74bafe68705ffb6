//! Mix engine: the control-side face of the audio session
//!
//! [`MixEngine`] owns at most one [`AudioSession`]. Until `initialize`
//! succeeds every control call is a silent no-op. Afterwards, continuous
//! controls are written into the session's control cells and discrete
//! actions travel to the renderer as [`GraphCommand`]s; nothing here ever
//! waits on the audio thread.

use std::path::Path;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use dubmix_core::params::EQ_BAND_COUNT;
use dubmix_core::{
    format_secs, BandState, DelayModel, DelayParams, EqState, FrequencyBand, PreampState,
    SirenModel, SirenParams,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::audio_io::{AudioOutputError, OutputDevice, RealtimeOutputStream};
use crate::control::ControlSurface;
use crate::graph::{GraphCommand, GraphMeters, GraphStatus, SignalGraph, SirenPhase};
use crate::meter::MeterState;
use crate::source::{SourceError, SourceTrack};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Audio output error: {0}")]
    Output(#[from] AudioOutputError),
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
    #[error("Engine not initialized")]
    NotReady,
}

/// Non-fatal transport faults, reported upward as warnings
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("No source loaded")]
    NoSource,
    #[error("Renderer command queue is full")]
    QueueFull,
    #[error("Renderer is gone")]
    Disconnected,
    #[error("Engine not initialized")]
    NotReady,
}

/// Everything that lives for one audio session
pub struct AudioSession {
    sample_rate: u32,
    device_name: Option<String>,
    controls: Arc<ControlSurface>,
    status: Arc<GraphStatus>,
    meters: GraphMeters,
    commands: Sender<GraphCommand>,
    retired: Receiver<Arc<SourceTrack>>,

    preamp: PreampState,
    eq: EqState,
    delay: DelayParams,
    siren: SirenParams,
    siren_active: bool,
    siren_model: SirenModel,
    delay_model: DelayModel,
    source_name: Option<String>,

    stream: Option<RealtimeOutputStream>,
}

impl AudioSession {
    fn new(graph_sample_rate: u32, controls: Arc<ControlSurface>) -> (Self, SignalGraph) {
        let (graph, handles) = SignalGraph::build(graph_sample_rate, controls);
        let session = Self {
            sample_rate: graph_sample_rate,
            device_name: None,
            controls: handles.controls,
            status: handles.status,
            meters: handles.meters,
            commands: handles.commands,
            retired: handles.retired,
            preamp: PreampState::default(),
            eq: EqState::default(),
            delay: DelayParams::default(),
            siren: SirenParams::default(),
            siren_active: false,
            siren_model: SirenModel::default(),
            delay_model: DelayModel::default(),
            source_name: None,
            stream: None,
        };
        (session, graph)
    }

    fn send(&self, command: GraphCommand) -> Result<(), TransportError> {
        self.commands.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::QueueFull,
            TrySendError::Disconnected(_) => TransportError::Disconnected,
        })
    }

    /// Drop sources the renderer has let go of
    fn collect_retired(&self) {
        for track in self.retired.try_iter() {
            debug!(name = %track.name, "Released retired source");
        }
    }
}

#[derive(Default)]
pub struct MixEngine {
    session: Option<AudioSession>,
}

impl MixEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.session.is_some()
    }

    /// Open the default output device and start rendering. Calling it again
    /// once a session exists does nothing.
    pub fn initialize(&mut self) -> Result<(), EngineError> {
        if self.session.is_some() {
            debug!("Engine already initialized");
            return Ok(());
        }

        let device = OutputDevice::open_default()?;
        let device_name = device.name.clone();
        let (mut session, mut graph) =
            AudioSession::new(device.sample_rate(), Arc::new(ControlSurface::new()));

        let stream = RealtimeOutputStream::start(device, move |buffer, channels| {
            graph.render(buffer, channels);
        })?;

        info!(device = %device_name, sample_rate = session.sample_rate, "Audio session initialized");
        session.device_name = Some(device_name);
        session.stream = Some(stream);
        self.session = Some(session);
        Ok(())
    }

    /// Create the session without an audio device. The caller drives the
    /// returned graph. `None` when a session already exists.
    pub fn initialize_with_host(&mut self, sample_rate: u32) -> Option<SignalGraph> {
        if self.session.is_some() {
            debug!("Engine already initialized");
            return None;
        }
        let (session, graph) = AudioSession::new(sample_rate, Arc::new(ControlSurface::new()));
        info!(sample_rate, "Host-driven audio session initialized");
        self.session = Some(session);
        Some(graph)
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.session.as_ref().map(|s| s.sample_rate)
    }

    pub fn device_name(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.device_name.as_deref())
    }

    fn session(&self, call: &'static str) -> Option<&AudioSession> {
        if self.session.is_none() {
            debug!(call, "Ignored, engine not initialized");
        }
        self.session.as_ref()
    }

    fn session_mut(&mut self, call: &'static str) -> Option<&mut AudioSession> {
        if self.session.is_none() {
            debug!(call, "Ignored, engine not initialized");
        }
        self.session.as_mut()
    }

    // ---- Source and transport ----

    /// Decode `path` and swap it in as the session source. Playback is not
    /// started.
    pub fn load_source(&mut self, path: &Path) -> Result<(), EngineError> {
        let sample_rate = self.session("load_source").ok_or(EngineError::NotReady)?.sample_rate;
        let track = SourceTrack::from_wav(path, sample_rate)?;
        self.load_track(track);
        Ok(())
    }

    /// Swap in an already decoded track
    pub fn load_track(&mut self, track: SourceTrack) {
        let Some(session) = self.session_mut("load_track") else {
            return;
        };
        session.collect_retired();
        if track.sample_rate != session.sample_rate {
            warn!(
                track_rate = track.sample_rate,
                session_rate = session.sample_rate,
                "Source sample rate differs from session, playback speed will be off"
            );
        }
        let name = track.name.clone();
        match session.send(GraphCommand::LoadSource(Arc::new(track))) {
            Ok(()) => {
                info!(name = %name, "Source swapped");
                session.source_name = Some(name);
            }
            Err(e) => warn!(name = %name, error = %e, "Source swap failed"),
        }
    }

    pub fn source_name(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.source_name.as_deref())
    }

    /// Start playback. Failures leave the transport stopped and come back
    /// as a warning-level error.
    pub fn play(&mut self) -> Result<(), TransportError> {
        let Some(session) = self.session("play") else {
            return Err(TransportError::NotReady);
        };
        let result = if session.source_name.is_none() {
            Err(TransportError::NoSource)
        } else {
            session.send(GraphCommand::Play)
        };
        if let Err(e) = &result {
            warn!(error = %e, "Playback did not start");
        }
        result
    }

    pub fn pause(&mut self) {
        if let Some(session) = self.session("pause") {
            if let Err(e) = session.send(GraphCommand::Pause) {
                warn!(error = %e, "Pause was not delivered");
            }
        }
    }

    /// Stop and rewind to the start
    pub fn stop(&mut self) {
        if let Some(session) = self.session("stop") {
            if let Err(e) = session.send(GraphCommand::Stop) {
                warn!(error = %e, "Stop was not delivered");
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.status.is_playing())
    }

    pub fn position_secs(&self) -> f64 {
        self.session.as_ref().map_or(0.0, |s| {
            s.status.position_samples() as f64 / s.sample_rate as f64
        })
    }

    pub fn position_label(&self) -> String {
        format_secs(self.position_secs())
    }

    /// Frames rendered since the session started
    pub fn sample_clock(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.status.sample_clock())
    }

    // ---- Preamp ----

    pub fn set_band_gain(&mut self, band: FrequencyBand, value: f32) {
        let Some(session) = self.session_mut("set_band_gain") else {
            return;
        };
        let effective = session.preamp.set_gain(band, value);
        session.controls.band_gain(band).set(effective);
        debug!(%band, gain = session.preamp.band(band).gain, effective, "Band gain");
    }

    pub fn set_band_muted(&mut self, band: FrequencyBand, muted: bool) {
        let Some(session) = self.session_mut("set_band_muted") else {
            return;
        };
        let effective = session.preamp.set_muted(band, muted);
        session.controls.band_gain(band).set(effective);
        debug!(%band, muted, effective, "Band mute");
    }

    pub fn band_state(&self, band: FrequencyBand) -> Option<BandState> {
        self.session.as_ref().map(|s| s.preamp.band(band))
    }

    /// Gain the band is being driven to (0 while muted)
    pub fn band_target_gain(&self, band: FrequencyBand) -> Option<f32> {
        self.session.as_ref().map(|s| s.controls.band_gain(band).get())
    }

    // ---- Graphic EQ ----

    /// Set one EQ band. Indices outside `0..10` are ignored.
    pub fn set_eq_gain(&mut self, index: usize, gain_db: f32) {
        let Some(session) = self.session_mut("set_eq_gain") else {
            return;
        };
        match session.eq.set_gain_db(index, gain_db) {
            Ok(clamped) => {
                session.controls.eq_gains_db[index].set(clamped);
                debug!(index, gain_db = clamped, "EQ gain");
            }
            Err(e) => warn!(error = %e, "EQ write ignored"),
        }
    }

    pub fn eq_gain(&self, index: usize) -> Option<f32> {
        self.session.as_ref().and_then(|s| s.eq.gain_db(index))
    }

    pub fn eq_gains(&self) -> Option<[f32; EQ_BAND_COUNT]> {
        self.session.as_ref().map(|s| *s.eq.gains_db())
    }

    // ---- Siren ----

    pub fn set_siren_active(&mut self, active: bool) {
        let Some(session) = self.session_mut("set_siren_active") else {
            return;
        };
        match session.send(GraphCommand::SirenGate(active)) {
            Ok(()) => session.siren_active = active,
            Err(e) => warn!(active, error = %e, "Siren trigger dropped"),
        }
    }

    pub fn set_siren_params(&mut self, params: SirenParams) {
        let Some(session) = self.session_mut("set_siren_params") else {
            return;
        };
        let clamped = params.clamped();
        if clamped != params {
            debug!(?params, ?clamped, "Siren params clamped");
        }
        session.controls.siren.store(&clamped);
        session.siren = clamped;
    }

    pub fn siren_params(&self) -> Option<SirenParams> {
        self.session.as_ref().map(|s| s.siren)
    }

    /// Whether the siren trigger is held
    pub fn is_siren_active(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.siren_active)
    }

    /// Phase the renderer last reported
    pub fn siren_phase(&self) -> SirenPhase {
        self.session
            .as_ref()
            .map_or(SirenPhase::Idle, |s| s.status.siren_phase())
    }

    pub fn set_siren_model(&mut self, model: SirenModel) {
        if let Some(session) = self.session_mut("set_siren_model") {
            session.siren_model = model;
            info!(?model, "Siren model selected");
        }
    }

    pub fn siren_model(&self) -> Option<SirenModel> {
        self.session.as_ref().map(|s| s.siren_model)
    }

    // ---- Dub delay ----

    pub fn set_delay_params(&mut self, params: DelayParams) {
        let Some(session) = self.session_mut("set_delay_params") else {
            return;
        };
        let clamped = params.clamped();
        if clamped != params {
            debug!(?params, ?clamped, "Delay params clamped");
        }
        session.controls.delay.store(&clamped);
        session.delay = clamped;
    }

    pub fn delay_params(&self) -> Option<DelayParams> {
        self.session.as_ref().map(|s| s.delay)
    }

    pub fn set_delay_model(&mut self, model: DelayModel) {
        if let Some(session) = self.session_mut("set_delay_model") {
            session.delay_model = model;
            info!(?model, "Delay model selected");
        }
    }

    pub fn delay_model(&self) -> Option<DelayModel> {
        self.session.as_ref().map(|s| s.delay_model)
    }

    // ---- Metering ----

    pub fn master_meter(&self) -> Option<Arc<MeterState>> {
        self.session.as_ref().map(|s| s.meters.master.clone())
    }

    pub fn band_meter(&self, band: FrequencyBand) -> Option<Arc<MeterState>> {
        self.session.as_ref().map(|s| s.meters.band(band).clone())
    }
}

impl Drop for MixEngine {
    fn drop(&mut self) {
        if let Some(stream) = self.session.as_ref().and_then(|s| s.stream.as_ref()) {
            stream.stop();
        }
    }
}

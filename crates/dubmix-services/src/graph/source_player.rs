//! Source playback node: the head of the music path

use std::sync::Arc;

use dubmix_core::{Transport, TransportState};

use crate::source::SourceTrack;

#[derive(Debug)]
pub struct SourcePlayer {
    track: Option<Arc<SourceTrack>>,
    transport: Transport,
}

impl SourcePlayer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            track: None,
            transport: Transport::new(sample_rate),
        }
    }

    /// Point the player at a new track, stopped at the start. Returns the
    /// previous track so it can be dropped off the audio thread.
    pub fn load(&mut self, track: Arc<SourceTrack>) -> Option<Arc<SourceTrack>> {
        self.transport.reset_for_source(track.samples.len() as u64);
        self.track.replace(track)
    }

    pub fn has_track(&self) -> bool {
        self.track.is_some()
    }

    /// Start playback; false when there is nothing to play
    pub fn play(&mut self) -> bool {
        if self.track.is_none() {
            return false;
        }
        self.transport.play();
        true
    }

    pub fn pause(&mut self) {
        if self.transport.is_playing() {
            self.transport.pause();
        }
    }

    pub fn stop(&mut self) {
        self.transport.stop();
    }

    pub fn state(&self) -> TransportState {
        self.transport.state
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    pub fn position_samples(&self) -> u64 {
        self.transport.position_samples
    }

    /// Fill `output` from the track, looping at its end. Silence while
    /// stopped or paused.
    pub fn render(&mut self, output: &mut [f32]) {
        let Some(track) = self.track.as_ref().filter(|_| self.transport.is_playing()) else {
            output.fill(0.0);
            return;
        };
        let len = track.samples.len();

        let mut written = 0;
        while written < output.len() && self.transport.is_playing() {
            let pos = self.transport.position_samples as usize % len;
            let count = (len - pos).min(output.len() - written);
            output[written..written + count].copy_from_slice(&track.samples[pos..pos + count]);
            written += count;
            self.transport.advance(count as u64);
        }
        output[written..].fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_track(len: usize) -> Arc<SourceTrack> {
        let samples = (0..len).map(|n| n as f32).collect();
        Arc::new(SourceTrack::from_samples("ramp", samples, 1000).unwrap())
    }

    #[test]
    fn test_silent_without_track() {
        let mut player = SourcePlayer::new(1000);
        assert!(!player.play());
        let mut out = [1.0f32; 8];
        player.render(&mut out);
        assert_eq!(out, [0.0; 8]);
    }

    #[test]
    fn test_loops_at_end() {
        let mut player = SourcePlayer::new(1000);
        player.load(ramp_track(5));
        assert!(player.play());
        let mut out = [0.0f32; 7];
        player.render(&mut out);
        assert_eq!(out, [0.0, 1.0, 2.0, 3.0, 4.0, 0.0, 1.0]);
        assert_eq!(player.position_samples(), 2);
    }

    #[test]
    fn test_pause_keeps_position_stop_resets() {
        let mut player = SourcePlayer::new(1000);
        player.load(ramp_track(100));
        player.play();
        let mut out = [0.0f32; 10];
        player.render(&mut out);
        player.pause();
        player.render(&mut out);
        assert_eq!(out, [0.0; 10]);
        assert_eq!(player.position_samples(), 10);

        player.play();
        player.render(&mut out);
        assert_eq!(out[0], 10.0);

        player.stop();
        assert_eq!(player.position_samples(), 0);
        assert_eq!(player.state(), TransportState::Stopped);
    }

    #[test]
    fn test_load_returns_previous_and_stops() {
        let mut player = SourcePlayer::new(1000);
        assert!(player.load(ramp_track(10)).is_none());
        player.play();
        let previous = player.load(ramp_track(20));
        assert_eq!(previous.map(|t| t.len()), Some(10));
        assert!(!player.is_playing());
        assert!(player.has_track());
    }
}

//! Music bookkeeping for the audio collaborator
//!
//! The session never mixes audio; it records what should be playing so the
//! collaborator can follow along, and so pause/resume and the win sequence
//! behave correctly. Track changes are mirrored onto the event bus.

use bevy::prelude::*;

use crate::constants::VICTORY_JINGLE_TIME;
use crate::events::{EventBus, GameEvent};

/// Resource tracking requested music playback state
#[derive(Resource, Debug, Default)]
pub struct MusicDirector {
    /// Track currently playing, if any
    pub current: Option<String>,
    /// Track queued to follow the current one
    pub queued: Option<String>,
    /// Whether playback is paused
    pub paused: bool,
    /// Seconds left of the victory jingle; 0 when not playing
    victory_remaining: f32,
}

impl MusicDirector {
    /// Request a track. Requesting the current track is a no-op so room
    /// re-entry does not restart the music.
    pub fn play(&mut self, name: &str, bus: &mut EventBus) {
        if self.current.as_deref() == Some(name) {
            return;
        }
        self.current = Some(name.to_string());
        self.paused = false;
        bus.emit(GameEvent::MusicChange {
            track: self.current.clone(),
        });
    }

    /// Stop playback entirely
    pub fn stop(&mut self, bus: &mut EventBus) {
        if self.current.is_some() {
            self.current = None;
            bus.emit(GameEvent::MusicChange { track: None });
        }
        self.paused = false;
    }

    /// Queue a follow-up track; the audio collaborator hands an intro
    /// piece over to its loop this way
    pub fn queue(&mut self, name: &str) {
        self.queued = Some(name.to_string());
    }

    /// Drop the queued follow-up track
    pub fn clear_queue(&mut self) {
        self.queued = None;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn unpause(&mut self) {
        self.paused = false;
    }

    /// Start the victory jingle; replaces the current track
    pub fn play_victory(&mut self, bus: &mut EventBus) {
        self.stop(bus);
        self.victory_remaining = VICTORY_JINGLE_TIME;
    }

    /// Whether the victory jingle is still sounding
    pub fn victory_playing(&self) -> bool {
        self.victory_remaining > 0.0
    }

    /// Used by tests and harnesses to cut the jingle short
    pub fn silence_victory(&mut self) {
        self.victory_remaining = 0.0;
    }

    pub fn tick(&mut self, delta: f32) {
        if self.victory_remaining > 0.0 && !self.paused {
            self.victory_remaining = (self.victory_remaining - delta).max(0.0);
        }
    }
}

/// System: advance the victory jingle countdown
pub fn tick_music(time: Res<Time>, mut music: ResMut<MusicDirector>) {
    music.tick(time.delta_secs());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_same_track_is_noop() {
        let mut music = MusicDirector::default();
        let mut bus = EventBus::new();
        music.play("overworld", &mut bus);
        assert_eq!(bus.pending_count(), 1);
        music.play("overworld", &mut bus);
        assert_eq!(bus.pending_count(), 1);
    }

    #[test]
    fn test_queue_survives_until_cleared() {
        let mut music = MusicDirector::default();
        let mut bus = EventBus::new();
        music.play("castle-start", &mut bus);
        music.queue("castle");
        assert_eq!(music.queued.as_deref(), Some("castle"));
        music.clear_queue();
        assert!(music.queued.is_none());
    }

    #[test]
    fn test_victory_jingle_runs_out() {
        let mut music = MusicDirector::default();
        let mut bus = EventBus::new();
        music.play_victory(&mut bus);
        assert!(music.victory_playing());
        music.tick(VICTORY_JINGLE_TIME + 0.1);
        assert!(!music.victory_playing());
    }

    #[test]
    fn test_pause_holds_jingle() {
        let mut music = MusicDirector::default();
        let mut bus = EventBus::new();
        music.play_victory(&mut bus);
        music.pause();
        music.tick(VICTORY_JINGLE_TIME + 1.0);
        assert!(music.victory_playing());
    }
}

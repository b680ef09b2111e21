//! Event type definitions for the session bus

use serde::{Deserialize, Serialize};

/// All session events that can be observed by collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GameEvent {
    // === Session Events ===
    /// Session started (generated once per game launch)
    SessionStart {
        session_id: String, // UUID v4
        timestamp: String,  // ISO 8601
    },
    /// A room began playing
    RoomStart { level_id: String },
    /// The session was paused
    Paused,
    /// The session was resumed
    Resumed,

    // === Scoring Events ===
    /// One unit of score was banked or drained (chime feedback)
    ScorePulse { amount: i64, score: i64 },
    /// One HP unit converted to score during the win tally
    HpDrain { slot: usize, score: i64 },

    // === Progress Events ===
    /// A player with the lose-on-death flag died
    PlayerDeath { slot: usize },
    /// The level was marked cleared
    LevelCleared { level_id: String },
    /// A checkpoint was touched
    CheckpointTouched { level_id: String, dest: String },
    /// A warp was taken
    WarpTaken { level_id: String, spawn_id: String },
    /// The final level was finished
    GameCompleted,

    // === Collaborator Requests ===
    /// Open a modal dialog box (GUI collaborator)
    Dialog { portrait: String, text: String },
    /// Music playback changed (audio collaborator)
    MusicChange { track: Option<String> },

    // === Diagnostics ===
    /// A timeline command failed to evaluate; execution continued
    ScriptError { context: String, message: String },
    /// A level or worldmap asset failed to load
    LoadError { message: String },
}

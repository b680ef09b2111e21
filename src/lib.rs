//! Frostrun - the level-session runtime of a 2D platformer, built with Bevy
//!
//! This crate provides the scripted-event timeline interpreter, the level
//! session state machine (pause, death, win sequence), warps and
//! checkpoints, and save-slot persistence. Rendering, audio mixing,
//! tilemap loading, and physics are external collaborators driven through
//! the event bus and the resources exposed here.

// Core modules
pub mod alarms;
pub mod constants;
pub mod events;
pub mod harness;
pub mod levelset;
pub mod music;
pub mod player;
pub mod registry;
pub mod save;
pub mod session;
pub mod timeline;
pub mod warp;

// Re-export commonly used types for convenience
pub use alarms::{AlarmSet, ObjectAlarms, tick_object_alarms};
pub use events::{BusEvent, EventBus, GameEvent, update_event_bus_time};
pub use harness::HeadlessAppBuilder;
pub use levelset::Levelset;
pub use music::{MusicDirector, tick_music};
pub use registry::{ObjectRegistry, ScriptId, register_timeline_objects};
pub use save::{SaveSlot, SaveSlots, completion_percent, quick_exit_save};
pub use session::{
    LevelSession, PendingRoom, RoomConfig, RoomRequest, SessionContext, SessionHost, SessionPhase,
    advance_timeline, begin_room, end_room, enter_winning, fire_session_alarms, player_killed,
    request_pause, resume, session_tick, tick_pause_lockout, trigger_death,
};
pub use timeline::{CommandHost, Timeline, TimelineScript, Value};
pub use warp::{
    Checkpoint, PlayerCarry, RoomHandoff, apply_handoff, build_handoff, detach_carried,
    refresh_checkpoints, resolve, take_warp, touch_checkpoint, warp_failed,
};
pub use player::{Active, ActorKind, Facing, Freezable, Holding, Moves, Player, RoomScoped};

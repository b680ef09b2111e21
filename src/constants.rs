//! Tunable constants for frostrun
//!
//! All session and timeline timing values are defined here for easy tweaking.

// =============================================================================
// TIMELINE
// =============================================================================

pub const TIMELINE_STEP_RATE: f32 = 60.0; // Timeline steps per second of game time
pub const TIMELINE_DIR: &str = "assets/timelines";
pub const LEVELSET_DIR: &str = "assets/levelsets";

// =============================================================================
// SESSION TIMING
// =============================================================================

pub const PAUSE_LOCKOUT_TIME: f32 = 0.75; // Seconds after (re)start before pause works
pub const DEATH_FADE_TIME: f32 = 3.0; // Seconds of fade-out after a fatal hit
pub const DEATH_BLACKOUT_TIME: f32 = 1.0; // Black screen before respawn
pub const TIMER_INTERVAL: f32 = 0.7; // Seconds between time-bonus drain ticks

// =============================================================================
// SCORING
// =============================================================================

pub const SECOND_POINTS: i64 = 100; // Time bonus lost per timer tick
pub const HP_POINTS: i64 = 500; // Score awarded per HP unit in the win tally
pub const DEATH_PENALTY_RATE: f32 = 3.0; // Penalty fraction converted per fade duration

// =============================================================================
// WIN SEQUENCE
// =============================================================================

pub const WIN_COUNT_START_TIME: f32 = 2.0; // Delay before the points tally begins
pub const WIN_COUNT_CONTINUE_TIME: f32 = 0.75; // Delay between tally sub-phases
pub const WIN_COUNT_POINTS_RATE: f32 = 120.0; // Unbanked points drained per second
pub const WIN_COUNT_TIME_RATE: f32 = 320.0; // Time bonus drained per second
pub const WIN_FINISH_DELAY: f32 = 2.0; // Wait after the tally before leaving the level
pub const VICTORY_JINGLE_TIME: f32 = 4.5; // Length of the victory jingle

// =============================================================================
// SESSION ALARM NAMES
// =============================================================================

pub const ALARM_TIMER: &str = "timer";
pub const ALARM_DEATH: &str = "death";
pub const ALARM_WIN_COUNT_POINTS: &str = "win_count_points";
pub const ALARM_WIN_COUNT_TIME: &str = "win_count_time";
pub const ALARM_WIN_COUNT_HP: &str = "win_count_hp";
pub const ALARM_WIN_FINISH: &str = "win_finish";

// =============================================================================
// RESERVED IDENTIFIERS
// =============================================================================

pub const LEVEL_TARGET_ID: &str = "__level__"; // Registry ID of the session itself
pub const DEST_MAP: &str = "__map__"; // Warp destination: return to worldmap
pub const DEST_MAIN: &str = "__main__"; // Warp destination: the session's main area

// =============================================================================
// PERSISTENCE
// =============================================================================

pub const SAVE_SLOTS_FILE: &str = "config/save_slots.json";
pub const SAVE_SLOT_COUNT: usize = 3;

//! Level session states and transitions
//!
//! One room plays at a time; `LevelSession` is its super-state plus the
//! countdown alarms that drive the dying and winning sequences. Room
//! loading itself is a collaborator's job: transitions that leave the room
//! park a request in [`PendingRoom`] and the outer game fulfills it.

use bevy::prelude::*;

use crate::alarms::AlarmSet;
use crate::constants::*;
use crate::events::{EventBus, GameEvent};
use crate::levelset::Levelset;
use crate::music::MusicDirector;
use crate::player::{Facing, Moves, Player};
use crate::registry::ObjectRegistry;
use crate::session::context::SessionContext;
use crate::timeline::{Timeline, TimelineScript};
use crate::warp::RoomHandoff;

/// Super-state of the level session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Playing,
    Paused,
    Dying,
    Winning,
    Done,
}

/// Death fade-out in progress
#[derive(Debug, Clone)]
pub struct DeathFade {
    /// Seconds of fade left
    pub remaining: f32,
    /// Timer value captured at the death instant; sets the drain rate
    pub bonus_at_death: i64,
}

/// Static facts about the room being played, handed in by the room loader
#[derive(Debug, Clone, Default)]
pub struct RoomConfig {
    pub id: String,
    pub name: String,
    pub music: Option<String>,
    /// Starting time bonus when this room is a main area
    pub time_bonus: i64,
    /// Timeline script to run, if any
    pub timeline: Option<String>,
}

/// A room change the outer game must perform
#[derive(Debug, Clone, PartialEq)]
pub enum RoomRequest {
    /// Load a level (possibly the current one) at a spawn point
    Load {
        level: String,
        spawn: Option<String>,
        handoff: Option<RoomHandoff>,
    },
    /// Return to the overworld map
    Worldmap { map: String },
    /// Back to the title screen
    Title,
    /// Roll credits; the campaign is over
    Credits,
}

/// Parking spot for the next room change
#[derive(Resource, Debug, Default)]
pub struct PendingRoom(pub Option<RoomRequest>);

/// Per-room session state
#[derive(Resource, Debug, Default)]
pub struct LevelSession {
    pub phase: SessionPhase,
    pub alarms: AlarmSet,
    /// Room id being played
    pub fname: String,
    /// Spawn point the players entered from
    pub spawn: Option<String>,
    /// Music requested for this room; replayed on resume
    pub music: Option<String>,
    /// Unbanked points, tallied into the score by the win sequence
    pub points: i64,
    /// Configured starting bonus for this room
    pub time_bonus: i64,
    /// Input-lockout window after (re)start
    pub pause_delay: f32,
    /// Set by scripts on the final level; winning ends the campaign
    pub game_won: bool,
    /// Fade-out running after a fatal hit
    pub death: Option<DeathFade>,
    /// Win tally sub-phases currently draining
    pub win_count_points: bool,
    pub win_count_time: bool,
}

impl LevelSession {
    /// Whether the session has been won (any winning sub-state)
    pub fn won(&self) -> bool {
        self.phase == SessionPhase::Winning
    }

    /// Whether a death is in progress (fade or blackout)
    pub fn dying(&self) -> bool {
        self.phase == SessionPhase::Dying
    }
}

/// Enter a room: reset per-room state, arm the level timer, start the
/// script and music. The caller spawns entities and applies any hand-off.
pub fn begin_room(
    session: &mut LevelSession,
    ctx: &mut SessionContext,
    timeline: &mut Timeline,
    music: &mut MusicDirector,
    bus: &mut EventBus,
    levelset: &Levelset,
    config: &RoomConfig,
    spawn: Option<String>,
) {
    session.phase = SessionPhase::Playing;
    session.fname = config.id.clone();
    session.spawn = spawn;
    session.music = config.music.clone();
    session.points = 0;
    session.time_bonus = config.time_bonus;
    session.pause_delay = PAUSE_LOCKOUT_TIME;
    session.game_won = false;
    session.death = None;
    session.win_count_points = false;
    session.win_count_time = false;
    session.alarms = AlarmSet::new();
    session.alarms.set(ALARM_TIMER, TIMER_INTERVAL);

    if ctx.main_area.is_none() {
        ctx.main_area = Some(config.id.clone());
    }
    if ctx.main_area.as_deref() == Some(config.id.as_str()) {
        ctx.level_time_bonus = config.time_bonus;
    }
    let area = ctx.main_area.clone().unwrap_or_default();
    if ctx.god_mode {
        let clamped = ctx.level_timers.get(&area).copied().unwrap_or(0).min(0);
        ctx.level_timers.insert(area, clamped);
    } else if !ctx.level_timers.contains_key(&area) {
        let start = if levelset.contains(&area) {
            ctx.level_time_bonus
        } else {
            0
        };
        ctx.level_timers.insert(area, start);
    }

    match &config.timeline {
        Some(name) => match TimelineScript::load(name) {
            Ok(script) => timeline.install(name, &script),
            Err(msg) => {
                warn!("{}", msg);
                bus.emit(GameEvent::ScriptError {
                    context: "load_timeline".to_string(),
                    message: msg,
                });
                timeline.clear();
            }
        },
        None => timeline.clear(),
    }

    if let Some(track) = config.music.clone() {
        music.play(&track, bus);
    }
    bus.emit(GameEvent::RoomStart {
        level_id: config.id.clone(),
    });
}

/// Pause input arrived. Depending on state this pauses, skips a cutscene,
/// or fast-forwards the death wait; during the lockout window it does
/// nothing.
pub fn request_pause(
    session: &mut LevelSession,
    ctx: &SessionContext,
    timeline: &mut Timeline,
    music: &mut MusicDirector,
    bus: &mut EventBus,
) {
    match session.phase {
        SessionPhase::Dying => {
            // Skip straight to the blackout, unless a penalty still needs
            // to drain
            if ctx.timer() >= 0 {
                music.stop(bus);
                session.death = None;
                session.alarms.set(ALARM_DEATH, 0.0);
            }
        }
        SessionPhase::Playing => {
            if let Some(target) = timeline.skip_target
                && timeline.cursor < target
            {
                timeline.skip_to(target);
            } else if session.pause_delay <= 0.0 {
                music.pause();
                session.phase = SessionPhase::Paused;
                bus.emit(GameEvent::Paused);
            }
        }
        SessionPhase::Paused | SessionPhase::Winning | SessionPhase::Done => {}
    }
}

/// Resume from pause
pub fn resume(session: &mut LevelSession, music: &mut MusicDirector, bus: &mut EventBus) {
    if session.phase == SessionPhase::Paused {
        session.phase = SessionPhase::Playing;
        music.unpause();
        bus.emit(GameEvent::Resumed);
    }
}

/// A player died. Session-fatal only when their lose-on-death flag is set;
/// fires the dying transition once no matter how many players hit it.
pub fn player_killed(
    session: &mut LevelSession,
    ctx: &mut SessionContext,
    music: &mut MusicDirector,
    bus: &mut EventBus,
    player: &Player,
) {
    bus.emit(GameEvent::PlayerDeath { slot: player.slot });
    if player.lose_on_death {
        trigger_death(session, ctx, music, bus);
    }
}

/// Playing -> Dying
pub fn trigger_death(
    session: &mut LevelSession,
    ctx: &mut SessionContext,
    music: &mut MusicDirector,
    bus: &mut EventBus,
) {
    if session.phase != SessionPhase::Playing {
        return;
    }
    session.phase = SessionPhase::Dying;
    session.death = Some(DeathFade {
        remaining: DEATH_FADE_TIME,
        bonus_at_death: ctx.timer(),
    });
    session.alarms.cancel(ALARM_TIMER);
    music.clear_queue();
    music.stop(bus);
}

/// Playing -> Winning: arm the first tally alarm, clear the checkpoint,
/// start the jingle. Returns true when the transition happened, so the
/// caller knows to freeze the players via [`freeze_for_victory`].
pub fn enter_winning(
    session: &mut LevelSession,
    ctx: &mut SessionContext,
    music: &mut MusicDirector,
    bus: &mut EventBus,
) -> bool {
    if session.phase != SessionPhase::Playing {
        return false;
    }
    session.phase = SessionPhase::Winning;
    session.alarms.cancel(ALARM_TIMER);
    session.alarms.set(ALARM_WIN_COUNT_POINTS, WIN_COUNT_START_TIME);
    if let Some(area) = ctx.main_area.clone() {
        ctx.checkpoints.insert(area, None);
    }
    music.clear_queue();
    music.play_victory(bus);
    true
}

/// Take a player away from human input for the victory walk
pub fn freeze_for_victory(player: &mut Player, moves: &mut Moves, facing: &Facing, walk: bool) {
    player.human = false;
    moves.walk_dir = if walk { Some(facing.0) } else { None };
}

/// Any -> Done: the room is being torn down
pub fn end_room(session: &mut LevelSession, registry: &mut ObjectRegistry) {
    session.phase = SessionPhase::Done;
    session.alarms = AlarmSet::new();
    session.death = None;
    registry.clear();
}

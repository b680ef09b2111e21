//! Level session state machine
//!
//! Owns the Playing/Paused/Dying/Winning/Done super-states and the per-room
//! tick: advance the timeline, fire session alarms, run the death fade and
//! the win tally. One tick drives everything in a fixed order; suspension
//! is countdown state, never blocking control flow.

mod context;
mod death;
mod host;
mod state;
mod win;

pub use context::SessionContext;
pub use death::{death_tick, on_death_alarm};
pub use host::{ScriptTargetQuery, SessionHost};
pub use state::{
    DeathFade, LevelSession, PendingRoom, RoomConfig, RoomRequest, SessionPhase, begin_room,
    end_room, enter_winning, freeze_for_victory, player_killed, request_pause, resume,
    trigger_death,
};
pub use win::{on_count_hp_alarm, on_count_points_alarm, on_count_time_alarm, win_tick};

use bevy::prelude::*;

use crate::constants::*;
use crate::events::EventBus;
use crate::levelset::Levelset;
use crate::music::MusicDirector;
use crate::player::Player;
use crate::registry::ObjectRegistry;
use crate::save::SaveSlots;
use crate::timeline::Timeline;

/// System: run down the post-(re)start input lockout
pub fn tick_pause_lockout(time: Res<Time>, mut session: ResMut<LevelSession>) {
    if session.pause_delay > 0.0 {
        session.pause_delay -= time.delta_secs();
    }
}

/// System: advance the timeline through the session host
#[allow(clippy::too_many_arguments)]
pub fn advance_timeline(
    time: Res<Time>,
    mut timeline: ResMut<Timeline>,
    mut session: ResMut<LevelSession>,
    mut ctx: ResMut<SessionContext>,
    mut registry: ResMut<ObjectRegistry>,
    mut music: ResMut<MusicDirector>,
    mut bus: ResMut<EventBus>,
    mut pending: ResMut<PendingRoom>,
    mut slots: ResMut<SaveSlots>,
    levelset: Res<Levelset>,
    mut commands: Commands,
    mut targets: ScriptTargetQuery,
) {
    if matches!(session.phase, SessionPhase::Paused | SessionPhase::Done) {
        return;
    }
    let delta = time.delta_secs() * TIMELINE_STEP_RATE;
    let mut session_host = SessionHost {
        session: &mut session,
        ctx: &mut ctx,
        registry: &mut registry,
        music: &mut music,
        bus: &mut bus,
        pending: &mut pending,
        slots: &mut slots,
        levelset: &levelset,
        commands: &mut commands,
        targets: &mut targets,
    };
    timeline.advance(delta, &mut session_host);
}

/// System: tick session alarms and handle whatever fired
#[allow(clippy::too_many_arguments)]
pub fn fire_session_alarms(
    time: Res<Time>,
    mut session: ResMut<LevelSession>,
    mut ctx: ResMut<SessionContext>,
    levelset: Res<Levelset>,
    mut slots: ResMut<SaveSlots>,
    mut pending: ResMut<PendingRoom>,
    mut bus: ResMut<EventBus>,
    mut players: Query<&mut Player>,
) {
    if matches!(session.phase, SessionPhase::Paused | SessionPhase::Done) {
        return;
    }
    for name in session.alarms.tick(time.delta_secs()) {
        match name.as_str() {
            ALARM_TIMER => {
                let main_area = ctx.main_area.clone().unwrap_or_default();
                if levelset.contains(&main_area) {
                    if !ctx.is_cleared(&main_area) {
                        ctx.add_timer(-SECOND_POINTS);
                    }
                    session.alarms.set(ALARM_TIMER, TIMER_INTERVAL);
                }
            }
            ALARM_DEATH => on_death_alarm(&mut ctx, &levelset, &mut slots, &mut pending),
            ALARM_WIN_COUNT_POINTS => on_count_points_alarm(&mut session),
            ALARM_WIN_COUNT_TIME => on_count_time_alarm(&mut session),
            ALARM_WIN_COUNT_HP => on_count_hp_alarm(
                &mut session,
                &mut ctx,
                &mut bus,
                players.iter_mut().map(Mut::into_inner),
            ),
            // The finish alarm gates by absence; firing needs no handler
            _ => {}
        }
    }
}

/// System: per-frame death fade and win tally
#[allow(clippy::too_many_arguments)]
pub fn session_tick(
    time: Res<Time>,
    mut session: ResMut<LevelSession>,
    mut ctx: ResMut<SessionContext>,
    music: Res<MusicDirector>,
    mut bus: ResMut<EventBus>,
    levelset: Res<Levelset>,
    mut slots: ResMut<SaveSlots>,
    mut pending: ResMut<PendingRoom>,
) {
    let dt = time.delta_secs();
    match session.phase {
        SessionPhase::Dying => death_tick(&mut session, &mut ctx, &mut bus, dt),
        SessionPhase::Winning => win_tick(
            &mut session,
            &mut ctx,
            &music,
            &mut bus,
            &levelset,
            &mut slots,
            &mut pending,
            dt,
        ),
        _ => {}
    }
}

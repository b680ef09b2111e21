//! The dying sequence
//!
//! A fatal hit starts a fade-out. While it runs, an outstanding time
//! penalty converts into score loss, one pulse at a time, but only if a
//! level has ever been cleared on this save. The fade hands over to a
//! fixed blackout alarm, and when that fires the session reloads from the
//! last checkpoint (or the level start on a first attempt).

use crate::constants::*;
use crate::events::{EventBus, GameEvent};
use crate::save::SaveSlots;
use crate::session::context::SessionContext;
use crate::session::state::{LevelSession, PendingRoom, RoomRequest, SessionPhase};
use crate::levelset::Levelset;
use crate::warp;

/// Per-frame death fade: drain the penalty, then arm the blackout
pub fn death_tick(
    session: &mut LevelSession,
    ctx: &mut SessionContext,
    bus: &mut EventBus,
    dt: f32,
) {
    if session.phase != SessionPhase::Dying {
        return;
    }
    let Some(fade) = session.death.as_mut() else {
        return;
    };

    let timer = ctx.timer();
    if timer < 0 && !ctx.cleared_levels.is_empty() {
        // Flow rate scales with the penalty at death so any size drains
        // within the fade; never overshoots zero
        let flow = (fade.bonus_at_death.abs() as f32 * DEATH_PENALTY_RATE * dt / DEATH_FADE_TIME)
            .ceil() as i64;
        let amount = -flow.min(timer.abs());
        if amount != 0 {
            ctx.score += amount;
            ctx.add_timer(-amount);
            bus.emit(GameEvent::ScorePulse {
                amount,
                score: ctx.score,
            });
        }
    }

    fade.remaining -= dt;
    if fade.remaining < 0.0 {
        session.death = None;
        session.alarms.set(ALARM_DEATH, DEATH_BLACKOUT_TIME);
    }
}

/// The blackout ended: save and reload from the checkpoint ledger, or the
/// level start when there is none
pub fn on_death_alarm(
    ctx: &mut SessionContext,
    levelset: &Levelset,
    slots: &mut SaveSlots,
    pending: &mut PendingRoom,
) {
    // A first attempt with no checkpoint gets its starting bonus back
    if ctx.cleared_levels.is_empty() && ctx.checkpoint().is_none() {
        ctx.set_timer(ctx.level_time_bonus);
    }

    let Some(main_area) = ctx.main_area.clone() else {
        pending.0 = Some(RoomRequest::Title);
        return;
    };
    slots.save_game(ctx, levelset);

    let (level, spawn) = match ctx.checkpoint() {
        Some(dest) => {
            let (level, spawn) = warp::resolve(&dest, &main_area, &main_area);
            (level, Some(spawn))
        }
        None => (main_area, None),
    };
    pending.0 = Some(RoomRequest::Load {
        level,
        spawn,
        handoff: None,
    });
}

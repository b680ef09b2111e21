//! The winning sequence
//!
//! Reaching the goal starts an alarm-gated tally: unbanked points drain
//! into the score, then the time bonus (or penalty), then - on a first
//! clear, god mode excepted - one HP unit per short interval. Once the
//! victory jingle ends and no tally alarm is pending, the level is marked
//! cleared and the session moves on: credits, the worldmap, or the next
//! sequential level, saving before each transition.

use crate::constants::*;
use crate::events::{EventBus, GameEvent};
use crate::levelset::Levelset;
use crate::music::MusicDirector;
use crate::player::Player;
use crate::save::SaveSlots;
use crate::session::context::SessionContext;
use crate::session::state::{LevelSession, PendingRoom, RoomRequest, SessionPhase};

/// Sign-correct drain step: at most `rate * dt` (rounded up, at least one
/// unit), never past zero
fn drain_step(remaining: i64, rate: f32, dt: f32) -> i64 {
    if remaining == 0 {
        return 0;
    }
    let step = ((rate * dt).ceil() as i64).max(1).min(remaining.abs());
    step * remaining.signum()
}

/// Per-frame winning tally
pub fn win_tick(
    session: &mut LevelSession,
    ctx: &mut SessionContext,
    music: &MusicDirector,
    bus: &mut EventBus,
    levelset: &Levelset,
    slots: &mut SaveSlots,
    pending: &mut PendingRoom,
    dt: f32,
) {
    if session.phase != SessionPhase::Winning {
        return;
    }

    if session.win_count_points {
        if session.points != 0 {
            let amount = drain_step(session.points, WIN_COUNT_POINTS_RATE, dt);
            session.points -= amount;
            // The tally pays out what was at stake; the counter itself is
            // what carries the sign
            ctx.score += amount.abs();
            bus.emit(GameEvent::ScorePulse {
                amount: amount.abs(),
                score: ctx.score,
            });
        } else {
            session.win_count_points = false;
            session
                .alarms
                .set(ALARM_WIN_COUNT_TIME, WIN_COUNT_CONTINUE_TIME);
        }
    } else if session.win_count_time {
        let timer = ctx.timer();
        if timer != 0 {
            let amount = drain_step(timer, WIN_COUNT_TIME_RATE, dt);
            ctx.add_timer(-amount);
            ctx.score += amount.abs();
            bus.emit(GameEvent::ScorePulse {
                amount: amount.abs(),
                score: ctx.score,
            });
        } else {
            session.win_count_time = false;
            let main_area = ctx.main_area.clone().unwrap_or_default();
            if !ctx.is_cleared(&main_area) {
                session
                    .alarms
                    .set(ALARM_WIN_COUNT_HP, WIN_COUNT_CONTINUE_TIME);
            } else {
                session.alarms.set(ALARM_WIN_FINISH, WIN_FINISH_DELAY);
            }
        }
    } else if !music.victory_playing()
        && !session.alarms.any_pending(&[
            ALARM_WIN_COUNT_POINTS,
            ALARM_WIN_COUNT_TIME,
            ALARM_WIN_COUNT_HP,
            ALARM_WIN_FINISH,
        ])
    {
        finish(session, ctx, levelset, slots, pending, bus);
    }
}

/// The points-tally alarm fired: begin draining, or move straight on
pub fn on_count_points_alarm(session: &mut LevelSession) {
    if session.points != 0 {
        session.win_count_points = true;
    } else {
        session.win_count_time = true;
    }
}

/// The time-tally alarm fired
pub fn on_count_time_alarm(session: &mut LevelSession) {
    session.win_count_time = true;
}

/// The HP-tally alarm fired: convert one HP unit, re-arm while any player
/// has HP left. Skipped wholesale under god mode.
pub fn on_count_hp_alarm<'a>(
    session: &mut LevelSession,
    ctx: &mut SessionContext,
    bus: &mut EventBus,
    players: impl IntoIterator<Item = &'a mut Player>,
) {
    if ctx.god_mode {
        session.alarms.set(ALARM_WIN_FINISH, WIN_FINISH_DELAY);
        return;
    }
    for player in players {
        if player.hp > 0 {
            player.hp -= 1;
            ctx.score += HP_POINTS;
            bus.emit(GameEvent::HpDrain {
                slot: player.slot,
                score: ctx.score,
            });
            session
                .alarms
                .set(ALARM_WIN_COUNT_HP, WIN_COUNT_CONTINUE_TIME);
            return;
        }
    }
    session.alarms.set(ALARM_WIN_FINISH, WIN_FINISH_DELAY);
}

/// Tally done and the jingle is over: mark the clear and leave the level
fn finish(
    session: &mut LevelSession,
    ctx: &mut SessionContext,
    levelset: &Levelset,
    slots: &mut SaveSlots,
    pending: &mut PendingRoom,
    bus: &mut EventBus,
) {
    let main_area = ctx.main_area.clone().unwrap_or_default();
    ctx.mark_cleared(&main_area);
    ctx.level_cleared = true;
    bus.emit(GameEvent::LevelCleared {
        level_id: main_area.clone(),
    });

    if session.game_won {
        ctx.current_level = Some(0);
        slots.save_game(ctx, levelset);
        bus.emit(GameEvent::GameCompleted);
        pending.0 = Some(RoomRequest::Credits);
        return;
    }

    if ctx.worldmap.is_some() {
        // A finished level may have set up a map unlock
        if let Some(dest) = ctx.map_dest.take() {
            ctx.worldmap = Some(dest);
        }
        if let Some(space) = ctx.map_dest_space.take() {
            ctx.worldmap_space = Some(space);
        }
        slots.save_game(ctx, levelset);
        let map = ctx.worldmap.clone().unwrap_or_default();
        pending.0 = Some(RoomRequest::Worldmap { map });
        return;
    }

    ctx.main_area = None;
    let next = ctx
        .current_level
        .map(|i| i + 1)
        .or_else(|| levelset.index_of(&main_area).map(|i| i + 1))
        .unwrap_or(usize::MAX);
    if next < levelset.levels.len() {
        ctx.current_level = Some(next);
        slots.save_game(ctx, levelset);
        pending.0 = Some(RoomRequest::Load {
            level: levelset.levels[next].clone(),
            spawn: None,
            handoff: None,
        });
    } else {
        ctx.current_level = Some(0);
        slots.save_game(ctx, levelset);
        bus.emit(GameEvent::GameCompleted);
        pending.0 = Some(RoomRequest::Credits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::state::enter_winning;

    struct WinRig {
        session: LevelSession,
        ctx: SessionContext,
        music: MusicDirector,
        bus: EventBus,
        levelset: Levelset,
        slots: SaveSlots,
        pending: PendingRoom,
        players: Vec<Player>,
    }

    impl WinRig {
        fn new(points: i64, timer: i64, hp: i32) -> Self {
            let mut session = LevelSession::default();
            session.points = points;
            let mut ctx = SessionContext::default();
            ctx.main_area = Some("forest1".to_string());
            ctx.set_timer(timer);
            let mut music = MusicDirector::default();
            let mut bus = EventBus::new();
            enter_winning(&mut session, &mut ctx, &mut music, &mut bus);
            let mut player = Player::new(0);
            player.hp = hp;
            Self {
                session,
                ctx,
                music,
                bus,
                levelset: Levelset {
                    id: "winter".to_string(),
                    levels: vec!["forest1".to_string(), "forest2".to_string()],
                    ..Default::default()
                },
                slots: SaveSlots::default(),
                pending: PendingRoom::default(),
                players: vec![player],
            }
        }

        /// Run ticks and alarms until the sequence resolves or the cap hits
        fn run(&mut self, max_ticks: usize) {
            let dt = 1.0 / 60.0;
            for _ in 0..max_ticks {
                if self.pending.0.is_some() {
                    break;
                }
                self.music.tick(dt);
                for name in self.session.alarms.tick(dt) {
                    match name.as_str() {
                        ALARM_WIN_COUNT_POINTS => on_count_points_alarm(&mut self.session),
                        ALARM_WIN_COUNT_TIME => on_count_time_alarm(&mut self.session),
                        ALARM_WIN_COUNT_HP => on_count_hp_alarm(
                            &mut self.session,
                            &mut self.ctx,
                            &mut self.bus,
                            self.players.iter_mut(),
                        ),
                        _ => {}
                    }
                }
                win_tick(
                    &mut self.session,
                    &mut self.ctx,
                    &self.music,
                    &mut self.bus,
                    &self.levelset,
                    &mut self.slots,
                    &mut self.pending,
                    dt,
                );
            }
        }
    }

    #[test]
    fn test_full_sequence_points_time_hp() {
        // points 37, timer -12, hp 3, not cleared, not god
        let mut rig = WinRig::new(37, -12, 3);
        rig.run(5000);

        // 37 banked, the -12 penalty drained to zero for +12, 3 HP at
        // HP_POINTS each
        assert_eq!(rig.ctx.score, 37 + 12 + 3 * HP_POINTS);
        assert_eq!(rig.session.points, 0);
        assert_eq!(rig.ctx.timer(), 0);
        assert_eq!(rig.players[0].hp, 0);
        assert!(rig.ctx.is_cleared("forest1"));
        // Next sequential level requested
        assert_eq!(
            rig.pending.0,
            Some(RoomRequest::Load {
                level: "forest2".to_string(),
                spawn: None,
                handoff: None,
            })
        );
        let drains = rig
            .bus
            .peek()
            .iter()
            .filter(|e| matches!(e.event, GameEvent::HpDrain { .. }))
            .count();
        assert_eq!(drains, 3);
    }

    #[test]
    fn test_god_mode_skips_hp_phase() {
        let mut rig = WinRig::new(10, 0, 3);
        rig.ctx.god_mode = true;
        rig.run(5000);
        assert_eq!(rig.ctx.score, 10);
        assert_eq!(rig.players[0].hp, 3);
        assert!(rig.pending.0.is_some());
    }

    #[test]
    fn test_previously_cleared_level_skips_hp_phase() {
        let mut rig = WinRig::new(0, 0, 3);
        rig.ctx.cleared_levels.push("forest1".to_string());
        rig.run(5000);
        assert_eq!(rig.players[0].hp, 3);
        assert_eq!(rig.ctx.score, 0);
        assert!(rig.pending.0.is_some());
    }

    #[test]
    fn test_positive_time_bonus_adds_to_score() {
        let mut rig = WinRig::new(0, 25, 0);
        rig.run(5000);
        assert_eq!(rig.ctx.score, 25);
        assert_eq!(rig.ctx.timer(), 0);
    }

    #[test]
    fn test_waits_for_victory_jingle() {
        let mut rig = WinRig::new(0, 0, 0);
        rig.ctx.cleared_levels.push("forest1".to_string());
        // Tally finishes fast, but the jingle runs VICTORY_JINGLE_TIME
        rig.run(60);
        assert!(rig.pending.0.is_none());
        rig.run(5000);
        assert!(rig.pending.0.is_some());
    }

    #[test]
    fn test_last_level_rolls_credits() {
        let mut rig = WinRig::new(0, 0, 0);
        rig.ctx.cleared_levels.push("forest1".to_string());
        rig.ctx.main_area = Some("forest2".to_string());
        rig.ctx.set_timer(0);
        rig.ctx.current_level = Some(1);
        rig.run(5000);
        assert_eq!(rig.pending.0, Some(RoomRequest::Credits));
        assert!(
            rig.bus
                .peek()
                .iter()
                .any(|e| matches!(e.event, GameEvent::GameCompleted))
        );
    }

    #[test]
    fn test_game_won_flag_ends_campaign() {
        let mut rig = WinRig::new(0, 0, 0);
        rig.ctx.cleared_levels.push("forest1".to_string());
        rig.session.game_won = true;
        rig.run(5000);
        assert_eq!(rig.pending.0, Some(RoomRequest::Credits));
    }

    #[test]
    fn test_worldmap_return_after_win() {
        let mut rig = WinRig::new(0, 0, 0);
        rig.ctx.cleared_levels.push("forest1".to_string());
        rig.ctx.worldmap = Some("overworld".to_string());
        rig.run(5000);
        assert_eq!(
            rig.pending.0,
            Some(RoomRequest::Worldmap {
                map: "overworld".to_string(),
            })
        );
    }

    #[test]
    fn test_map_unlock_applied_before_leaving() {
        let mut rig = WinRig::new(0, 0, 0);
        rig.ctx.cleared_levels.push("forest1".to_string());
        rig.ctx.worldmap = Some("overworld".to_string());
        rig.ctx.map_dest = Some("highlands".to_string());
        rig.ctx.map_dest_space = Some("h3".to_string());
        rig.run(5000);
        assert_eq!(rig.ctx.worldmap.as_deref(), Some("highlands"));
        assert_eq!(rig.ctx.worldmap_space.as_deref(), Some("h3"));
        assert_eq!(
            rig.pending.0,
            Some(RoomRequest::Worldmap {
                map: "highlands".to_string(),
            })
        );
        assert!(rig.ctx.map_dest.is_none());
    }

    #[test]
    fn test_drain_step_sign_and_clamp() {
        assert_eq!(drain_step(0, 100.0, 1.0), 0);
        assert_eq!(drain_step(5, 100.0, 1.0), 5);
        assert_eq!(drain_step(-5, 100.0, 1.0), -5);
        assert_eq!(drain_step(500, 100.0, 0.5), 50);
        assert_eq!(drain_step(-500, 100.0, 0.5), -50);
        // Tiny dt still makes progress
        assert_eq!(drain_step(500, 100.0, 0.0001), 1);
    }
}

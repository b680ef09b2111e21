//! Timeline command dispatch into the session
//!
//! `SessionHost` implements the interpreter's [`CommandHost`] seam over the
//! live resources and entities. `setattr` and `call` go through a closed
//! whitelist of (entity kind, field/method) pairs; anything outside it is a
//! reported diagnostic or a silent no-op, never arbitrary execution.

use bevy::prelude::*;

use crate::constants::{DEST_MAP, LEVEL_TARGET_ID};
use crate::events::{EventBus, GameEvent};
use crate::levelset::Levelset;
use crate::music::MusicDirector;
use crate::player::{Active, ActorKind, Facing, Freezable, Moves, Player};
use crate::registry::ObjectRegistry;
use crate::save::SaveSlots;
use crate::session::context::SessionContext;
use crate::session::state::{
    LevelSession, PendingRoom, RoomRequest, enter_winning, freeze_for_victory, player_killed,
    trigger_death,
};
use crate::timeline::{CommandHost, TimelineScript, Value};
use crate::warp::RoomHandoff;

/// Everything a timeline command may touch on an entity
pub type ScriptTargetQuery<'w, 's> = Query<
    'w,
    's,
    (
        Entity,
        Option<&'static ActorKind>,
        Option<&'static mut Player>,
        Option<&'static mut Facing>,
        Option<&'static mut Freezable>,
        Option<&'static mut Active>,
        Option<&'static mut Moves>,
        Option<&'static mut Transform>,
    ),
>;

/// [`CommandHost`] over the running session
pub struct SessionHost<'a, 'w, 's, 'w2, 's2> {
    pub session: &'a mut LevelSession,
    pub ctx: &'a mut SessionContext,
    pub registry: &'a mut ObjectRegistry,
    pub music: &'a mut MusicDirector,
    pub bus: &'a mut EventBus,
    pub pending: &'a mut PendingRoom,
    pub slots: &'a mut SaveSlots,
    pub levelset: &'a Levelset,
    pub commands: &'a mut Commands<'w2, 's2>,
    pub targets: &'a mut ScriptTargetQuery<'w, 's>,
}

fn as_number(value: &Value) -> Result<f64, String> {
    value
        .as_num()
        .ok_or_else(|| format!("expected a number, got '{}'", value))
}

impl SessionHost<'_, '_, '_, '_, '_> {
    fn resolve(&mut self, id: &str) -> Option<Entity> {
        let targets = &self.targets;
        self.registry.resolve(id, |entity| targets.contains(entity))
    }

    fn kill_entity(&mut self, entity: Entity) {
        if let Ok((_, _, player, ..)) = self.targets.get_mut(entity)
            && let Some(player) = player
        {
            player_killed(self.session, self.ctx, self.music, self.bus, &player);
        }
        self.commands.entity(entity).despawn();
    }
}

impl CommandHost for SessionHost<'_, '_, '_, '_, '_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        match name {
            "score" => Some(Value::Num(self.ctx.score as f64)),
            "points" => Some(Value::Num(self.session.points as f64)),
            "time_bonus" => Some(Value::Num(self.ctx.timer() as f64)),
            "cleared" => {
                let main_area = self.ctx.main_area.as_deref().unwrap_or_default();
                Some(Value::Bool(self.ctx.is_cleared(main_area)))
            }
            "god" => Some(Value::Bool(self.ctx.god_mode)),
            _ => self.ctx.script_vars.get(name).cloned(),
        }
    }

    fn assign(&mut self, name: &str, value: Value) {
        self.ctx.script_vars.insert(name.to_string(), value);
    }

    fn set_field(&mut self, target: &str, field: &str, value: Value) -> Result<(), String> {
        if target == LEVEL_TARGET_ID {
            match field {
                "points" => self.session.points = as_number(&value)? as i64,
                "time_bonus" => {
                    let bonus = as_number(&value)? as i64;
                    self.session.time_bonus = bonus;
                    // A restart in the main area hands this back out
                    if self.ctx.main_area.as_deref() == Some(self.session.fname.as_str()) {
                        self.ctx.level_time_bonus = bonus;
                    }
                }
                "game_won" => self.session.game_won = value.truthy(),
                "spawn" => self.session.spawn = Some(value.to_string()),
                "map_dest" => self.ctx.map_dest = Some(value.to_string()),
                "map_dest_space" => self.ctx.map_dest_space = Some(value.to_string()),
                _ => return Err(format!("the level has no scriptable field '{}'", field)),
            }
            return Ok(());
        }

        // A vanished or unknown object is a silent no-op
        let Some(entity) = self.resolve(target) else {
            return Ok(());
        };
        let Ok((_, kind, player, facing, freezable, active, _, transform)) =
            self.targets.get_mut(entity)
        else {
            return Ok(());
        };
        match (field, player, facing, freezable, active, transform) {
            ("hp", Some(mut player), ..) => player.hp = as_number(&value)? as i32,
            ("human", Some(mut player), ..) => player.human = value.truthy(),
            ("lose_on_death", Some(mut player), ..) => player.lose_on_death = value.truthy(),
            ("facing", _, Some(mut facing), ..) => {
                facing.0 = if as_number(&value)? < 0.0 { -1 } else { 1 }
            }
            ("frozen", _, _, Some(mut freezable), ..) => freezable.frozen = value.truthy(),
            ("active", _, _, _, Some(mut active), _) => active.0 = value.truthy(),
            ("x", .., Some(mut transform)) => {
                transform.translation.x = as_number(&value)? as f32
            }
            ("y", .., Some(mut transform)) => {
                transform.translation.y = as_number(&value)? as f32
            }
            _ => {
                let kind = match kind {
                    Some(ActorKind::Player) => "player",
                    Some(ActorKind::Creature) => "creature",
                    Some(ActorKind::Prop) => "prop",
                    None => "object",
                };
                return Err(format!("{} '{}' has no scriptable field '{}'", kind, target, field));
            }
        }
        Ok(())
    }

    fn call_method(&mut self, target: &str, method: &str, args: &[Value]) {
        if target == LEVEL_TARGET_ID {
            match method {
                "die" => trigger_death(self.session, self.ctx, self.music, self.bus),
                "win_level" => {
                    let walk = args.first().map(Value::truthy).unwrap_or(true);
                    if enter_winning(self.session, self.ctx, self.music, self.bus) {
                        for (_, _, player, facing, _, _, moves, _) in self.targets.iter_mut() {
                            if let (Some(mut player), Some(facing), Some(mut moves)) =
                                (player, facing, moves)
                            {
                                freeze_for_victory(&mut player, &mut moves, &facing, walk);
                            }
                        }
                    }
                }
                "win_game" => {
                    self.ctx.current_level = Some(0);
                    self.slots.save_game(self.ctx, self.levelset);
                    self.bus.emit(GameEvent::GameCompleted);
                    self.pending.0 = Some(RoomRequest::Credits);
                }
                "return_to_map" => {
                    self.slots.save_game(self.ctx, self.levelset);
                    self.pending.0 = Some(match self.ctx.worldmap.clone() {
                        Some(map) => RoomRequest::Worldmap { map },
                        None => RoomRequest::Title,
                    });
                }
                "warp" => {
                    // Scripted warps move the session; object hand-off only
                    // happens for door warps, but unbanked points still
                    // travel
                    if let Some(Value::Str(dest)) = args.first() {
                        if dest.as_str() == DEST_MAP {
                            self.slots.save_game(self.ctx, self.levelset);
                            self.pending.0 = Some(match self.ctx.worldmap.clone() {
                                Some(map) => RoomRequest::Worldmap { map },
                                None => RoomRequest::Title,
                            });
                            return;
                        }
                        let main_area = self.ctx.main_area.clone().unwrap_or_default();
                        let (level, spawn) =
                            crate::warp::resolve(dest, &self.session.fname, &main_area);
                        let handoff = RoomHandoff {
                            points: self.session.points,
                            players: Vec::new(),
                        };
                        self.bus.emit(GameEvent::WarpTaken {
                            level_id: level.clone(),
                            spawn_id: spawn.clone(),
                        });
                        self.pending.0 = Some(RoomRequest::Load {
                            level,
                            spawn: (!spawn.is_empty()).then_some(spawn),
                            handoff: Some(handoff),
                        });
                    }
                }
                "checkpoint" => {
                    if let Some(Value::Str(dest)) = args.first() {
                        crate::warp::touch_checkpoint(self.ctx, self.bus, dest);
                    }
                }
                _ => {}
            }
            return;
        }

        let Some(entity) = self.resolve(target) else {
            return;
        };
        match method {
            "hurt" => {
                let damage = args
                    .first()
                    .and_then(Value::as_num)
                    .map(|n| n as i32)
                    .unwrap_or(1);
                let mut dead = false;
                if let Ok((_, _, Some(mut player), ..)) = self.targets.get_mut(entity) {
                    if !self.ctx.god_mode {
                        player.hp -= damage;
                    }
                    dead = player.hp <= 0;
                }
                if dead {
                    self.kill_entity(entity);
                }
            }
            "kill" => self.kill_entity(entity),
            "freeze" => {
                if let Ok((_, _, _, _, Some(mut freezable), ..)) = self.targets.get_mut(entity) {
                    freezable.frozen = true;
                }
            }
            "unfreeze" => {
                if let Ok((_, _, _, _, Some(mut freezable), ..)) = self.targets.get_mut(entity) {
                    freezable.frozen = false;
                }
            }
            _ => {}
        }
    }

    fn dialog(&mut self, portrait: &str, text: &str) {
        self.bus.emit(GameEvent::Dialog {
            portrait: portrait.to_string(),
            text: text.to_string(),
        });
    }

    fn play_music(&mut self, name: &str) {
        self.session.music = Some(name.to_string());
        self.music.play(name, self.bus);
    }

    fn fetch_script(&mut self, name: &str) -> Result<TimelineScript, String> {
        TimelineScript::load(name)
    }

    fn is_watched(&self, name: &str) -> bool {
        self.ctx.is_watched(name)
    }

    fn mark_watched(&mut self, name: &str) {
        self.ctx.mark_watched(name);
    }

    fn script_error(&mut self, context: &str, message: &str) {
        warn!("Timeline '{}' error: {}", context, message);
        self.bus.emit(GameEvent::ScriptError {
            context: context.to_string(),
            message: message.to_string(),
        });
    }
}

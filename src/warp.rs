//! Warps, checkpoints, and cross-room hand-off
//!
//! Destinations are written as `"level:spawn"`, a bare spawn in the current
//! level, `"__map__"` (back to the overworld), or `"__main__"` (the
//! session's canonical main area, so sub-rooms funnel scoring back to one
//! place). Malformed destinations degrade to a same-level spawn rather than
//! aborting.

use bevy::prelude::*;

use crate::constants::{DEST_MAIN, DEST_MAP};
use crate::events::{EventBus, GameEvent};
use crate::levelset::Levelset;
use crate::player::{Facing, Holding, Player, RoomScoped};
use crate::save::SaveSlots;
use crate::session::{LevelSession, PendingRoom, RoomRequest, SessionContext};

/// Resolve a destination string to `(level, spawn)`.
///
/// `"__main__"` is substituted with the main area id before parsing, so
/// `"__main__"` behaves exactly like the literal area id in its place.
pub fn resolve(dest: &str, current_level: &str, main_area: &str) -> (String, String) {
    let dest = dest.replace(DEST_MAIN, main_area);
    match dest.split_once(':') {
        Some((level, spawn)) if !level.is_empty() => (level.to_string(), spawn.to_string()),
        Some((_, spawn)) => (current_level.to_string(), spawn.to_string()),
        None => (current_level.to_string(), dest),
    }
}

/// A checkpoint object in the room.
///
/// `active` mirrors whether the ledger currently points at this
/// checkpoint's destination; the refresh system keeps it honest.
#[derive(Component, Debug, Clone)]
pub struct Checkpoint {
    pub dest: String,
    pub active: bool,
}

impl Checkpoint {
    /// Bare destinations are normalized to `room:dest` at spawn time
    pub fn new(room: &str, dest: &str) -> Self {
        let dest = if dest.contains(':') {
            dest.to_string()
        } else {
            format!("{}:{}", room, dest)
        };
        Self {
            dest,
            active: false,
        }
    }
}

/// A player touched a checkpoint: the ledger entry for the current main
/// area is overwritten unconditionally.
pub fn touch_checkpoint(ctx: &mut SessionContext, bus: &mut EventBus, dest: &str) {
    let Some(area) = ctx.main_area.clone() else {
        return;
    };
    ctx.checkpoints.insert(area.clone(), Some(dest.to_string()));
    bus.emit(GameEvent::CheckpointTouched {
        level_id: area,
        dest: dest.to_string(),
    });
}

/// System: re-evaluate every checkpoint's active state against the ledger
pub fn refresh_checkpoints(ctx: Res<SessionContext>, mut query: Query<&mut Checkpoint>) {
    let current = ctx.checkpoint();
    for mut checkpoint in &mut query {
        let active = current.as_deref() == Some(checkpoint.dest.as_str());
        if checkpoint.active != active {
            checkpoint.active = active;
        }
    }
}

/// What one player carries across a room switch; matching is by slot
/// index, not identity
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerCarry {
    pub slot: usize,
    pub hp: i32,
    pub facing: i8,
    pub held: Option<Entity>,
}

/// State handed from an outgoing room to its replacement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoomHandoff {
    /// Unbanked points transfer rather than vanish
    pub points: i64,
    pub players: Vec<PlayerCarry>,
}

/// Capture hand-off state from the outgoing room
pub fn build_handoff(world: &mut World) -> RoomHandoff {
    let points = world.resource::<LevelSession>().points;
    let mut players = Vec::new();
    let mut query = world.query::<(&Player, &Facing, Option<&Holding>)>();
    for (player, facing, holding) in query.iter(world) {
        players.push(PlayerCarry {
            slot: player.slot,
            hp: player.hp,
            facing: facing.0,
            held: holding.map(|h| h.0),
        });
    }
    players.sort_by_key(|c| c.slot);
    RoomHandoff { points, players }
}

/// Detach carried items from the outgoing room so teardown spares them.
/// Must run before the old room's entities despawn.
pub fn detach_carried(world: &mut World, handoff: &RoomHandoff) {
    for carry in &handoff.players {
        if let Some(item) = carry.held {
            if let Ok(mut entity) = world.get_entity_mut(item) {
                entity.remove::<RoomScoped>();
            }
        }
    }
}

/// Apply hand-off state to the freshly spawned room: players matched by
/// slot get their HP, facing, and held item back; unbanked points land in
/// the new session's counter.
pub fn apply_handoff(world: &mut World, handoff: &RoomHandoff) {
    world.resource_mut::<LevelSession>().points += handoff.points;

    let mut attach = Vec::new();
    let mut query = world.query::<(Entity, &mut Player, &mut Facing)>();
    for (entity, mut player, mut facing) in query.iter_mut(world) {
        if let Some(carry) = handoff.players.iter().find(|c| c.slot == player.slot) {
            player.hp = carry.hp;
            facing.0 = carry.facing;
            if let Some(item) = carry.held {
                attach.push((entity, item));
            }
        }
    }
    for (holder, item) in attach {
        if world.get_entity(item).is_err() {
            continue;
        }
        world.entity_mut(item).insert(RoomScoped);
        world.entity_mut(holder).insert(Holding(item));
    }
}

/// Take a warp: capture the hand-off, detach carried items, and park the
/// room change for the loader. `"__map__"` becomes a worldmap return.
pub fn take_warp(world: &mut World, dest: &str) {
    if dest == DEST_MAP {
        return_to_map(world, true);
        return;
    }
    let (fname, main_area) = {
        let session = world.resource::<LevelSession>();
        let ctx = world.resource::<SessionContext>();
        (
            session.fname.clone(),
            ctx.main_area.clone().unwrap_or_default(),
        )
    };
    let (level, spawn) = resolve(dest, &fname, &main_area);
    let handoff = build_handoff(world);
    detach_carried(world, &handoff);
    world.resource_mut::<EventBus>().emit(GameEvent::WarpTaken {
        level_id: level.clone(),
        spawn_id: spawn.clone(),
    });
    let spawn = (!spawn.is_empty()).then_some(spawn);
    world.resource_mut::<PendingRoom>().0 = Some(RoomRequest::Load {
        level,
        spawn,
        handoff: Some(handoff),
    });
}

/// Head back to the overworld, saving first. `completed` applies the
/// pending map destination a finished level set up.
pub fn return_to_map(world: &mut World, completed: bool) {
    {
        let mut ctx = world.resource_mut::<SessionContext>();
        if completed {
            if let Some(dest) = ctx.map_dest.take() {
                ctx.worldmap = Some(dest);
            }
            if let Some(space) = ctx.map_dest_space.take() {
                ctx.worldmap_space = Some(space);
            }
        }
        ctx.map_dest = None;
        ctx.map_dest_space = None;
    }
    save_and_request(world, |ctx| match ctx.worldmap.clone() {
        Some(map) => RoomRequest::Worldmap { map },
        None => RoomRequest::Title,
    });
}

/// A room failed to load: force a full save and fall back to the title
/// screen rather than crashing the session.
pub fn warp_failed(world: &mut World, error: &str) {
    error!("Room load failed: {}", error);
    world.resource_mut::<EventBus>().emit(GameEvent::LoadError {
        message: error.to_string(),
    });
    world.resource_scope(|world, mut slots: Mut<SaveSlots>| {
        world.resource_scope(|world, mut ctx: Mut<SessionContext>| {
            let levelset = world.resource::<Levelset>().clone();
            let mut session = world.resource_mut::<LevelSession>();
            crate::save::quick_exit_save(&mut ctx, &mut session, &levelset, &mut slots);
        });
    });
    world.resource_mut::<PendingRoom>().0 = Some(RoomRequest::Title);
}

fn save_and_request(world: &mut World, request: impl FnOnce(&SessionContext) -> RoomRequest) {
    world.resource_scope(|world, mut slots: Mut<SaveSlots>| {
        world.resource_scope(|world, ctx: Mut<SessionContext>| {
            let levelset = world.resource::<Levelset>();
            slots.save_game(&ctx, levelset);
            world.resource_mut::<PendingRoom>().0 = Some(request(&ctx));
        });
    });
}

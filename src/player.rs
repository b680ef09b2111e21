//! Entity components for session-visible objects
//!
//! Physics and rendering live in collaborator crates; this module only
//! carries the state the timeline interpreter and the session state machine
//! read and write. Behavior is composed from small capability components on
//! a tagged [`ActorKind`] rather than a type hierarchy.

use bevy::prelude::*;

/// What kind of scripted object an entity is.
///
/// The interpreter's setattr/call whitelist dispatches on this tag.
#[derive(Component, Clone, Copy, PartialEq, Eq, Debug)]
pub enum ActorKind {
    Player,
    Creature,
    Prop,
}

/// A player in the session
#[derive(Component, Debug)]
pub struct Player {
    /// Slot index; hand-off across rooms matches on this, not identity
    pub slot: usize,
    pub hp: i32,
    /// True while driven by human input
    pub human: bool,
    /// Whether this player's death ends the session
    pub lose_on_death: bool,
}

impl Player {
    pub fn new(slot: usize) -> Self {
        Self {
            slot,
            hp: 3,
            human: true,
            lose_on_death: true,
        }
    }
}

/// Direction an actor faces (-1 = left, 1 = right)
#[derive(Component, Debug, Clone, Copy)]
pub struct Facing(pub i8);

impl Default for Facing {
    fn default() -> Self {
        Self(1)
    }
}

/// Movement capability; the victory walk forces `walk_dir`
#[derive(Component, Debug, Default)]
pub struct Moves {
    /// Forced walk direction; None while under normal control
    pub walk_dir: Option<i8>,
}

/// Can be frozen in place by scripts
#[derive(Component, Debug, Default)]
pub struct Freezable {
    pub frozen: bool,
}

/// Participates in update scheduling; scripts can deactivate
#[derive(Component, Debug)]
pub struct Active(pub bool);

impl Default for Active {
    fn default() -> Self {
        Self(true)
    }
}

/// Reference to a held item entity
#[derive(Component, Debug)]
pub struct Holding(pub Entity);

/// Marker: despawned on room teardown.
///
/// Carried items lose this during hand-off so they survive the room switch.
#[derive(Component)]
pub struct RoomScoped;

//! Object registry - timeline script IDs to live entities
//!
//! Timeline commands address objects by the string ID declared in level
//! data. The registry is a non-owning table from ID to `Entity`; entries for
//! despawned entities are pruned lazily on lookup, so a stale ID simply
//! resolves to nothing and the command no-ops.
//!
//! The ID `"__level__"` is reserved for the session itself and never stored
//! here.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::constants::LEVEL_TARGET_ID;

/// Declared timeline ID for an entity, picked up by
/// [`register_timeline_objects`]
#[derive(Component, Debug, Clone)]
pub struct ScriptId(pub String);

/// ID -> entity table for timeline lookups
#[derive(Resource, Debug, Default)]
pub struct ObjectRegistry {
    entries: HashMap<String, Entity>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity under an ID. No-op for the reserved session ID.
    pub fn register(&mut self, id: &str, entity: Entity) {
        if id == LEVEL_TARGET_ID {
            warn!("Refusing to register an object as {}", LEVEL_TARGET_ID);
            return;
        }
        self.entries.insert(id.to_string(), entity);
    }

    /// Look up an ID, pruning the entry if its entity is no longer alive.
    ///
    /// `alive` is the liveness check; systems pass a closure over their
    /// query, tests pass a closure over a `World`.
    pub fn resolve(&mut self, id: &str, alive: impl Fn(Entity) -> bool) -> Option<Entity> {
        match self.entries.get(id) {
            Some(&entity) if alive(entity) => Some(entity),
            Some(_) => {
                self.entries.remove(id);
                None
            }
            None => None,
        }
    }

    /// Drop every entry (room teardown)
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// System: register newly added script IDs (`add_timeline_object`)
pub fn register_timeline_objects(
    mut registry: ResMut<ObjectRegistry>,
    query: Query<(Entity, &ScriptId), Added<ScriptId>>,
) {
    for (entity, id) in &query {
        registry.register(&id.0, entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_live_entity() {
        let mut world = World::new();
        let e = world.spawn_empty().id();
        let mut registry = ObjectRegistry::new();
        registry.register("guide", e);
        let found = registry.resolve("guide", |ent| world.get_entity(ent).is_ok());
        assert_eq!(found, Some(e));
    }

    #[test]
    fn test_prunes_dead_entity() {
        let mut world = World::new();
        let e = world.spawn_empty().id();
        let mut registry = ObjectRegistry::new();
        registry.register("guide", e);
        world.despawn(e);
        let found = registry.resolve("guide", |ent| world.get_entity(ent).is_ok());
        assert_eq!(found, None);
        // Entry was pruned, not just hidden
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reserved_id_rejected() {
        let mut world = World::new();
        let e = world.spawn_empty().id();
        let mut registry = ObjectRegistry::new();
        registry.register(LEVEL_TARGET_ID, e);
        assert!(registry.is_empty());
    }
}

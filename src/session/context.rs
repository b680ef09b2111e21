//! Session-wide mutable state
//!
//! Score, per-area timers, progress lists, and the checkpoint ledger live
//! in one explicit resource handed by reference through the interpreter,
//! the state machine, and the persistence bridge, with a defined new-game
//! and session-end lifecycle.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::levelset::Levelset;
use crate::timeline::Value;

/// Process-wide session state, created at "new game" and torn down at
/// session end
#[derive(Resource, Debug, Default)]
pub struct SessionContext {
    pub score: i64,
    /// Remaining time bonus (negative = penalty) per main area
    pub level_timers: HashMap<String, i64>,
    /// Main areas cleared at least once on this save
    pub cleared_levels: Vec<String>,
    /// Collectible relics found, by main area
    pub relics_found: Vec<String>,
    /// Main areas known to contain a relic (rebuilt per levelset, not saved)
    pub relics_available: Vec<String>,
    /// Scripts that have fully run at least once
    pub watched_timelines: Vec<String>,
    /// Main area -> last touched checkpoint destination
    pub checkpoints: HashMap<String, Option<String>>,
    /// Current overworld map and position on it
    pub worldmap: Option<String>,
    pub worldmap_space: Option<String>,
    /// Map destination a finished level will unlock (transient)
    pub map_dest: Option<String>,
    pub map_dest_space: Option<String>,
    /// Index into the levelset's sequential level list
    pub current_level: Option<usize>,
    /// Canonical scoring area for the room being played
    pub main_area: Option<String>,
    /// Configured starting bonus of the current main area
    pub level_time_bonus: i64,
    /// Whether any level was cleared since the last worldmap visit
    pub level_cleared: bool,
    pub god_mode: bool,
    /// Variables owned by timeline `exec` assignments
    pub script_vars: HashMap<String, Value>,
}

impl SessionContext {
    /// Reset to a fresh game on the given levelset
    pub fn new_game(&mut self, levelset: &Levelset) {
        *self = Self {
            god_mode: self.god_mode,
            worldmap: levelset.worldmap.clone(),
            ..Self::default()
        };
    }

    /// Session teardown; drops per-session state but keeps nothing live
    pub fn end_session(&mut self) {
        *self = Self {
            god_mode: self.god_mode,
            ..Self::default()
        };
    }

    /// Remaining time bonus for the current main area
    pub fn timer(&self) -> i64 {
        self.main_area
            .as_ref()
            .and_then(|area| self.level_timers.get(area))
            .copied()
            .unwrap_or(0)
    }

    /// Adjust the current main area's timer by `amount`
    pub fn add_timer(&mut self, amount: i64) {
        if let Some(area) = self.main_area.clone() {
            *self.level_timers.entry(area).or_insert(0) += amount;
        }
    }

    pub fn set_timer(&mut self, value: i64) {
        if let Some(area) = self.main_area.clone() {
            self.level_timers.insert(area, value);
        }
    }

    pub fn is_cleared(&self, area: &str) -> bool {
        self.cleared_levels.iter().any(|a| a == area)
    }

    pub fn mark_cleared(&mut self, area: &str) {
        if !self.is_cleared(area) {
            self.cleared_levels.push(area.to_string());
        }
    }

    pub fn is_watched(&self, name: &str) -> bool {
        self.watched_timelines.iter().any(|n| n == name)
    }

    pub fn mark_watched(&mut self, name: &str) {
        if !self.is_watched(name) {
            self.watched_timelines.push(name.to_string());
        }
    }

    /// Last checkpoint destination for the current main area
    pub fn checkpoint(&self) -> Option<String> {
        self.main_area
            .as_ref()
            .and_then(|area| self.checkpoints.get(area))
            .cloned()
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_game_keeps_god_mode() {
        let mut ctx = SessionContext {
            score: 500,
            god_mode: true,
            ..Default::default()
        };
        ctx.cleared_levels.push("forest1".to_string());
        let levelset = Levelset {
            worldmap: Some("overworld".to_string()),
            ..Default::default()
        };
        ctx.new_game(&levelset);
        assert_eq!(ctx.score, 0);
        assert!(ctx.cleared_levels.is_empty());
        assert!(ctx.god_mode);
        assert_eq!(ctx.worldmap.as_deref(), Some("overworld"));
    }

    #[test]
    fn test_timer_tracks_main_area() {
        let mut ctx = SessionContext::default();
        assert_eq!(ctx.timer(), 0);
        ctx.main_area = Some("forest1".to_string());
        ctx.add_timer(-20);
        assert_eq!(ctx.timer(), -20);
        ctx.set_timer(300);
        assert_eq!(ctx.timer(), 300);
    }

    #[test]
    fn test_watched_is_append_only_set() {
        let mut ctx = SessionContext::default();
        ctx.mark_watched("intro");
        ctx.mark_watched("intro");
        assert_eq!(ctx.watched_timelines.len(), 1);
        assert!(ctx.is_watched("intro"));
    }
}

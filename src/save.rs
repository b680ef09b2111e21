//! Persistent save slots
//!
//! Saves and loads session progress to/from a save_slots.json file in the
//! config directory. Every field default-substitutes when missing, so old
//! or hand-edited saves degrade instead of failing; a slot with no levelset
//! is unusable and excluded from "continue".

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{SAVE_SLOT_COUNT, SAVE_SLOTS_FILE};
use crate::levelset::Levelset;
use crate::session::{LevelSession, SessionContext};

/// One save slot's persisted progress
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveSlot {
    /// Levelset id; a slot without one cannot be continued
    #[serde(default)]
    pub levelset: Option<String>,
    #[serde(default)]
    pub level_timers: HashMap<String, i64>,
    #[serde(default)]
    pub cleared_levels: Vec<String>,
    #[serde(default)]
    pub relics_found: Vec<String>,
    #[serde(default)]
    pub watched_timelines: Vec<String>,
    #[serde(default)]
    pub worldmap: Option<String>,
    #[serde(default)]
    pub worldmap_space: Option<String>,
    #[serde(default)]
    pub current_level: Option<usize>,
    #[serde(default)]
    pub checkpoints: HashMap<String, Option<String>>,
    #[serde(default)]
    pub score: i64,
    /// 0-100; 0 and 100 are reserved for true start/completion
    #[serde(default)]
    pub completion: u8,
    /// ISO 8601 timestamp of the save
    #[serde(default)]
    pub saved_at: String,
}

impl SaveSlot {
    /// Whether this slot can appear under "continue"
    pub fn is_continuable(&self) -> bool {
        self.levelset.is_some()
    }
}

/// All save slots plus which one the session writes to
#[derive(Resource, Debug)]
pub struct SaveSlots {
    pub slots: Vec<Option<SaveSlot>>,
    /// Slot the running session saves into; None disables saving
    pub current: Option<usize>,
    path: PathBuf,
}

impl Default for SaveSlots {
    fn default() -> Self {
        Self {
            slots: vec![None; SAVE_SLOT_COUNT],
            current: None,
            path: PathBuf::from(SAVE_SLOTS_FILE),
        }
    }
}

impl SaveSlots {
    /// Load slots from file, or return empties if the file doesn't exist
    pub fn load() -> Self {
        Self::load_from(Path::new(SAVE_SLOTS_FILE))
    }

    /// Load slots from an explicit path (tests and tools)
    pub fn load_from(path: &Path) -> Self {
        let mut slots = Self {
            path: path.to_path_buf(),
            ..Self::default()
        };
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<Vec<Option<SaveSlot>>>(&content) {
                Ok(loaded) => {
                    for (i, slot) in loaded.into_iter().take(SAVE_SLOT_COUNT).enumerate() {
                        slots.slots[i] = slot;
                    }
                }
                Err(e) => {
                    warn!("Failed to parse {}: {}, using empty slots", path.display(), e);
                }
            },
            Err(_) => {
                info!("No save file at {}, starting fresh", path.display());
            }
        }
        slots
    }

    /// Write all slots to disk
    pub fn write_to_disk(&self) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(&self.slots)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, json)
    }

    /// Snapshot the session into the current slot and write to disk
    pub fn save_game(&mut self, ctx: &SessionContext, levelset: &Levelset) {
        let Some(index) = self.current else {
            return;
        };
        let slot = SaveSlot {
            levelset: Some(levelset.id.clone()),
            level_timers: ctx.level_timers.clone(),
            cleared_levels: ctx.cleared_levels.clone(),
            relics_found: ctx.relics_found.clone(),
            watched_timelines: ctx.watched_timelines.clone(),
            worldmap: ctx.worldmap.clone(),
            worldmap_space: ctx.worldmap_space.clone(),
            current_level: ctx.current_level,
            checkpoints: ctx.checkpoints.clone(),
            score: ctx.score,
            completion: completion_percent(ctx, levelset),
            saved_at: chrono::Utc::now().to_rfc3339(),
        };
        if index < self.slots.len() {
            self.slots[index] = Some(slot);
        }
        if let Err(e) = self.write_to_disk() {
            warn!("Failed to write save slots: {}", e);
        }
    }

    /// Restore a slot into the session context. Returns the levelset id to
    /// load, or None when the slot cannot be continued (caller starts a new
    /// game instead).
    pub fn load_game(&self, index: usize, ctx: &mut SessionContext) -> Option<String> {
        let slot = self.slots.get(index)?.as_ref()?;
        let levelset_id = slot.levelset.clone()?;
        ctx.level_timers = slot.level_timers.clone();
        ctx.cleared_levels = slot.cleared_levels.clone();
        ctx.relics_found = slot.relics_found.clone();
        ctx.watched_timelines = slot.watched_timelines.clone();
        ctx.worldmap = slot.worldmap.clone();
        ctx.worldmap_space = slot.worldmap_space.clone();
        ctx.current_level = slot.current_level;
        ctx.checkpoints = slot.checkpoints.clone();
        ctx.score = slot.score;
        Some(levelset_id)
    }
}

/// Completion percentage for a save. 0 and 100 are reserved for a true
/// start and a true finish; anything in between clamps to 1-99.
pub fn completion_percent(ctx: &SessionContext, levelset: &Levelset) -> u8 {
    let total = levelset.levels.len() + ctx.relics_available.len();
    if total == 0 {
        return 100;
    }
    let done = ctx.cleared_levels.len() + ctx.relics_found.len();
    let pct = (100 * done / total) as u8;
    if pct == 0 && done > 0 {
        1
    } else if pct >= 100 && done < total {
        99
    } else {
        pct.min(100)
    }
}

/// Fold in-flight progress into the score and save before leaving
/// mid-level (quit, or a failed room load).
pub fn quick_exit_save(
    ctx: &mut SessionContext,
    session: &mut LevelSession,
    levelset: &Levelset,
    slots: &mut SaveSlots,
) {
    if let Some(main_area) = ctx.main_area.clone() {
        if ctx.cleared_levels.is_empty() && ctx.checkpoint().is_none() {
            ctx.set_timer(ctx.level_time_bonus);
        }
        if session.won() {
            ctx.score += session.points;
            session.points = 0;
            ctx.mark_cleared(&main_area);
        }
        if session.won() || ctx.timer() < 0 {
            ctx.score += ctx.timer();
            ctx.set_timer(0);
        }
    }
    slots.save_game(ctx, levelset);
    ctx.main_area = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with_progress() -> (SessionContext, Levelset) {
        let mut ctx = SessionContext::default();
        ctx.main_area = Some("forest1".to_string());
        ctx.score = 1200;
        ctx.cleared_levels.push("forest1".to_string());
        let levelset = Levelset {
            id: "winter".to_string(),
            levels: vec![
                "forest1".to_string(),
                "forest2".to_string(),
                "summit".to_string(),
            ],
            ..Default::default()
        };
        (ctx, levelset)
    }

    #[test]
    fn test_completion_reserves_endpoints() {
        let (mut ctx, levelset) = ctx_with_progress();
        // 1 of 3 cleared
        assert_eq!(completion_percent(&ctx, &levelset), 33);

        ctx.cleared_levels.clear();
        assert_eq!(completion_percent(&ctx, &levelset), 0);

        // Tiny progress on a huge set still shows as started
        ctx.relics_available = (0..200).map(|i| format!("area{}", i)).collect();
        ctx.relics_found.push("area0".to_string());
        assert_eq!(completion_percent(&ctx, &levelset), 1);

        // Everything cleared but one relic missing stays at 99
        let mut ctx = SessionContext::default();
        ctx.cleared_levels = levelset.levels.clone();
        ctx.relics_available = vec!["forest1".to_string()];
        assert_eq!(completion_percent(&ctx, &levelset), 75);
        ctx.relics_found = vec!["forest1".to_string()];
        assert_eq!(completion_percent(&ctx, &levelset), 100);
    }

    #[test]
    fn test_slot_roundtrip_through_disk() {
        let (ctx, levelset) = ctx_with_progress();
        let dir = std::env::temp_dir().join("frostrun_save_test");
        let path = dir.join("save_slots.json");
        let _ = fs::remove_file(&path);

        let mut slots = SaveSlots::load_from(&path);
        slots.current = Some(1);
        slots.save_game(&ctx, &levelset);

        let reloaded = SaveSlots::load_from(&path);
        let mut restored = SessionContext::default();
        let levelset_id = reloaded.load_game(1, &mut restored).unwrap();
        assert_eq!(levelset_id, "winter");
        assert_eq!(restored.score, 1200);
        assert_eq!(restored.cleared_levels, vec!["forest1".to_string()]);
        assert!(reloaded.slots[0].is_none());
    }

    #[test]
    fn test_slot_without_levelset_not_continuable() {
        let slot = SaveSlot::default();
        assert!(!slot.is_continuable());
        let slots = SaveSlots::default();
        let mut ctx = SessionContext::default();
        assert!(slots.load_game(0, &mut ctx).is_none());
    }

    #[test]
    fn test_missing_fields_default() {
        let json = r#"[{"levelset": "winter", "score": 50}, null]"#;
        let parsed: Vec<Option<SaveSlot>> = serde_json::from_str(json).unwrap();
        let slot = parsed[0].as_ref().unwrap();
        assert_eq!(slot.score, 50);
        assert!(slot.cleared_levels.is_empty());
        assert!(slot.checkpoints.is_empty());
        assert!(slot.is_continuable());
    }

    #[test]
    fn test_quick_exit_banks_won_points() {
        let (mut ctx, levelset) = ctx_with_progress();
        let mut session = LevelSession::default();
        session.points = 40;
        session.phase = crate::session::SessionPhase::Winning;
        let mut slots = SaveSlots::default();
        quick_exit_save(&mut ctx, &mut session, &levelset, &mut slots);
        assert_eq!(ctx.score, 1240);
        assert_eq!(session.points, 0);
        assert!(ctx.main_area.is_none());
    }

    #[test]
    fn test_quick_exit_first_attempt_resets_timer() {
        let mut ctx = SessionContext::default();
        ctx.main_area = Some("forest1".to_string());
        ctx.level_time_bonus = 300;
        ctx.set_timer(120);
        let levelset = Levelset::default();
        let mut session = LevelSession::default();
        let mut slots = SaveSlots::default();
        quick_exit_save(&mut ctx, &mut session, &levelset, &mut slots);
        assert_eq!(ctx.level_timers.get("forest1"), Some(&300));
    }
}

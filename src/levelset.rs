//! Levelset definitions
//!
//! A levelset names the sequential levels of a campaign plus its overworld
//! map. Loaded from TOML; the tilemaps themselves are the room loader's
//! business.

use bevy::prelude::*;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::constants::LEVELSET_DIR;

/// The active campaign's level list
#[derive(Resource, Debug, Clone, Default, Deserialize)]
pub struct Levelset {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Sequential main areas, in play order
    #[serde(default)]
    pub levels: Vec<String>,
    /// Overworld map id, if the campaign has one
    pub worldmap: Option<String>,
}

impl Levelset {
    /// Load a levelset by id from the asset directory
    pub fn load(id: &str) -> Result<Self, String> {
        let path = Path::new(LEVELSET_DIR).join(format!("{}.toml", id));
        let content = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        let mut set: Levelset = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;
        if set.id.is_empty() {
            set.id = id.to_string();
        }
        Ok(set)
    }

    /// Whether an area is one of the sequential levels
    pub fn contains(&self, area: &str) -> bool {
        self.levels.iter().any(|l| l == area)
    }

    /// Position of an area in the sequence
    pub fn index_of(&self, area: &str) -> Option<usize> {
        self.levels.iter().position(|l| l == area)
    }
}

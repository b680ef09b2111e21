//! Timeline program storage and script loading
//!
//! A program maps fractional step numbers to ordered queues of raw command
//! lines. Scripts live on disk as TOML under `assets/timelines/` and are
//! loaded by name when a level starts or a `timeline` command switches
//! programs.

use bevy::prelude::*;
use serde::Deserialize;
use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::Path;

use crate::constants::TIMELINE_DIR;

/// Step number with a total order, usable as a map key
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step(pub f32);

impl Eq for Step {}

impl PartialOrd for Step {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Step {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// On-disk timeline script
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimelineScript {
    #[serde(default)]
    pub step: Vec<ScriptStep>,
}

/// One step entry in a script file
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptStep {
    pub at: f32,
    #[serde(default)]
    pub run: Vec<String>,
}

impl TimelineScript {
    /// Load a script by name from the timeline asset directory
    pub fn load(name: &str) -> Result<Self, String> {
        let path = Path::new(TIMELINE_DIR).join(format!("{}.toml", name));
        let content = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
    }
}

pub(crate) type ProgramMap = BTreeMap<Step, VecDeque<String>>;

/// The active timeline: program, cursor, and skip state
#[derive(Resource, Debug, Default)]
pub struct Timeline {
    pub(crate) program: ProgramMap,
    /// The logical clock; commands at or before it are due
    pub cursor: f32,
    /// Name of the active script; empty once exhausted or when none loaded
    pub name: String,
    /// Authored skip point; pause input below it fast-forwards the cutscene
    pub skip_target: Option<f32>,
}

impl Timeline {
    /// Install a parsed script as the active program, rewinding to step 0
    pub fn install(&mut self, name: &str, script: &TimelineScript) {
        self.program.clear();
        for step in &script.step {
            if step.run.is_empty() {
                continue;
            }
            let queue = self.program.entry(Step(step.at)).or_default();
            queue.extend(step.run.iter().cloned());
        }
        self.cursor = 0.0;
        self.name = name.to_string();
        self.skip_target = None;
    }

    /// Load and install a script by name (`load_timeline`)
    pub fn load_by_name(&mut self, name: &str) -> Result<(), String> {
        let script = TimelineScript::load(name)?;
        self.install(name, &script);
        Ok(())
    }

    /// Drop the program entirely
    pub fn clear(&mut self) {
        self.program.clear();
        self.cursor = 0.0;
        self.name.clear();
        self.skip_target = None;
    }

    /// Queue a single command line at a step (tests and tools)
    pub fn push(&mut self, at: f32, line: &str) {
        self.program
            .entry(Step(at))
            .or_default()
            .push_back(line.to_string());
    }

    /// Whether every queue has drained
    pub fn is_exhausted(&self) -> bool {
        self.program.is_empty()
    }

    /// Number of pending command lines across all steps
    pub fn pending_commands(&self) -> usize {
        self.program.values().map(VecDeque::len).sum()
    }

    /// Jump the cursor to `step`, dropping every queue below it unexecuted.
    /// The queue at exactly `step` stays due.
    pub fn skip_to(&mut self, step: f32) {
        self.program.retain(|k, _| k.0 >= step);
        self.cursor = step;
    }

    /// Smallest step at or before the cursor.
    ///
    /// The program never holds empty queues, so a due step always has at
    /// least one command.
    pub(crate) fn first_due(&self) -> Option<Step> {
        self.program
            .keys()
            .next()
            .filter(|k| k.0 <= self.cursor)
            .copied()
    }
}

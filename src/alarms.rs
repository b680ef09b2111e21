//! Named countdown alarms
//!
//! An `AlarmSet` is a bag of named countdowns in seconds. Assigning a name
//! that already exists resets its countdown; removing a name cancels it.
//! Ticking returns the names that reached zero this tick, in sorted order so
//! a frame's firings are deterministic. Firing removes the alarm before the
//! handler runs, so a handler re-arming the same name starts a fresh
//! countdown.
//!
//! The session owns one set; interactive objects can carry their own via
//! [`ObjectAlarms`].

use bevy::prelude::*;
use std::collections::HashMap;

/// Named countdowns, in seconds
#[derive(Debug, Clone, Default)]
pub struct AlarmSet {
    alarms: HashMap<String, f32>,
}

impl AlarmSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) a named countdown
    pub fn set(&mut self, name: &str, seconds: f32) {
        self.alarms.insert(name.to_string(), seconds);
    }

    /// Cancel a countdown; returns true if it was pending
    pub fn cancel(&mut self, name: &str) -> bool {
        self.alarms.remove(name).is_some()
    }

    /// Whether a countdown is pending
    pub fn contains(&self, name: &str) -> bool {
        self.alarms.contains_key(name)
    }

    /// Seconds remaining on a countdown, if pending
    pub fn remaining(&self, name: &str) -> Option<f32> {
        self.alarms.get(name).copied()
    }

    /// Whether any of the given names is pending
    pub fn any_pending(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.contains(n))
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    /// Advance every countdown by `delta` seconds and collect the names that
    /// reached zero. Fired names are removed before being returned.
    pub fn tick(&mut self, delta: f32) -> Vec<String> {
        let mut fired = Vec::new();
        for (name, remaining) in self.alarms.iter_mut() {
            *remaining -= delta;
            if *remaining <= 0.0 {
                fired.push(name.clone());
            }
        }
        for name in &fired {
            self.alarms.remove(name);
        }
        // Sorted so simultaneous firings replay identically
        fired.sort();
        fired
    }
}

/// Per-object alarm timers, sharing session alarm semantics.
///
/// Collaborator systems tick these and drain `fired` for handling.
#[derive(Component, Debug, Default)]
pub struct ObjectAlarms {
    pub alarms: AlarmSet,
    /// Names that fired on the most recent tick, awaiting their handler
    pub fired: Vec<String>,
}

/// System: advance all object-level alarms
pub fn tick_object_alarms(time: Res<Time>, mut query: Query<&mut ObjectAlarms>) {
    let delta = time.delta_secs();
    for mut obj in &mut query {
        let fired = obj.alarms.tick(delta);
        obj.fired.extend(fired);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fire_and_remove() {
        let mut alarms = AlarmSet::new();
        alarms.set("death", 1.0);
        assert!(alarms.tick(0.5).is_empty());
        assert_eq!(alarms.tick(0.6), vec!["death".to_string()]);
        assert!(!alarms.contains("death"));
    }

    #[test]
    fn test_reassign_resets() {
        let mut alarms = AlarmSet::new();
        alarms.set("timer", 1.0);
        alarms.tick(0.9);
        alarms.set("timer", 1.0);
        assert!(alarms.tick(0.9).is_empty());
        assert_eq!(alarms.tick(0.2), vec!["timer".to_string()]);
    }

    #[test]
    fn test_cancel() {
        let mut alarms = AlarmSet::new();
        alarms.set("win_finish", 0.1);
        assert!(alarms.cancel("win_finish"));
        assert!(alarms.tick(1.0).is_empty());
        assert!(!alarms.cancel("win_finish"));
    }

    #[test]
    fn test_simultaneous_firings_sorted() {
        let mut alarms = AlarmSet::new();
        alarms.set("b", 0.5);
        alarms.set("a", 0.5);
        alarms.set("c", 2.0);
        let fired = alarms.tick(1.0);
        assert_eq!(fired, vec!["a".to_string(), "b".to_string()]);
        assert!(alarms.contains("c"));
    }
}

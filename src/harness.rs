//! Headless App Builder
//!
//! Provides a reusable builder for creating headless Bevy apps running the
//! session core without rendering, audio, or input. Used by tests and by
//! the thin wrapper binaries (scripted playthroughs).

use bevy::app::ScheduleRunnerPlugin;
use bevy::prelude::*;
use std::time::Duration;

use crate::alarms::tick_object_alarms;
use crate::events::{EventBus, update_event_bus_time};
use crate::levelset::Levelset;
use crate::music::{MusicDirector, tick_music};
use crate::registry::{ObjectRegistry, register_timeline_objects};
use crate::save::SaveSlots;
use crate::session::{
    LevelSession, PendingRoom, SessionContext, advance_timeline, fire_session_alarms, session_tick,
    tick_pause_lockout,
};
use crate::timeline::Timeline;
use crate::warp::refresh_checkpoints;

/// Builder for creating headless session apps
pub struct HeadlessAppBuilder {
    levelset: Option<Levelset>,
    fps: f32,
    minimal_threads: bool,
    silent: bool,
}

impl HeadlessAppBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            levelset: None,
            fps: 60.0,
            minimal_threads: false,
            silent: false,
        }
    }

    /// Set the levelset resource
    pub fn with_levelset(mut self, levelset: Levelset) -> Self {
        self.levelset = Some(levelset);
        self
    }

    /// Set the target FPS (default: 60)
    pub fn with_fps(mut self, fps: f32) -> Self {
        self.fps = fps;
        self
    }

    /// Reduce Bevy's task pools to one thread per app; needed when many
    /// apps run in parallel (test runners)
    pub fn with_minimal_threads(mut self) -> Self {
        self.minimal_threads = true;
        self
    }

    /// Disable the event bus (no feedback events collected)
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Build the app with minimal plugins, the session resources, and the
    /// one-tick update chain in its canonical order:
    /// input sampling is the caller's job, then timeline, alarms, death and
    /// win ticks, music, checkpoints.
    pub fn build(self) -> App {
        let mut app = App::new();

        if self.minimal_threads {
            app.add_plugins(
                MinimalPlugins
                    .set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f32(
                        1.0 / self.fps,
                    )))
                    .set(TaskPoolPlugin {
                        task_pool_options: TaskPoolOptions::with_num_threads(1),
                    }),
            );
        } else {
            app.add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(
                Duration::from_secs_f32(1.0 / self.fps),
            )));
        }

        app.init_resource::<Timeline>();
        app.init_resource::<LevelSession>();
        app.init_resource::<SessionContext>();
        app.init_resource::<ObjectRegistry>();
        app.init_resource::<MusicDirector>();
        app.init_resource::<PendingRoom>();
        app.init_resource::<SaveSlots>();
        let mut bus = if self.silent {
            EventBus::disabled()
        } else {
            EventBus::new()
        };
        bus.emit(crate::events::GameEvent::SessionStart {
            session_id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        });
        app.insert_resource(bus);
        app.insert_resource(self.levelset.unwrap_or_default());

        app.add_systems(
            Update,
            (
                update_event_bus_time,
                register_timeline_objects,
                tick_pause_lockout,
                advance_timeline,
                fire_session_alarms,
                session_tick,
                tick_object_alarms,
                tick_music,
                refresh_checkpoints,
            )
                .chain(),
        );

        app
    }
}

impl Default for HeadlessAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! Headless single-level playthrough driver
//!
//! Thin wrapper around the session core: starts one room with a timeline
//! script and runs frames until the session requests a room change or the
//! frame budget runs out, printing bus events as they happen. Useful for
//! checking cutscene scripts without the full game.
//!
//! Usage: scriptrun --level <id> [--timeline <name>] [--frames <n>]

use bevy::ecs::system::SystemState;
use bevy::prelude::*;

use frostrun::session::begin_room;
use frostrun::{
    EventBus, HeadlessAppBuilder, LevelSession, Levelset, MusicDirector, PendingRoom, RoomConfig,
    SessionContext, Timeline,
};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let level = arg_value(&args, "--level").unwrap_or_else(|| "forest1".to_string());
    let timeline = arg_value(&args, "--timeline");
    let frames = arg_value(&args, "--frames")
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(3600);

    let levelset = Levelset {
        id: "scriptrun".to_string(),
        levels: vec![level.clone()],
        ..Default::default()
    };
    let mut app = HeadlessAppBuilder::new().with_levelset(levelset).build();

    let config = RoomConfig {
        id: level.clone(),
        name: level.clone(),
        music: None,
        time_bonus: 0,
        timeline,
    };

    let mut state: SystemState<(
        ResMut<LevelSession>,
        ResMut<SessionContext>,
        ResMut<Timeline>,
        ResMut<MusicDirector>,
        ResMut<EventBus>,
        Res<Levelset>,
    )> = SystemState::new(app.world_mut());
    {
        let (mut session, mut ctx, mut timeline, mut music, mut bus, levelset) =
            state.get_mut(app.world_mut());
        begin_room(
            &mut session,
            &mut ctx,
            &mut timeline,
            &mut music,
            &mut bus,
            &levelset,
            &config,
            None,
        );
    }

    println!("Running '{}' for up to {} frames...", level, frames);
    let frame_time = std::time::Duration::from_secs_f32(1.0 / 60.0);
    for frame in 0..frames {
        std::thread::sleep(frame_time);
        app.update();

        for event in app.world_mut().resource_mut::<EventBus>().drain() {
            println!("[{:>6}ms] {:?}", event.time_ms, event.event);
        }

        if let Some(request) = &app.world().resource::<PendingRoom>().0 {
            println!("Room change after {} frames: {:?}", frame + 1, request);
            return;
        }
    }
    println!("Frame budget exhausted with no room change.");
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}

use anyhow::Result;
use cautionface::prelude::*;
use chrono::{Duration, DurationRound, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize structured logging.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // 2. Load the configuration, optionally from the file named on the command line.
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = FaceConfig::load(config_path.as_deref())?;

    // 3. Seed an in-memory calendar with a few meetings around now.
    let calendar = Arc::new(MemoryCalendar::new(config.palette.event_fill_default));
    seed_calendar(&calendar)?;

    // 4. Create the engine on the real clock.
    let clock = Arc::new(SystemClock::from_env(config.timezone));
    let (engine, face) = FaceEngine::new(config, calendar, clock);

    // 5. Spawn listeners for frames and system events.
    spawn_listeners(&face);

    // 6. Show the face and run until Ctrl+C.
    face.visibility_changed(true);
    engine
        .run_until(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}

fn seed_calendar(calendar: &MemoryCalendar) -> Result<()> {
    let hour = Utc::now().duration_trunc(Duration::hours(1))?;
    let meetings = [
        (0, 1, Rgb::new(0xE5, 0x39, 0x35)),
        (1, 2, Rgb::new(0x43, 0xA0, 0x47)),
        (1, 3, Rgb::new(0x1E, 0x88, 0xE5)),
        (5, 6, Rgb::new(0xFD, 0xD8, 0x35)),
    ];
    for (start, end, color) in meetings {
        calendar.insert(EventRecord::timed(
            hour + Duration::hours(start),
            hour + Duration::hours(end),
            color,
        ));
    }
    info!("Seeded {} events.", calendar.len());
    Ok(())
}

/// Spawns tasks that log what the engine publishes.
fn spawn_listeners(face: &FaceHandle) {
    let mut system_rx = face.subscribe_system_events();
    tokio::spawn(async move {
        while let Ok(event) = system_rx.recv().await {
            info!("[SYSTEM] => {:?}", event);
        }
    });

    let mut frame_rx = face.subscribe_frames();
    tokio::spawn(async move {
        while let Ok(frame) = frame_rx.recv().await {
            info!(
                "[FRAME] {} ({:?}) => {} draw ops",
                frame.at.format("%H:%M:%S"),
                frame.mode,
                frame.ops.len()
            );
        }
    });
}

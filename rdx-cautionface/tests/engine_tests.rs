//! Integration tests for the face engine.
//!
//! Each test runs a real `FaceEngine` on the tokio runtime against a manual
//! clock and watches the frames and system events it broadcasts.

#![allow(clippy::unwrap_used)]

use cautionface::geometry::Point;
use cautionface::prelude::*;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);
const RED: Rgb = Rgb::new(0xFF, 0, 0);

fn morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap() + ChronoDuration::milliseconds(400)
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(morning(), chrono_tz::UTC))
}

fn calendar_with_one_meeting() -> Arc<MemoryCalendar> {
    let calendar = MemoryCalendar::new(Rgb::WHITE);
    calendar.insert(EventRecord::timed(
        morning() + ChronoDuration::hours(1),
        morning() + ChronoDuration::hours(2),
        RED,
    ));
    Arc::new(calendar)
}

/// A clock that follows the tokio clock from a fixed wall time and whose
/// system zone can change behind the engine's back.
struct HostClock {
    started: tokio::time::Instant,
    wall: DateTime<Utc>,
    timezone: RwLock<Tz>,
    system_zone: RwLock<Tz>,
}

impl HostClock {
    fn new(wall: DateTime<Utc>, timezone: Tz) -> Self {
        Self {
            started: tokio::time::Instant::now(),
            wall,
            timezone: RwLock::new(timezone),
            system_zone: RwLock::new(timezone),
        }
    }

    fn change_system_zone(&self, timezone: Tz) {
        *self.system_zone.write().unwrap() = timezone;
    }
}

impl TimeSource for HostClock {
    fn now(&self) -> DateTime<Utc> {
        self.wall + ChronoDuration::from_std(self.started.elapsed()).unwrap()
    }

    fn timezone(&self) -> Tz {
        *self.timezone.read().unwrap()
    }

    fn set_timezone(&self, timezone: Tz) {
        *self.timezone.write().unwrap() = timezone;
    }

    fn refresh_timezone(&self) {
        let system_zone = *self.system_zone.read().unwrap();
        self.set_timezone(system_zone);
    }
}

/// A loader that never finishes.
struct StuckLoader;

impl EventLoader for StuckLoader {
    async fn load(
        &self,
        _window_start: DateTime<Utc>,
        _window_end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Event>> {
        std::future::pending().await
    }
}

/// A loader whose provider is unavailable.
struct BrokenLoader;

impl EventLoader for BrokenLoader {
    async fn load(
        &self,
        _window_start: DateTime<Utc>,
        _window_end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Event>> {
        anyhow::bail!("calendar provider unavailable")
    }
}

async fn next_matching<T: Clone>(
    rx: &mut broadcast::Receiver<T>,
    mut wanted: impl FnMut(&T) -> bool,
) -> T {
    timeout(WAIT, async {
        loop {
            match rx.recv().await {
                Ok(item) if wanted(&item) => return item,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for a matching item")
}

fn wedge_fill_colors(frame: &Frame) -> Vec<Rgb> {
    let center = Point::new(160.0, 160.0);
    frame
        .ops
        .iter()
        .filter_map(|op| match op {
            DrawOp::Path { path, paint }
                if paint.style == PaintStyle::Fill
                    && path.commands().first() == Some(&PathCommand::MoveTo(center)) =>
            {
                Some(paint.color)
            }
            _ => None,
        })
        .collect()
}

fn has_text(frame: &Frame) -> bool {
    frame.ops.iter().any(|op| matches!(op, DrawOp::Text { .. }))
}

fn drain(rx: &mut broadcast::Receiver<Arc<Frame>>) -> Vec<Arc<Frame>> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}

#[tokio::test]
async fn visible_face_shows_loaded_events() {
    let (engine, face) =
        FaceEngine::new(FaceConfig::default(), calendar_with_one_meeting(), clock());
    let mut system = face.subscribe_system_events();
    let mut frames = face.subscribe_frames();
    let running = tokio::spawn(engine.run());

    face.visibility_changed(true);

    let changed =
        next_matching(&mut system, |e| matches!(e, SystemEvent::StateChanged { .. })).await;
    assert_eq!(
        changed,
        SystemEvent::StateChanged {
            from: FaceState::Hidden,
            to: FaceState::VisibleInteractive,
        }
    );
    let completed =
        next_matching(&mut system, |e| matches!(e, SystemEvent::ReloadCompleted { .. })).await;
    assert!(matches!(completed, SystemEvent::ReloadCompleted { events: 1, .. }));

    let frame = next_matching(&mut frames, |f| !wedge_fill_colors(f).is_empty()).await;
    assert_eq!(frame.mode, DisplayMode::Interactive);
    assert_eq!(wedge_fill_colors(&frame), vec![RED]);
    assert!(has_text(&frame));

    drop(face);
    timeout(WAIT, running).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn ambient_face_drops_detail() {
    let config = FaceConfig::default();
    let ambient_fill = config.palette.event_fill_ambient;
    let (engine, face) = FaceEngine::new(config, calendar_with_one_meeting(), clock());
    let mut system = face.subscribe_system_events();
    let mut frames = face.subscribe_frames();
    let running = tokio::spawn(engine.run());

    face.visibility_changed(true);
    next_matching(&mut system, |e| matches!(e, SystemEvent::ReloadCompleted { .. })).await;
    face.ambient_mode_changed(true);

    let frame = next_matching(&mut frames, |f| f.mode == DisplayMode::Ambient).await;
    assert!(!has_text(&frame));
    assert_eq!(wedge_fill_colors(&frame), vec![ambient_fill]);

    drop(face);
    timeout(WAIT, running).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn hiding_discards_an_outstanding_reload() {
    let (engine, face) =
        FaceEngine::new(FaceConfig::default(), Arc::new(StuckLoader), clock());
    let mut system = face.subscribe_system_events();
    let running = tokio::spawn(engine.run());

    face.visibility_changed(true);
    let started =
        next_matching(&mut system, |e| matches!(e, SystemEvent::ReloadStarted { .. })).await;
    let SystemEvent::ReloadStarted { id } = started else {
        unreachable!()
    };

    face.visibility_changed(false);
    let discarded =
        next_matching(&mut system, |e| matches!(e, SystemEvent::ReloadDiscarded { .. })).await;
    assert_eq!(discarded, SystemEvent::ReloadDiscarded { id });

    drop(face);
    timeout(WAIT, running).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn failed_reload_leaves_an_empty_face() {
    let (engine, face) =
        FaceEngine::new(FaceConfig::default(), Arc::new(BrokenLoader), clock());
    let mut system = face.subscribe_system_events();
    let mut frames = face.subscribe_frames();
    let running = tokio::spawn(engine.run());

    face.visibility_changed(true);
    let failed =
        next_matching(&mut system, |e| matches!(e, SystemEvent::ReloadFailed { .. })).await;
    assert!(matches!(
        failed,
        SystemEvent::ReloadFailed { reason, .. } if reason.contains("unavailable")
    ));

    let frame = next_matching(&mut frames, |_| true).await;
    assert!(wedge_fill_colors(&frame).is_empty());

    drop(face);
    timeout(WAIT, running).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn empty_surface_produces_empty_frames() {
    let (engine, face) =
        FaceEngine::new(FaceConfig::default(), calendar_with_one_meeting(), clock());
    let mut frames = face.subscribe_frames();
    let running = tokio::spawn(engine.run());

    face.surface_changed(0.0, 0.0);
    face.visibility_changed(true);
    let frame = next_matching(&mut frames, |_| true).await;
    assert!(frame.ops.is_empty());

    drop(face);
    timeout(WAIT, running).await.unwrap().unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn interactive_face_ticks_on_second_boundaries_until_ambient() {
    let clock = Arc::new(HostClock::new(morning(), chrono_tz::UTC));
    let (engine, face) =
        FaceEngine::new(FaceConfig::default(), calendar_with_one_meeting(), clock);
    let mut frames = face.subscribe_frames();
    let running = tokio::spawn(engine.run());

    // Shown at 09:00:00.400; the timer fires at :01, :02, :03 and :04.
    face.visibility_changed(true);
    tokio::time::sleep(Duration::from_millis(3_700)).await;

    let ticks: Vec<Arc<Frame>> = drain(&mut frames)
        .into_iter()
        .filter(|frame| frame.at.timestamp_subsec_millis() == 0)
        .collect();
    let seconds: Vec<u32> = ticks.iter().map(|frame| frame.at.second()).collect();
    assert_eq!(seconds, vec![1, 2, 3, 4]);
    assert!(ticks.iter().all(|frame| frame.mode == DisplayMode::Interactive));

    face.ambient_mode_changed(true);
    tokio::time::sleep(Duration::from_secs(5)).await;

    let after = drain(&mut frames);
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].mode, DisplayMode::Ambient);

    drop(face);
    timeout(WAIT, running).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn showing_the_face_picks_up_a_new_system_zone() {
    let clock = Arc::new(HostClock::new(morning(), chrono_tz::UTC));
    let (engine, face) =
        FaceEngine::new(FaceConfig::default(), calendar_with_one_meeting(), clock.clone());
    let mut frames = face.subscribe_frames();
    let running = tokio::spawn(engine.run());

    clock.change_system_zone(chrono_tz::Europe::Berlin);
    face.visibility_changed(true);
    let frame = next_matching(&mut frames, |_| true).await;
    assert_eq!(frame.at.timezone(), chrono_tz::Europe::Berlin);

    face.visibility_changed(false);
    clock.change_system_zone(chrono_tz::Asia::Tokyo);
    face.visibility_changed(true);
    let frame =
        next_matching(&mut frames, |f| f.at.timezone() != chrono_tz::Europe::Berlin).await;
    assert_eq!(frame.at.timezone(), chrono_tz::Asia::Tokyo);

    drop(face);
    timeout(WAIT, running).await.unwrap().unwrap().unwrap();
}

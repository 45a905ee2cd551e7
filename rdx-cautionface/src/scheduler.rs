//! The refresh state machine.
//!
//! The scheduler decides when the face is redrawn and when events are
//! reloaded. It never sleeps, spawns or draws itself: every input returns the
//! [`Command`]s the runtime driver has to carry out, which keeps the state
//! machine synchronous and easy to drive from tests.

use crate::calendar::Event;
use crate::common::{DisplayMode, ReloadId};
use crate::render::FaceProperties;
use crate::time::next_tick_delay_at;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceState {
    Hidden,
    VisibleInteractive,
    VisibleAmbient,
}

impl FaceState {
    pub fn is_visible(self) -> bool {
        !matches!(self, FaceState::Hidden)
    }
}

impl fmt::Display for FaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FaceState::Hidden => "hidden",
            FaceState::VisibleInteractive => "interactive",
            FaceState::VisibleAmbient => "ambient",
        };
        f.write_str(label)
    }
}

/// A window of events to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadRequest {
    pub id: ReloadId,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

/// Work the runtime driver must perform, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Redraw,
    /// Fire `timer_fired` after the delay, replacing any pending timer.
    ArmTimer(Duration),
    DisarmTimer,
    StartReload(ReloadRequest),
    CancelReload(ReloadId),
}

pub struct RefreshScheduler {
    state: FaceState,
    ambient: bool,
    properties: FaceProperties,
    timer_armed: bool,
    in_flight: Option<ReloadId>,
    next_reload: u64,
    events: Arc<Vec<Event>>,
    tick_rate: Duration,
    window: ChronoDuration,
}

impl RefreshScheduler {
    pub fn new(tick_rate: Duration, window: ChronoDuration) -> Self {
        Self {
            state: FaceState::Hidden,
            ambient: false,
            properties: FaceProperties::default(),
            timer_armed: false,
            in_flight: None,
            next_reload: 0,
            events: Arc::new(Vec::new()),
            tick_rate,
            window,
        }
    }

    pub fn state(&self) -> FaceState {
        self.state
    }

    pub fn mode(&self) -> DisplayMode {
        if self.ambient {
            DisplayMode::Ambient
        } else {
            DisplayMode::Interactive
        }
    }

    pub fn properties(&self) -> FaceProperties {
        self.properties
    }

    pub fn is_timer_armed(&self) -> bool {
        self.timer_armed
    }

    pub fn in_flight(&self) -> Option<ReloadId> {
        self.in_flight
    }

    /// The current event list. Readers keep whatever snapshot they took, even
    /// if a reload lands afterwards.
    pub fn events(&self) -> Arc<Vec<Event>> {
        Arc::clone(&self.events)
    }

    fn visible_state(&self) -> FaceState {
        if self.ambient {
            FaceState::VisibleAmbient
        } else {
            FaceState::VisibleInteractive
        }
    }

    fn wants_timer(&self) -> bool {
        self.state == FaceState::VisibleInteractive
    }

    fn set_state(&mut self, next: FaceState) {
        if self.state != next {
            debug!("Face state {} -> {}", self.state, next);
            self.state = next;
        }
    }

    fn arm(&mut self, now: DateTime<Utc>, commands: &mut Vec<Command>) {
        self.timer_armed = true;
        commands.push(Command::ArmTimer(next_tick_delay_at(&now, self.tick_rate)));
    }

    fn disarm(&mut self, commands: &mut Vec<Command>) {
        if self.timer_armed {
            self.timer_armed = false;
            commands.push(Command::DisarmTimer);
        }
    }

    fn cancel_reload(&mut self, commands: &mut Vec<Command>) {
        if let Some(id) = self.in_flight.take() {
            debug!("Cancelling {}", id);
            commands.push(Command::CancelReload(id));
        }
    }

    /// The host showed or hid the face.
    pub fn visibility_changed(&mut self, visible: bool, now: DateTime<Utc>) -> Vec<Command> {
        let mut commands = Vec::new();
        match (self.state.is_visible(), visible) {
            (false, true) => {
                self.set_state(self.visible_state());
                commands.extend(self.request_reload(now));
                if self.wants_timer() {
                    self.arm(now, &mut commands);
                }
                commands.push(Command::Redraw);
            }
            (true, false) => {
                self.set_state(FaceState::Hidden);
                self.disarm(&mut commands);
                self.cancel_reload(&mut commands);
            }
            _ => trace!("Visibility unchanged ({})", visible),
        }
        commands
    }

    /// The host entered or left ambient mode. Tracked while hidden too, so the
    /// face comes back in the right mode.
    pub fn ambient_mode_changed(&mut self, ambient: bool, now: DateTime<Utc>) -> Vec<Command> {
        let mut commands = Vec::new();
        if self.ambient == ambient {
            return commands;
        }
        self.ambient = ambient;
        if !self.state.is_visible() {
            return commands;
        }
        self.set_state(self.visible_state());
        if self.wants_timer() {
            self.arm(now, &mut commands);
        } else {
            self.disarm(&mut commands);
        }
        commands.push(Command::Redraw);
        commands
    }

    pub fn properties_changed(&mut self, properties: FaceProperties) -> Vec<Command> {
        self.properties = properties;
        Vec::new()
    }

    /// The host's own periodic tick (once a minute, also in ambient mode).
    pub fn time_tick(&mut self) -> Vec<Command> {
        self.redraw_if_visible()
    }

    pub fn timezone_changed(&mut self) -> Vec<Command> {
        self.redraw_if_visible()
    }

    pub fn surface_changed(&mut self) -> Vec<Command> {
        self.redraw_if_visible()
    }

    fn redraw_if_visible(&self) -> Vec<Command> {
        if self.state.is_visible() {
            vec![Command::Redraw]
        } else {
            Vec::new()
        }
    }

    /// The periodic timer elapsed. Redraws and re-arms on the next boundary,
    /// unless the timer was meant to be off by now.
    pub fn timer_fired(&mut self, now: DateTime<Utc>) -> Vec<Command> {
        let mut commands = Vec::new();
        if !self.timer_armed || !self.wants_timer() {
            trace!("Ignoring stale timer");
            self.timer_armed = false;
            return commands;
        }
        commands.push(Command::Redraw);
        self.arm(now, &mut commands);
        commands
    }

    /// Asks for the events in `[now, now + window)`, cancelling any request
    /// still outstanding.
    pub fn request_reload(&mut self, now: DateTime<Utc>) -> Vec<Command> {
        let mut commands = Vec::new();
        self.cancel_reload(&mut commands);
        self.next_reload += 1;
        let id = ReloadId(self.next_reload);
        self.in_flight = Some(id);
        commands.push(Command::StartReload(ReloadRequest {
            id,
            window_start: now,
            window_end: now + self.window,
        }));
        commands
    }

    /// A reload finished. Results for anything but the outstanding request are
    /// dropped; a failure counts as an empty calendar.
    pub fn reload_completed(
        &mut self,
        id: ReloadId,
        result: anyhow::Result<Vec<Event>>,
    ) -> Vec<Command> {
        if self.in_flight != Some(id) {
            trace!("Discarding result of superseded {}", id);
            return Vec::new();
        }
        self.in_flight = None;
        let events = result.unwrap_or_else(|e| {
            warn!("Loading events failed, showing none: {:#}", e);
            Vec::new()
        });
        debug!("{} delivered {} events", id, events.len());
        self.events = Arc::new(events);
        vec![Command::Redraw]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Rgb;
    use chrono::TimeZone;

    const SECOND: Duration = Duration::from_millis(1000);

    fn scheduler() -> RefreshScheduler {
        RefreshScheduler::new(SECOND, ChronoDuration::hours(12))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap() + ChronoDuration::milliseconds(400)
    }

    fn reload_of(commands: &[Command]) -> ReloadRequest {
        commands
            .iter()
            .find_map(|c| match c {
                Command::StartReload(request) => Some(*request),
                _ => None,
            })
            .expect("no reload requested")
    }

    fn sample_events() -> Vec<Event> {
        vec![Event::new(
            now() + ChronoDuration::hours(1),
            now() + ChronoDuration::hours(2),
            Rgb::new(0xFF, 0, 0),
        )]
    }

    #[test]
    fn starts_hidden_and_idle() {
        let s = scheduler();
        assert_eq!(s.state(), FaceState::Hidden);
        assert!(!s.is_timer_armed());
        assert!(s.events().is_empty());
    }

    #[test]
    fn becoming_visible_reloads_and_arms() {
        let mut s = scheduler();
        let commands = s.visibility_changed(true, now());
        let request = reload_of(&commands);
        assert_eq!(request.window_start, now());
        assert_eq!(request.window_end, now() + ChronoDuration::hours(12));
        assert!(commands.contains(&Command::ArmTimer(Duration::from_millis(600))));
        assert!(commands.contains(&Command::Redraw));
        assert_eq!(s.state(), FaceState::VisibleInteractive);
    }

    #[test]
    fn becoming_visible_in_ambient_does_not_arm() {
        let mut s = scheduler();
        assert!(s.ambient_mode_changed(true, now()).is_empty());
        let commands = s.visibility_changed(true, now());
        reload_of(&commands);
        assert!(!commands.iter().any(|c| matches!(c, Command::ArmTimer(_))));
        assert_eq!(s.state(), FaceState::VisibleAmbient);
        assert_eq!(s.mode(), DisplayMode::Ambient);
    }

    #[test]
    fn timer_re_arms_on_second_boundaries() {
        let mut s = scheduler();
        s.visibility_changed(true, now());
        let aligned = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 5).unwrap();
        assert_eq!(
            s.timer_fired(aligned),
            vec![Command::Redraw, Command::ArmTimer(SECOND)]
        );
        assert_eq!(
            s.timer_fired(aligned + ChronoDuration::milliseconds(1_030)),
            vec![Command::Redraw, Command::ArmTimer(Duration::from_millis(970))]
        );
    }

    #[test]
    fn ambient_toggle_stops_the_timer() {
        let mut s = scheduler();
        s.visibility_changed(true, now());
        let commands = s.ambient_mode_changed(true, now());
        assert_eq!(commands, vec![Command::DisarmTimer, Command::Redraw]);
        // A tick already in flight must not re-arm.
        assert!(s.timer_fired(now()).is_empty());
        assert!(!s.is_timer_armed());

        let commands = s.ambient_mode_changed(false, now());
        assert_eq!(
            commands,
            vec![Command::ArmTimer(Duration::from_millis(600)), Command::Redraw]
        );
        assert_eq!(s.state(), FaceState::VisibleInteractive);
    }

    #[test]
    fn repeated_inputs_are_no_ops() {
        let mut s = scheduler();
        s.visibility_changed(true, now());
        assert!(s.visibility_changed(true, now()).is_empty());
        assert!(s.ambient_mode_changed(false, now()).is_empty());
    }

    #[test]
    fn hiding_disarms_and_cancels_without_redraw() {
        let mut s = scheduler();
        let request = reload_of(&s.visibility_changed(true, now()));
        let commands = s.visibility_changed(false, now());
        assert_eq!(
            commands,
            vec![Command::DisarmTimer, Command::CancelReload(request.id)]
        );
        assert_eq!(s.state(), FaceState::Hidden);
        assert!(s.in_flight().is_none());
    }

    #[test]
    fn late_result_after_hide_is_ignored() {
        let mut s = scheduler();
        let request = reload_of(&s.visibility_changed(true, now()));
        s.visibility_changed(false, now());
        assert!(s.reload_completed(request.id, Ok(sample_events())).is_empty());
        assert!(s.events().is_empty());
    }

    #[test]
    fn completed_reload_replaces_events_and_redraws() {
        let mut s = scheduler();
        let request = reload_of(&s.visibility_changed(true, now()));
        let before = s.events();
        assert_eq!(
            s.reload_completed(request.id, Ok(sample_events())),
            vec![Command::Redraw]
        );
        assert_eq!(*s.events(), sample_events());
        // Old snapshots are untouched.
        assert!(before.is_empty());
        assert!(s.in_flight().is_none());
    }

    #[test]
    fn new_request_supersedes_the_outstanding_one() {
        let mut s = scheduler();
        let first = reload_of(&s.visibility_changed(true, now()));
        let commands = s.request_reload(now());
        let second = reload_of(&commands);
        assert_eq!(commands[0], Command::CancelReload(first.id));
        assert_ne!(first.id, second.id);

        assert!(s.reload_completed(first.id, Ok(sample_events())).is_empty());
        assert!(s.events().is_empty());
        assert_eq!(
            s.reload_completed(second.id, Ok(sample_events())),
            vec![Command::Redraw]
        );
    }

    #[test]
    fn failed_reload_shows_no_events() {
        let mut s = scheduler();
        let first = reload_of(&s.visibility_changed(true, now()));
        s.reload_completed(first.id, Ok(sample_events()));

        let second = reload_of(&s.request_reload(now()));
        let commands = s.reload_completed(second.id, Err(anyhow::anyhow!("provider gone")));
        assert_eq!(commands, vec![Command::Redraw]);
        assert!(s.events().is_empty());
    }

    #[test]
    fn host_ticks_redraw_only_while_visible() {
        let mut s = scheduler();
        assert!(s.time_tick().is_empty());
        assert!(s.timezone_changed().is_empty());
        s.visibility_changed(true, now());
        assert_eq!(s.time_tick(), vec![Command::Redraw]);
        assert_eq!(s.timezone_changed(), vec![Command::Redraw]);
    }

    #[test]
    fn properties_are_recorded() {
        let mut s = scheduler();
        let commands = s.properties_changed(FaceProperties {
            low_bit_ambient: true,
        });
        assert!(commands.is_empty());
        assert!(s.properties().low_bit_ambient);
    }
}

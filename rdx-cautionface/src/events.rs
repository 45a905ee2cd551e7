//! Defines the events flowing into and out of the `FaceEngine`.
//!
//! `HostEvent`s are what the watch host tells the face. `SystemEvent`s are
//! broadcast by the engine so that tools and tests can follow what it does.

use crate::common::ReloadId;
use crate::render::FaceProperties;
use crate::scheduler::FaceState;
use chrono_tz::Tz;
use tokio::time::Instant;

/// Lifecycle notifications delivered by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    VisibilityChanged(bool),
    AmbientModeChanged(bool),
    PropertiesChanged(FaceProperties),
    /// The system timezone changed. Carries the new zone when the host knows it.
    TimezoneChanged(Option<Tz>),
    /// The host's periodic tick, delivered about once a minute.
    TimeTick,
    SurfaceChanged { width: f32, height: f32 },
    /// Fetch events again without waiting for a visibility change.
    ReloadRequested,
}

/// Events related to the lifecycle and state of the engine itself.
#[derive(Debug, Clone, PartialEq)]
pub enum SystemEvent {
    /// Fired once when the engine's `run` loop begins.
    EngineStarted { timestamp: Instant },
    /// Fired once when the engine's `run` loop is about to exit.
    EngineShutdown,
    StateChanged { from: FaceState, to: FaceState },
    ReloadStarted { id: ReloadId },
    /// A reload landed and its events are now on the face.
    ReloadCompleted { id: ReloadId, events: usize },
    /// A reload failed; the face now shows no events.
    ReloadFailed { id: ReloadId, reason: String },
    /// A reload was cancelled or superseded; its result will be ignored.
    ReloadDiscarded { id: ReloadId },
}

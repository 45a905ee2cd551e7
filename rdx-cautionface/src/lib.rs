//! # Caution Face
//!
//! An analog watch face that shows the wearer's upcoming calendar events as
//! radial wedges behind the hands.
//!
//! The crate is split the way the work is split on a watch:
//!
//! - **Layout**: [`layout::layout`] turns the sorted event list into wedges for
//!   the next twelve hours, stacking back-to-back events inward.
//! - **Rendering**: [`render::FaceRenderer`] turns the time, the wedges and the
//!   display mode into a list of [`draw::DrawOp`]s. Nothing is drawn directly;
//!   whatever owns the canvas replays the list.
//! - **Scheduling**: [`scheduler::RefreshScheduler`] decides when to redraw and
//!   when to reload events as the face is shown, hidden or dimmed.
//! - **Runtime**: [`engine::FaceEngine`] drives the scheduler on tokio, runs
//!   reloads on their own tasks and broadcasts finished frames.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cautionface::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // 1. Load configuration (defaults when nothing is set).
//!     let config = FaceConfig::load(None)?;
//!
//!     // 2. Pick a calendar and a clock.
//!     let calendar = Arc::new(MemoryCalendar::new(config.palette.event_fill_default));
//!     let clock = Arc::new(SystemClock::from_env(config.timezone));
//!
//!     // 3. Create the engine and subscribe before it starts.
//!     let (engine, face) = FaceEngine::new(config, calendar, clock);
//!     let mut frames = face.subscribe_frames();
//!     tokio::spawn(async move {
//!         while let Ok(frame) = frames.recv().await {
//!             println!("{} ops at {}", frame.ops.len(), frame.at);
//!         }
//!     });
//!
//!     // 4. Tell it what the host is doing.
//!     face.visibility_changed(true);
//!
//!     // 5. Run until Ctrl+C.
//!     engine
//!         .run_until(async {
//!             tokio::signal::ctrl_c().await.ok();
//!         })
//!         .await
//! }
//! ```

pub const FACE_NAME: &str = "Caution Face";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod calendar;
pub mod common;
pub mod config;
pub mod draw;
pub mod engine;
pub mod events;
pub mod geometry;
pub mod layout;
pub mod loader;
pub mod render;
pub mod scheduler;
pub mod time;

/// A prelude module for easy importing of the most common face types.
pub mod prelude {
    pub use crate::calendar::{Event, EventRecord};
    pub use crate::common::{DisplayMode, ReloadId, Rgb};
    pub use crate::config::{FaceConfig, Palette};
    pub use crate::draw::{DrawOp, Paint, PaintStyle, Path, PathCommand};
    pub use crate::engine::{FaceEngine, FaceHandle, Frame};
    pub use crate::events::{HostEvent, SystemEvent};
    pub use crate::layout::{layout, LayoutParams, Wedge};
    pub use crate::loader::{EventLoader, MemoryCalendar};
    pub use crate::render::{FaceProperties, FaceRenderer};
    pub use crate::scheduler::{Command, FaceState, RefreshScheduler};
    pub use crate::time::{ManualClock, SystemClock, TimeSource};
}

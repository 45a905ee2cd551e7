//! The runtime driver that turns the scheduler's decisions into frames.

use crate::calendar::Event;
use crate::common::{DisplayMode, ReloadId};
use crate::config::FaceConfig;
use crate::draw::DrawOp;
use crate::events::{HostEvent, SystemEvent};
use crate::geometry::FaceGeometry;
use crate::layout::layout;
use crate::loader::EventLoader;
use crate::render::{FaceProperties, FaceRenderer};
use crate::scheduler::{Command, RefreshScheduler, ReloadRequest};
use crate::time::TimeSource;
use chrono::DateTime;
use chrono_tz::Tz;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Sleep};
use tracing::{debug, info, trace, warn};

const FRAME_CHANNEL_CAPACITY: usize = 16;
const SYSTEM_CHANNEL_CAPACITY: usize = 64;

/// Everything drawn for one redraw.
#[derive(Debug, Clone)]
pub struct Frame {
    pub at: DateTime<Tz>,
    pub mode: DisplayMode,
    pub ops: Vec<DrawOp>,
}

struct ReloadOutcome {
    id: ReloadId,
    result: anyhow::Result<Vec<Event>>,
}

struct InFlight {
    id: ReloadId,
    task: JoinHandle<()>,
}

/// What woke the loop up.
enum Wake {
    Shutdown,
    Host(Option<HostEvent>),
    Reload(ReloadOutcome),
    Timer,
}

/// Cloneable handle for feeding host events to a running engine and for
/// subscribing to its output.
///
/// The engine stops once every handle has been dropped.
#[derive(Clone)]
pub struct FaceHandle {
    host_sender: mpsc::UnboundedSender<HostEvent>,
    frame_sender: broadcast::Sender<Arc<Frame>>,
    system_event_sender: broadcast::Sender<SystemEvent>,
}

impl FaceHandle {
    /// Sends a raw host event. Returns `false` if the engine has stopped.
    pub fn send(&self, event: HostEvent) -> bool {
        self.host_sender.send(event).is_ok()
    }

    pub fn visibility_changed(&self, visible: bool) -> bool {
        self.send(HostEvent::VisibilityChanged(visible))
    }

    pub fn ambient_mode_changed(&self, ambient: bool) -> bool {
        self.send(HostEvent::AmbientModeChanged(ambient))
    }

    pub fn properties_changed(&self, properties: FaceProperties) -> bool {
        self.send(HostEvent::PropertiesChanged(properties))
    }

    pub fn timezone_changed(&self, timezone: Option<Tz>) -> bool {
        self.send(HostEvent::TimezoneChanged(timezone))
    }

    pub fn time_tick(&self) -> bool {
        self.send(HostEvent::TimeTick)
    }

    pub fn surface_changed(&self, width: f32, height: f32) -> bool {
        self.send(HostEvent::SurfaceChanged { width, height })
    }

    pub fn request_reload(&self) -> bool {
        self.send(HostEvent::ReloadRequested)
    }

    /// Subscribes to the stream of rendered frames.
    pub fn subscribe_frames(&self) -> broadcast::Receiver<Arc<Frame>> {
        self.frame_sender.subscribe()
    }

    /// Subscribes to the `SystemEvent` stream.
    pub fn subscribe_system_events(&self) -> broadcast::Receiver<SystemEvent> {
        self.system_event_sender.subscribe()
    }
}

/// The face engine.
///
/// It owns the scheduler, the renderer, the loader and the clock, and runs a
/// single loop that reacts to host events, timer expiry and finished reloads.
/// Reloads run on their own tasks and never touch drawing state; their result
/// is handed back through a channel and swapped in whole.
pub struct FaceEngine<L: EventLoader> {
    config: Arc<FaceConfig>,
    loader: Arc<L>,
    clock: Arc<dyn TimeSource>,
    renderer: FaceRenderer,
    scheduler: RefreshScheduler,
    surface: (f32, f32),
    host_receiver: mpsc::UnboundedReceiver<HostEvent>,
    reload_sender: mpsc::UnboundedSender<ReloadOutcome>,
    reload_receiver: mpsc::UnboundedReceiver<ReloadOutcome>,
    frame_sender: broadcast::Sender<Arc<Frame>>,
    system_event_sender: broadcast::Sender<SystemEvent>,
    timer: Pin<Box<Sleep>>,
    timer_armed: bool,
    in_flight: Option<InFlight>,
}

// Core implementation block for internal logic.
impl<L: EventLoader> FaceEngine<L> {
    /// Creates a new engine and the handle used to drive it.
    pub fn new(
        config: FaceConfig,
        loader: Arc<L>,
        clock: Arc<dyn TimeSource>,
    ) -> (Self, FaceHandle) {
        let (host_sender, host_receiver) = mpsc::unbounded_channel();
        let (reload_sender, reload_receiver) = mpsc::unbounded_channel();
        let (frame_sender, _) = broadcast::channel(FRAME_CHANNEL_CAPACITY);
        let (system_event_sender, _) = broadcast::channel(SYSTEM_CHANNEL_CAPACITY);

        let scheduler = RefreshScheduler::new(config.tick_rate(), config.window());
        let renderer = FaceRenderer::new(config.palette.clone());
        let surface = (config.surface.width, config.surface.height);

        let handle = FaceHandle {
            host_sender,
            frame_sender: frame_sender.clone(),
            system_event_sender: system_event_sender.clone(),
        };
        let engine = Self {
            config: Arc::new(config),
            loader,
            clock,
            renderer,
            scheduler,
            surface,
            host_receiver,
            reload_sender,
            reload_receiver,
            frame_sender,
            system_event_sender,
            timer: Box::pin(tokio::time::sleep(Duration::ZERO)),
            timer_armed: false,
            in_flight: None,
        };
        (engine, handle)
    }

    /// Runs until every [`FaceHandle`] is dropped.
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Runs until `shutdown` resolves or every [`FaceHandle`] is dropped.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        info!("FaceEngine starting up...");
        tokio::pin!(shutdown);
        self.system_event_sender
            .send(SystemEvent::EngineStarted {
                timestamp: Instant::now(),
            })
            .ok();

        loop {
            let wake = tokio::select! {
                biased;
                _ = &mut shutdown => Wake::Shutdown,
                event = self.host_receiver.recv() => Wake::Host(event),
                Some(outcome) = self.reload_receiver.recv() => Wake::Reload(outcome),
                _ = &mut self.timer, if self.timer_armed => Wake::Timer,
            };

            let commands = match wake {
                Wake::Shutdown => {
                    info!("Shutdown requested.");
                    break;
                }
                Wake::Host(None) => {
                    debug!("All face handles dropped.");
                    break;
                }
                Wake::Host(Some(event)) => self.on_host_event(event),
                Wake::Reload(outcome) => self.on_reload_outcome(outcome),
                Wake::Timer => {
                    self.timer_armed = false;
                    self.scheduler.timer_fired(self.clock.now())
                }
            };
            self.execute(commands);
        }

        if let Some(in_flight) = self.in_flight.take() {
            in_flight.task.abort();
        }
        self.system_event_sender
            .send(SystemEvent::EngineShutdown)
            .ok();
        info!("FaceEngine has shut down.");
        Ok(())
    }

    fn on_host_event(&mut self, event: HostEvent) -> Vec<Command> {
        trace!("Host event {:?}", event);
        let now = self.clock.now();
        let before = self.scheduler.state();
        let commands = match event {
            HostEvent::VisibilityChanged(visible) => {
                if visible {
                    self.clock.refresh_timezone();
                }
                self.scheduler.visibility_changed(visible, now)
            }
            HostEvent::AmbientModeChanged(ambient) => {
                self.scheduler.ambient_mode_changed(ambient, now)
            }
            HostEvent::PropertiesChanged(properties) => {
                self.scheduler.properties_changed(properties)
            }
            HostEvent::TimezoneChanged(timezone) => {
                if let Some(timezone) = timezone {
                    info!("Timezone changed to {}", timezone);
                    self.clock.set_timezone(timezone);
                }
                self.scheduler.timezone_changed()
            }
            HostEvent::TimeTick => self.scheduler.time_tick(),
            HostEvent::SurfaceChanged { width, height } => {
                self.surface = (width, height);
                self.scheduler.surface_changed()
            }
            HostEvent::ReloadRequested => self.scheduler.request_reload(now),
        };
        let after = self.scheduler.state();
        if before != after {
            self.system_event_sender
                .send(SystemEvent::StateChanged {
                    from: before,
                    to: after,
                })
                .ok();
        }
        commands
    }

    fn on_reload_outcome(&mut self, outcome: ReloadOutcome) -> Vec<Command> {
        let ReloadOutcome { id, result } = outcome;
        if self.scheduler.in_flight() != Some(id) {
            return self.scheduler.reload_completed(id, result);
        }
        if self.in_flight.as_ref().is_some_and(|f| f.id == id) {
            self.in_flight = None;
        }
        let event = match &result {
            Ok(events) => SystemEvent::ReloadCompleted {
                id,
                events: events.len(),
            },
            Err(e) => SystemEvent::ReloadFailed {
                id,
                reason: format!("{:#}", e),
            },
        };
        let commands = self.scheduler.reload_completed(id, result);
        self.system_event_sender.send(event).ok();
        commands
    }

    fn execute(&mut self, commands: Vec<Command>) {
        let mut redraw = false;
        for command in commands {
            match command {
                Command::Redraw => redraw = true,
                Command::ArmTimer(delay) => {
                    trace!("Timer armed for {:?}", delay);
                    self.timer.as_mut().reset(Instant::now() + delay);
                    self.timer_armed = true;
                }
                Command::DisarmTimer => {
                    trace!("Timer disarmed");
                    self.timer_armed = false;
                }
                Command::StartReload(request) => self.start_reload(request),
                Command::CancelReload(id) => self.cancel_reload(id),
            }
        }
        // Several redraw requests in one batch collapse into a single frame.
        if redraw {
            self.redraw();
        }
    }

    fn start_reload(&mut self, request: ReloadRequest) {
        let loader = Arc::clone(&self.loader);
        let sender = self.reload_sender.clone();
        let ReloadRequest {
            id,
            window_start,
            window_end,
        } = request;
        debug!("Starting {} for {} .. {}", id, window_start, window_end);
        let task = tokio::spawn(async move {
            let result = loader.load(window_start, window_end).await;
            sender.send(ReloadOutcome { id, result }).ok();
        });
        self.in_flight = Some(InFlight { id, task });
        self.system_event_sender
            .send(SystemEvent::ReloadStarted { id })
            .ok();
    }

    fn cancel_reload(&mut self, id: ReloadId) {
        match self.in_flight.take() {
            Some(in_flight) if in_flight.id == id => in_flight.task.abort(),
            other => {
                warn!("Asked to cancel {} but it is not the running reload", id);
                self.in_flight = other;
            }
        }
        self.system_event_sender
            .send(SystemEvent::ReloadDiscarded { id })
            .ok();
    }

    /// Lays out and renders the face at the current time.
    pub fn compose_frame(&self) -> Frame {
        let now = self.clock.local_now();
        let mode = self.scheduler.mode();
        let (width, height) = self.surface;
        let ops = match FaceGeometry::from_bounds(width, height) {
            Some(geometry) => {
                let events = self.scheduler.events();
                let params = self.config.layout_params(geometry.hour_hand_length());
                let wedges = layout(&events, &now, params);
                self.renderer.render(
                    &now,
                    wedges,
                    mode,
                    self.scheduler.properties(),
                    width,
                    height,
                )
            }
            None => {
                debug!("Surface {}x{} has nothing to draw", width, height);
                Vec::new()
            }
        };
        Frame { at: now, mode, ops }
    }

    fn redraw(&self) {
        let frame = self.compose_frame();
        trace!("Frame with {} ops", frame.ops.len());
        self.frame_sender.send(Arc::new(frame)).ok();
    }
}

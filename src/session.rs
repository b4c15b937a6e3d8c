// One camera session: everything that lives from "camera started" to teardown.
//
// `Controller` holds the state the input handlers touch (look parameters,
// cadence, scheduler, stats, status line) and has no window dependency.
// `Session` adds the camera worker, the render loop and the window on top.

use crate::camera::{CameraFeed, FrameSource};
use crate::config::{Config, clamp_interval};
use crate::error::Error;
use crate::input::{self, Command, PALETTE};
use crate::perf::PerfMonitor;
use crate::render::{Renderer, WindowRenderer};
use crate::render_loop::RenderLoop;
use crate::scheduler::{self, RoundEvent, Scheduler};
use crate::segment::{HttpSegmenter, Segmenter};
use crate::types::ShaderParams;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::info;

/// Longest error text shown in the status line.
const STATUS_ERROR_LIMIT: usize = 100;

pub struct Controller {
    scheduler: Scheduler,
    events: mpsc::UnboundedReceiver<RoundEvent>,
    params: ShaderParams,
    interval: Duration,
    min_interval: Duration,
    perf: PerfMonitor,
    status: String,
}

impl Controller {
    pub fn new(
        scheduler: Scheduler,
        events: mpsc::UnboundedReceiver<RoundEvent>,
        params: ShaderParams,
        interval: Duration,
        min_interval: Duration,
    ) -> Self {
        Self {
            scheduler,
            events,
            params,
            interval: interval.max(min_interval),
            min_interval,
            perf: PerfMonitor::new(Instant::now()),
            status: "Camera started. Press S to segment or Space for real-time.".to_string(),
        }
    }

    pub fn params(&self) -> &ShaderParams {
        &self.params
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn perf(&self) -> &PerfMonitor {
        &self.perf
    }

    pub fn perf_mut(&mut self) -> &mut PerfMonitor {
        &mut self.perf
    }

    /// Apply one input command. Returns false when the user asked to quit.
    pub fn apply(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Quit => return false,
            Command::ToggleRealtime => {
                if self.scheduler.is_running() {
                    self.scheduler.stop();
                    self.status = "Real-time processing stopped".to_string();
                } else {
                    self.scheduler.start(self.interval);
                    self.status = format!("Real-time processing active (every {}ms)", self.interval.as_millis());
                }
            }
            Command::SegmentOnce => {
                if self.scheduler.run_once().is_some() {
                    self.status = "Segmenting...".to_string();
                } else {
                    self.status = "Segmentation already in progress".to_string();
                }
            }
            Command::NextColor => {
                self.params.set_color(PALETTE[input::next_palette_index(self.params.color)]);
            }
            Command::ClearMask => {
                self.scheduler.clear_mask();
                self.status = "Mask cleared".to_string();
            }
            Command::Intensity(d) => self.params.nudge_intensity(d),
            Command::Glossiness(d) => self.params.nudge_glossiness(d),
            Command::Metallic(d) => self.params.nudge_metallic(d),
            Command::IntervalBy(delta) => {
                let requested = (self.interval.as_millis() as i64 + delta).max(0) as u64;
                self.interval = clamp_interval(requested, self.min_interval.as_millis() as u64);
                self.scheduler.set_interval(self.interval);
                info!("Segmentation interval set to {}ms", self.interval.as_millis());
                if self.scheduler.is_running() {
                    self.status = format!("Real-time processing active (every {}ms)", self.interval.as_millis());
                }
            }
        }
        true
    }

    /// Fold finished rounds into the stats and status line.
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.perf.record_round(&event);
            self.status = status_for(&event);
        }
    }

    /// HUD rows: stats, look, status.
    pub fn hud_lines(&self, frame_size: (usize, usize)) -> Vec<String> {
        let mode = match self.scheduler.interval() {
            Some(i) => format!("LIVE {}MS", i.as_millis()),
            None => format!("MANUAL ({}MS)", self.interval.as_millis()),
        };
        let p = &self.params;
        vec![
            format!("{} | {}X{}", self.perf.summary(), frame_size.0, frame_size.1),
            format!(
                "{} | #{:02X}{:02X}{:02X} | INT {:.0}% GLOSS {:.0}% METAL {:.0}%",
                mode,
                (p.color[0] * 255.0).round() as u8,
                (p.color[1] * 255.0).round() as u8,
                (p.color[2] * 255.0).round() as u8,
                p.intensity * 100.0,
                p.glossiness * 100.0,
                p.metallic * 100.0
            ),
            self.status.to_uppercase(),
        ]
    }
}

/// Status line text for one finished round.
pub fn status_for(event: &RoundEvent) -> String {
    match event {
        RoundEvent::Completed { nails: 0, .. } => {
            "No nails detected. Try better lighting or move closer.".to_string()
        }
        RoundEvent::Completed { nails, latency } => {
            format!("Detected {nails} nails ({}ms latency)", latency.as_millis())
        }
        RoundEvent::Failed { error, .. } => {
            let text: String = error.to_string().chars().take(STATUS_ERROR_LIMIT).collect();
            format!("Segmentation failed: {text}")
        }
    }
}

pub struct Session {
    camera: CameraFeed,
    render_loop: RenderLoop<WindowRenderer>,
    controller: Controller,
    frame_size: (usize, usize),
}

impl Session {
    /// Open the camera, wait for the first frame, open the window and wire
    /// the scheduler. Any failure here means no loop starts.
    pub fn start(config: &Config, runtime: Handle) -> Result<Self, Error> {
        config.validate()?;
        let camera = CameraFeed::open(config.camera, config.width, config.height)?;
        let frame_size = camera.wait_ready(config.ready_timeout())?;
        info!("Video dimensions: {}x{}", frame_size.0, frame_size.1);

        let source: Arc<dyn FrameSource> = camera.source();
        let http = HttpSegmenter::new(&config.endpoint, config.jpeg_quality, config.request_timeout())?;
        info!("Segmentation endpoint: {}", http.endpoint());
        let segmenter: Arc<dyn Segmenter> = Arc::new(http);

        let (mask_tx, mask_rx) = scheduler::mask_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(source.clone(), segmenter, mask_tx, event_tx, runtime);

        let renderer = WindowRenderer::new("Nail Preview", frame_size.0, frame_size.1, config.fps)?;
        let render_loop = RenderLoop::new(source, mask_rx, renderer);

        let mut controller = Controller::new(
            scheduler,
            event_rx,
            config.shader_params()?,
            config.interval(),
            config.min_interval(),
        );
        if config.realtime {
            controller.apply(Command::ToggleRealtime);
        }

        Ok(Self { camera, render_loop, controller, frame_size })
    }

    /// Drive the render loop until the window closes or Esc is pressed.
    pub fn run(&mut self) -> Result<(), Error> {
        while self.render_loop.renderer().drawer().is_open() {
            for cmd in input::poll(self.render_loop.renderer().drawer()) {
                if !self.controller.apply(cmd) {
                    return Ok(());
                }
            }
            self.controller.drain_events();

            let hud = self.controller.hud_lines(self.frame_size);
            self.render_loop.renderer_mut().set_hud(hud);

            match self.render_loop.tick(self.controller.params())? {
                Some(took) => self.controller.perf_mut().record_tick(Instant::now(), took),
                None => std::thread::sleep(Duration::from_millis(5)),
            }
        }
        Ok(())
    }

    /// Stop the trigger, release the renderer, stop the camera.
    pub fn shutdown(self) {
        let Session { mut camera, render_loop, controller, .. } = self;
        drop(controller);
        render_loop.into_renderer().destroy();
        camera.stop();
        info!("Session closed");
    }
}

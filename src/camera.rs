// Camera capture.
// A worker thread owns the nokhwa stream and keeps publishing the newest frame
// into a shared slot; anyone (render loop, scheduler) snapshots that slot.

use crate::error::Error;
use crate::types::FrameBuffer;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

// Bring in nokhwa types for camera control.
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution},
};

/// Anything that can hand out a snapshot of "what the camera shows right now".
pub trait FrameSource: Send + Sync {
    /// Current pixel dimensions, or `None` while the source is not ready.
    fn dimensions(&self) -> Option<(usize, usize)>;

    /// Independent snapshot of the current image.
    /// Fails with `SourceNotReady` until the first frame arrives.
    fn capture(&self) -> Result<FrameBuffer, Error>;
}

/// Latest decoded frame, replaced whole on every publish.
#[derive(Default)]
pub struct FrameSlot {
    latest: RwLock<Option<Arc<FrameBuffer>>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, frame: FrameBuffer) {
        *self.latest.write() = Some(Arc::new(frame));
    }
}

impl FrameSource for FrameSlot {
    fn dimensions(&self) -> Option<(usize, usize)> {
        self.latest
            .read()
            .as_ref()
            .filter(|f| f.width > 0 && f.height > 0)
            .map(|f| (f.width, f.height))
    }

    fn capture(&self) -> Result<FrameBuffer, Error> {
        // Clone the Arc under the lock, copy the pixels outside it.
        let latest = self.latest.read().clone();
        match latest {
            Some(frame) if frame.width > 0 && frame.height > 0 => Ok((*frame).clone()),
            _ => Err(Error::SourceNotReady),
        }
    }
}

// A small wrapper around nokhwa::Camera so the worker loop stays clean.
pub struct CameraCapture {
    cam: Camera,
    width: u32,
    height: u32,
}

impl CameraCapture {
    /// Open camera `index` near the requested resolution (falls back if not exact).
    pub fn new(index: u32, width: u32, height: u32) -> Result<Self, Error> {
        let idx = CameraIndex::Index(index);

        let fmt = CameraFormat::new(
            Resolution::new(width, height),
            FrameFormat::YUYV, // uncompressed; cheap to convert to RGB
            30,                // target FPS
        );

        // Ask for RGB frames, closest to our requested format.
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        let mut cam = Camera::new(idx, req)
            .map_err(|e| Error::SourceUnavailable(format!("Create camera: {e}")))?;

        cam.open_stream()
            .map_err(|e| Error::SourceUnavailable(format!("Open stream: {e}")))?;

        // The actual stream might choose a slightly different resolution.
        let actual = cam.resolution();

        Ok(Self { cam, width: actual.width(), height: actual.height() })
    }

    /// Grab one frame (blocks until the camera delivers) as 0x00RRGGBB pixels.
    pub fn next_frame(&mut self) -> Result<FrameBuffer, Error> {
        let frame = self
            .cam
            .frame()
            .map_err(|e| Error::CameraFrame(format!("Fetch frame: {e}")))?;

        let rgb_img = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::CameraFrame(format!("Decode RGB: {e}")))?;

        let (w, h) = rgb_img.dimensions();
        let pixels = rgb_img
            .pixels()
            .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32)
            .collect();

        Ok(FrameBuffer { width: w as usize, height: h as usize, pixels })
    }

    /// Report the actual resolution the camera is delivering.
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn stop(&mut self) {
        if let Err(e) = self.cam.stop_stream() {
            warn!("Stopping camera stream failed: {e}");
        }
    }
}

/// Running camera: a worker thread feeding a `FrameSlot`.
pub struct CameraFeed {
    slot: Arc<FrameSlot>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl CameraFeed {
    /// Open the camera on a dedicated thread and start pumping frames.
    /// Acquisition failures come back as `SourceUnavailable`.
    pub fn open(index: u32, width: u32, height: u32) -> Result<Self, Error> {
        let slot = Arc::new(FrameSlot::new());
        let running = Arc::new(AtomicBool::new(true));
        let (opened_tx, opened_rx) = mpsc::sync_channel::<Result<(u32, u32), Error>>(1);

        let worker = {
            let slot = slot.clone();
            let running = running.clone();
            thread::Builder::new()
                .name("camera".into())
                .spawn(move || {
                    // nokhwa handles are not Send on every backend, so open here.
                    let mut cam = match CameraCapture::new(index, width, height) {
                        Ok(cam) => {
                            let _ = opened_tx.send(Ok(cam.resolution()));
                            cam
                        }
                        Err(e) => {
                            let _ = opened_tx.send(Err(e));
                            return;
                        }
                    };

                    while running.load(Ordering::Acquire) {
                        match cam.next_frame() {
                            Ok(frame) => slot.publish(frame),
                            Err(e) => {
                                warn!("{e}");
                                thread::sleep(Duration::from_millis(10));
                            }
                        }
                    }
                    cam.stop();
                    debug!("Camera worker exited");
                })
                .map_err(|e| Error::SourceUnavailable(format!("Spawn camera thread: {e}")))?
        };

        let (w, h) = opened_rx
            .recv()
            .map_err(|_| Error::SourceUnavailable("camera thread exited during open".into()))??;
        info!("Camera {index} streaming at {w}x{h}");

        Ok(Self { slot, running, worker: Some(worker) })
    }

    /// Shared handle for the render loop and the scheduler.
    pub fn source(&self) -> Arc<FrameSlot> {
        self.slot.clone()
    }

    /// Block until the first frame arrives or `timeout` passes.
    pub fn wait_ready(&self, timeout: Duration) -> Result<(usize, usize), Error> {
        wait_for_dimensions(self.slot.as_ref(), timeout)
    }

    /// Stop the worker and join it.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Camera worker panicked");
            }
        }
    }
}

impl Drop for CameraFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Poll `source` until it reports dimensions, up to `timeout`.
pub fn wait_for_dimensions(source: &dyn FrameSource, timeout: Duration) -> Result<(usize, usize), Error> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(dims) = source.dimensions() {
            return Ok(dims);
        }
        if Instant::now() >= deadline {
            return Err(Error::SourceNotReady);
        }
        thread::sleep(Duration::from_millis(10));
    }
}

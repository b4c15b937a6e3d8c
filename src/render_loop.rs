// Per-display-tick driver: capture -> latest mask -> renderer.
// Never waits on the scheduler; whatever mask is published right now is used.

use crate::camera::FrameSource;
use crate::error::Error;
use crate::render::Renderer;
use crate::scheduler::MaskReceiver;
use crate::types::{Mask, ShaderParams};

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

pub struct RenderLoop<R: Renderer> {
    source: Arc<dyn FrameSource>,
    masks: MaskReceiver,
    renderer: R,
    empty: Mask,
    stalled: bool, // last tick found no frame; logged once per stall
}

impl<R: Renderer> RenderLoop<R> {
    pub fn new(source: Arc<dyn FrameSource>, masks: MaskReceiver, renderer: R) -> Self {
        Self { source, masks, renderer, empty: Mask::empty(0, 0), stalled: false }
    }

    /// True while the camera has stopped delivering frames.
    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Run one tick. Returns how long the composite took, or `None` when the
    /// camera has not produced a frame yet.
    pub fn tick(&mut self, params: &ShaderParams) -> Result<Option<Duration>, Error> {
        let started = Instant::now();

        let frame = match self.source.capture() {
            Ok(frame) => frame,
            Err(Error::SourceNotReady) => {
                if !self.stalled {
                    warn!("Camera frame not ready");
                    self.stalled = true;
                }
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        if self.stalled {
            info!("Camera frames resumed");
            self.stalled = false;
        }

        // Take the Arc and release the channel borrow right away.
        let published = self.masks.borrow().clone();
        let mask = match published.as_deref() {
            Some(m) if m.width == frame.width && m.height == frame.height => m,
            _ => {
                if self.empty.width != frame.width || self.empty.height != frame.height {
                    self.empty = Mask::empty(frame.width, frame.height);
                }
                &self.empty
            }
        };

        self.renderer.update_frame_texture(&frame)?;
        self.renderer.update_mask_texture(mask)?;
        self.renderer.render(params)?;

        Ok(Some(started.elapsed()))
    }

    /// Tear down and release the renderer.
    pub fn into_renderer(self) -> R {
        self.renderer
    }
}

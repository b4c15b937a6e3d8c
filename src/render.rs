// Polish compositor.
// The `Renderer` trait is the contract the render loop drives; `WindowRenderer`
// shades on the CPU in linear light and presents through minifb.

use crate::draw::{self, Drawer, LINE_HEIGHT};
use crate::error::Error;
use crate::gamma::{self, GammaLut};
use crate::types::{FrameBuffer, Mask, ShaderParams};

use tracing::debug;

/// Everything the render loop needs from a renderer. All calls are synchronous.
pub trait Renderer {
    fn update_frame_texture(&mut self, frame: &FrameBuffer) -> Result<(), Error>;
    fn update_mask_texture(&mut self, mask: &Mask) -> Result<(), Error>;
    fn render(&mut self, params: &ShaderParams) -> Result<(), Error>;
    /// Release window/GPU resources.
    fn destroy(self)
    where
        Self: Sized;
}

/// Luminance above which a pixel starts to pick up the gloss highlight.
const GLOSS_THRESHOLD: f32 = 0.45;

/// Tint `live` where `mask` is set and write the result into `out`.
///
/// Per pixel, in linear light:
/// - base tone: polish colour modulated by the underlying brightness so the
///   nail keeps its shape; `metallic` pushes the modulation harder and tints
///   the highlight with the polish colour instead of white
/// - gloss: bright pixels gain a highlight scaled by `glossiness`
/// - blend: `alpha * intensity` mixes polish over live
pub fn composite_polish(
    live: &FrameBuffer,
    mask: &Mask,
    params: &ShaderParams,
    lut: &GammaLut,
    out: &mut FrameBuffer,
) -> Result<(), Error> {
    if out.width != live.width || out.height != live.height {
        return Err(Error::CameraFrame("composite: output size mismatch".into()));
    }
    if mask.width != live.width || mask.height != live.height {
        return Err(Error::CameraFrame("composite: mask size mismatch".into()));
    }

    let color = lut.color_to_linear(params.color);
    let metallic = params.metallic;
    let highlight = [
        1.0 + metallic * (color[0] - 1.0),
        1.0 + metallic * (color[1] - 1.0),
        1.0 + metallic * (color[2] - 1.0),
    ];

    for ((dst, &src), &a) in out.pixels.iter_mut().zip(&live.pixels).zip(&mask.alpha) {
        let weight = a * params.intensity;
        if weight <= 0.0 {
            *dst = src;
            continue;
        }

        let base = lut.unpack(src);
        let lum = gamma::luminance(base);

        // Dielectric polish keeps most of its colour in shadow; metal follows the light.
        let shade = (1.0 - metallic) * (0.55 + 0.45 * lum) + metallic * (1.6 * lum).min(1.0);
        let gloss = params.glossiness * ((lum - GLOSS_THRESHOLD) / (1.0 - GLOSS_THRESHOLD)).max(0.0);

        let mut rgb = [0.0f32; 3];
        for c in 0..3 {
            let polish = color[c] * shade + gloss * highlight[c];
            rgb[c] = weight * polish.min(1.0) + (1.0 - weight) * base[c];
        }
        *dst = lut.pack(rgb);
    }
    Ok(())
}

/// CPU renderer that owns the window.
pub struct WindowRenderer {
    drawer: Drawer,
    lut: GammaLut,
    frame: FrameBuffer,
    mask: Mask,
    screen: FrameBuffer,
    hud: Vec<String>,
}

impl WindowRenderer {
    pub fn new(title: &str, width: usize, height: usize, fps: usize) -> Result<Self, Error> {
        Ok(Self {
            drawer: Drawer::new(title, width, height, fps)?,
            lut: GammaLut::new(),
            frame: FrameBuffer::blank(width, height),
            mask: Mask::empty(width, height),
            screen: FrameBuffer::blank(width, height),
            hud: Vec::new(),
        })
    }

    /// Window handle for input polling.
    pub fn drawer(&self) -> &Drawer {
        &self.drawer
    }

    /// Text rows drawn over the video on the next `render`.
    pub fn set_hud(&mut self, lines: Vec<String>) {
        self.hud = lines;
    }

    fn draw_hud(&mut self) {
        if self.hud.is_empty() {
            return;
        }
        let width = self.hud.iter().map(|l| draw::text_width(l)).max().unwrap_or(0);
        let height = self.hud.len() as i32 * LINE_HEIGHT;
        draw::shade_rect(&mut self.screen, 4, 4, width + 8, height + 6);
        for (i, line) in self.hud.iter().enumerate() {
            draw::draw_text_5x7(&mut self.screen, 8, 8 + i as i32 * LINE_HEIGHT, line, 0x00_FF_FF_FF);
        }
    }
}

impl Renderer for WindowRenderer {
    fn update_frame_texture(&mut self, frame: &FrameBuffer) -> Result<(), Error> {
        if frame.width != self.frame.width || frame.height != self.frame.height {
            debug!("Frame size changed to {}x{}", frame.width, frame.height);
            self.screen = FrameBuffer::blank(frame.width, frame.height);
        }
        self.frame.clone_from(frame);
        Ok(())
    }

    fn update_mask_texture(&mut self, mask: &Mask) -> Result<(), Error> {
        self.mask.clone_from(mask);
        Ok(())
    }

    fn render(&mut self, params: &ShaderParams) -> Result<(), Error> {
        if self.mask.width == self.frame.width && self.mask.height == self.frame.height {
            composite_polish(&self.frame, &self.mask, params, &self.lut, &mut self.screen)?;
        } else {
            self.screen.pixels.copy_from_slice(&self.frame.pixels);
        }
        self.draw_hud();
        self.drawer.present(&self.screen)
    }

    fn destroy(self) {
        debug!("Renderer destroyed");
    }
}

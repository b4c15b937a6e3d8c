// Core types shared by capture, segmentation, mask building and rendering.

/// One snapshot of the live camera image (VideoFrame).
/// Immutable once captured; handed by value to whoever consumes it.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameBuffer {
    pub width: usize,      // how wide the frame is on screen (pixels)
    pub height: usize,     // how tall the frame is on screen (pixels)
    pub pixels: Vec<u32>,  // each entry is 0x00RRGGBB for minifb
}

impl FrameBuffer {
    /// A black frame of the given size.
    pub fn blank(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![0u32; width * height] }
    }

    /// Packed 0x00RRGGBB -> tightly packed RGB8 bytes (for encoders).
    pub fn to_rgb8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 3);
        for px in &self.pixels {
            out.push(((px >> 16) & 0xFF) as u8);
            out.push(((px >> 8) & 0xFF) as u8);
            out.push((px & 0xFF) as u8);
        }
        out
    }
}

/// Occupancy in [0,1] per pixel; 1 = polish is applied, 0 = raw live camera.
#[derive(Clone, Debug, PartialEq)]
pub struct Mask {
    pub width: usize,
    pub height: usize,
    pub alpha: Vec<f32>,   // length = width * height, values clamped to [0.0, 1.0]
}

impl Mask {
    /// All-zero mask: "no regions to tint".
    pub fn empty(width: usize, height: usize) -> Self {
        Self { width, height, alpha: vec![0.0; width * height] }
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f32 {
        self.alpha[y * self.width + x]
    }

    pub fn is_blank(&self) -> bool {
        self.alpha.iter().all(|a| *a <= 0.0)
    }
}

/// Closed outline of one nail in source-frame pixel space.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    pub points: Vec<(f32, f32)>,
}

impl Polygon {
    /// Pairs up a flat `[x0, y0, x1, y1, ...]` array.
    /// Returns `None` for an odd number of coordinates.
    pub fn from_flat(coords: &[f32]) -> Option<Self> {
        if coords.len() % 2 != 0 {
            return None;
        }
        let points = coords.chunks_exact(2).map(|c| (c[0], c[1])).collect();
        Some(Self { points })
    }

    /// Fewer than 3 points cannot enclose an area.
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 3
    }
}

/// One detected nail as reported by the segmentation service.
#[derive(Clone, Debug, PartialEq)]
pub struct Nail {
    pub id: Option<u32>,
    pub score: Option<f32>,
    pub polygon: Polygon,
}

/// Every nail found in one frame. Empty is a valid result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NailSet {
    /// Size of the image the service ran on, when it reports one.
    pub source_size: Option<(u32, u32)>,
    pub nails: Vec<Nail>,
}

impl NailSet {
    pub fn from_polygons(polygons: Vec<Polygon>) -> Self {
        let nails = polygons
            .into_iter()
            .map(|polygon| Nail { id: None, score: None, polygon })
            .collect();
        Self { source_size: None, nails }
    }

    /// Number of nails that actually enclose an area.
    pub fn detected(&self) -> usize {
        self.nails.iter().filter(|n| !n.polygon.is_degenerate()).count()
    }
}

/// Live look of the polish. Every field is kept in [0,1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShaderParams {
    pub color: [f32; 3],
    pub intensity: f32,
    pub glossiness: f32,
    pub metallic: f32,
}

impl Default for ShaderParams {
    fn default() -> Self {
        Self {
            color: [0.76, 0.09, 0.36], // #c2185b, a deep pink
            intensity: 0.8,
            glossiness: 0.6,
            metallic: 0.2,
        }
    }
}

impl ShaderParams {
    /// Build from raw input values, clamping at the boundary.
    pub fn new(color: [f32; 3], intensity: f32, glossiness: f32, metallic: f32) -> Self {
        Self {
            color: color.map(clamp01),
            intensity: clamp01(intensity),
            glossiness: clamp01(glossiness),
            metallic: clamp01(metallic),
        }
    }

    pub fn set_color(&mut self, color: [f32; 3]) {
        self.color = color.map(clamp01);
    }

    pub fn nudge_intensity(&mut self, delta: f32) {
        self.intensity = clamp01(self.intensity + delta);
    }

    pub fn nudge_glossiness(&mut self, delta: f32) {
        self.glossiness = clamp01(self.glossiness + delta);
    }

    pub fn nudge_metallic(&mut self, delta: f32) {
        self.metallic = clamp01(self.metallic + delta);
    }
}

#[inline]
pub fn clamp01(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

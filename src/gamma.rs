// sRGB <-> linear-light conversion through lookup tables.
// The compositor shades in linear light so tinted edges blend without dark halos.

pub struct GammaLut {
    // sRGB(0..255) -> linear (0..1)
    srgb_to_linear: [f32; 256],
    // linear(0..1) -> sRGB(0..255), index = (linear * 4095).round()
    linear_to_srgb: [u8; 4096],
}

impl Default for GammaLut {
    fn default() -> Self {
        Self::new()
    }
}

impl GammaLut {
    /// Build both tables once at startup.
    pub fn new() -> Self {
        let mut s2l = [0.0f32; 256];
        for (v, slot) in s2l.iter_mut().enumerate() {
            let c = v as f32 / 255.0;
            *slot = if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) };
        }

        let mut l2s = [0u8; 4096];
        for (i, slot) in l2s.iter_mut().enumerate() {
            let l = i as f32 / 4095.0;
            let s = if l <= 0.003_130_8 { 12.92 * l } else { 1.055 * l.powf(1.0 / 2.4) - 0.055 };
            *slot = (s * 255.0).round().clamp(0.0, 255.0) as u8;
        }

        Self { srgb_to_linear: s2l, linear_to_srgb: l2s }
    }

    #[inline]
    pub fn to_linear(&self, v: u8) -> f32 {
        self.srgb_to_linear[v as usize]
    }

    #[inline]
    pub fn to_srgb(&self, l: f32) -> u8 {
        let idx = (l.clamp(0.0, 1.0) * 4095.0).round() as usize;
        self.linear_to_srgb[idx]
    }

    /// 0x00RRGGBB -> linear RGB.
    #[inline]
    pub fn unpack(&self, px: u32) -> [f32; 3] {
        [
            self.to_linear(((px >> 16) & 0xFF) as u8),
            self.to_linear(((px >> 8) & 0xFF) as u8),
            self.to_linear((px & 0xFF) as u8),
        ]
    }

    /// Linear RGB -> 0x00RRGGBB.
    #[inline]
    pub fn pack(&self, rgb: [f32; 3]) -> u32 {
        let [r, g, b] = rgb.map(|c| self.to_srgb(c) as u32);
        (r << 16) | (g << 8) | b
    }

    /// Normalised sRGB colour (e.g. from a colour picker) -> linear.
    pub fn color_to_linear(&self, color: [f32; 3]) -> [f32; 3] {
        color.map(|c| self.to_linear((c.clamp(0.0, 1.0) * 255.0).round() as u8))
    }
}

/// Rec. 709 relative luminance of a linear colour.
#[inline]
pub fn luminance(rgb: [f32; 3]) -> f32 {
    0.2126 * rgb[0] + 0.7152 * rgb[1] + 0.0722 * rgb[2]
}

// Command-line / environment configuration.

use crate::error::Error;
use crate::segment::DEFAULT_JPEG_QUALITY;
use crate::types::ShaderParams;

use std::time::Duration;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "nail-preview", about = "Live virtual nail polish over a camera feed")]
pub struct Config {
    /// Segmentation endpoint (multipart POST, field `file`)
    #[arg(long, env = "NAIL_ENDPOINT", default_value = "http://127.0.0.1:8000/api/nails/segment")]
    pub endpoint: String,

    /// Camera device index
    #[arg(long, default_value_t = 0)]
    pub camera: u32,

    /// Requested capture width (the camera may pick something close)
    #[arg(long, default_value_t = 640)]
    pub width: u32,

    /// Requested capture height
    #[arg(long, default_value_t = 480)]
    pub height: u32,

    /// Display refresh target
    #[arg(long, default_value_t = 60)]
    pub fps: usize,

    /// Period between real-time segmentation rounds
    #[arg(long, env = "NAIL_INTERVAL_MS", default_value_t = 500)]
    pub interval_ms: u64,

    /// Lowest interval accepted, to avoid flooding the endpoint
    #[arg(long, default_value_t = 100)]
    pub min_interval_ms: u64,

    /// JPEG quality for uploads (1-100)
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
    pub jpeg_quality: u8,

    /// Per-request timeout
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// How long to wait for the first camera frame
    #[arg(long, default_value_t = 5)]
    pub ready_timeout_secs: u64,

    /// Polish colour, `#rrggbb` or `#rgb`
    #[arg(long, default_value = "#c2185b")]
    pub color: String,

    /// Polish intensity in percent
    #[arg(long, default_value_t = 80)]
    pub intensity: u8,

    /// Glossiness in percent
    #[arg(long, default_value_t = 60)]
    pub glossiness: u8,

    /// Metallic look in percent
    #[arg(long, default_value_t = 20)]
    pub metallic: u8,

    /// Start real-time segmentation as soon as the camera is up
    #[arg(long)]
    pub realtime: bool,
}

impl Config {
    pub fn validate(&self) -> Result<(), Error> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Config(format!("invalid resolution {}x{}", self.width, self.height)));
        }
        if self.fps == 0 {
            return Err(Error::Config("fps must be positive".into()));
        }
        if self.min_interval_ms == 0 {
            return Err(Error::Config("min-interval-ms must be positive".into()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::Config(format!("jpeg-quality {} not in 1..=100", self.jpeg_quality)));
        }
        for (name, v) in [("intensity", self.intensity), ("glossiness", self.glossiness), ("metallic", self.metallic)] {
            if v > 100 {
                return Err(Error::Config(format!("{name} {v} not in 0..=100")));
            }
        }
        parse_hex_color(&self.color)?;
        Ok(())
    }

    /// Requested interval raised to the configured floor.
    pub fn interval(&self) -> Duration {
        clamp_interval(self.interval_ms, self.min_interval_ms)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    /// Initial look, normalised from the percent sliders.
    pub fn shader_params(&self) -> Result<ShaderParams, Error> {
        Ok(ShaderParams::new(
            parse_hex_color(&self.color)?,
            self.intensity as f32 / 100.0,
            self.glossiness as f32 / 100.0,
            self.metallic as f32 / 100.0,
        ))
    }
}

pub fn clamp_interval(requested_ms: u64, floor_ms: u64) -> Duration {
    Duration::from_millis(requested_ms.max(floor_ms).max(1))
}

/// `#rrggbb` / `rrggbb` / `#rgb` -> normalised RGB.
pub fn parse_hex_color(hex: &str) -> Result<[f32; 3], Error> {
    let s = hex.trim();
    let s = s.strip_prefix('#').unwrap_or(s);
    let expanded: String = match s.len() {
        3 => s.chars().flat_map(|c| [c, c]).collect(),
        6 => s.to_string(),
        _ => return Err(Error::Config(format!("bad colour {hex:?}"))),
    };
    let num = u32::from_str_radix(&expanded, 16).map_err(|_| Error::Config(format!("bad colour {hex:?}")))?;
    Ok([
        ((num >> 16) & 0xFF) as f32 / 255.0,
        ((num >> 8) & 0xFF) as f32 / 255.0,
        (num & 0xFF) as f32 / 255.0,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Config {
        Config::parse_from(["nail-preview"])
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = defaults();
        cfg.validate().unwrap();
        assert_eq!(cfg.interval(), Duration::from_millis(500));
        assert_eq!(cfg.jpeg_quality, 60);
        assert!(!cfg.realtime);
    }

    #[test]
    fn interval_is_floored() {
        let cfg = Config::parse_from(["nail-preview", "--interval-ms", "20", "--min-interval-ms", "150"]);
        assert_eq!(cfg.interval(), Duration::from_millis(150));
        assert_eq!(clamp_interval(0, 0), Duration::from_millis(1));
    }

    #[test]
    fn parses_hex_colors() {
        assert_eq!(parse_hex_color("#ff0000").unwrap(), [1.0, 0.0, 0.0]);
        assert_eq!(parse_hex_color("00ff00").unwrap(), [0.0, 1.0, 0.0]);
        assert_eq!(parse_hex_color("#00f").unwrap(), [0.0, 0.0, 1.0]);
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#gg0000").is_err());
    }

    #[test]
    fn percent_inputs_are_normalised() {
        let cfg = Config::parse_from(["nail-preview", "--intensity", "50", "--metallic", "100", "--color", "#fff"]);
        let p = cfg.shader_params().unwrap();
        assert_eq!(p.intensity, 0.5);
        assert_eq!(p.metallic, 1.0);
        assert_eq!(p.color, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn rejects_bad_values() {
        for args in [
            &["nail-preview", "--width", "0"][..],
            &["nail-preview", "--jpeg-quality", "0"],
            &["nail-preview", "--glossiness", "101"],
            &["nail-preview", "--color", "pink"],
            &["nail-preview", "--min-interval-ms", "0"],
        ] {
            let cfg = Config::parse_from(args);
            assert!(matches!(cfg.validate(), Err(Error::Config(_))), "{args:?}");
        }
    }
}

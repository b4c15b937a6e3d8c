// Segmentation client: JPEG-encode a frame, upload it, decode nail polygons.

use crate::error::Error;
use crate::types::{FrameBuffer, Nail, NailSet, Polygon};

use std::time::Duration;

use async_trait::async_trait;
use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

/// Upload quality: biased toward small payloads since this runs repeatedly.
pub const DEFAULT_JPEG_QUALITY: u8 = 60;

/// Longest service error body kept for reporting.
const ERROR_BODY_LIMIT: usize = 100;

/// Remote nail segmentation.
///
/// One call is one round-trip; implementations do not retry.
#[async_trait]
pub trait Segmenter: Send + Sync {
    async fn segment(&self, frame: FrameBuffer) -> Result<NailSet, Error>;
}

/// `POST <endpoint>` with a multipart `file` field holding a JPEG.
pub struct HttpSegmenter {
    client: Client,
    endpoint: String,
    quality: u8,
}

impl HttpSegmenter {
    pub fn new(endpoint: impl Into<String>, quality: u8, timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {e}")))?;
        Ok(Self { client, endpoint: endpoint.into(), quality: quality.clamp(1, 100) })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Segmenter for HttpSegmenter {
    async fn segment(&self, frame: FrameBuffer) -> Result<NailSet, Error> {
        let jpeg = encode_jpeg(&frame, self.quality)?;
        debug!(
            "Uploading {}x{} frame ({:.1}KB) to {}",
            frame.width,
            frame.height,
            jpeg.len() as f32 / 1024.0,
            self.endpoint
        );
        drop(frame);

        let part = Part::bytes(jpeg).file_name("frame.jpg").mime_str("image/jpeg")?;
        let form = Form::new().part("file", part);

        let response = self.client.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        interpret_response(status, &body)
    }
}

/// Compress a frame to JPEG at `quality` (1..=100).
pub fn encode_jpeg(frame: &FrameBuffer, quality: u8) -> Result<Vec<u8>, Error> {
    if frame.width == 0 || frame.height == 0 {
        return Err(Error::Encode(format!("empty frame {}x{}", frame.width, frame.height)));
    }
    let rgb = frame.to_rgb8();
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    encoder.encode(&rgb, frame.width as u32, frame.height as u32, ExtendedColorType::Rgb8)?;
    Ok(out)
}

/// Turn a status + body into a `NailSet` or the matching error.
pub fn interpret_response(status: StatusCode, body: &str) -> Result<NailSet, Error> {
    if !status.is_success() {
        return Err(Error::Service { status: status.as_u16(), body: truncate(body, ERROR_BODY_LIMIT) });
    }
    decode_nails(body)
}

#[derive(Deserialize)]
struct NailResponse {
    width: Option<u32>,
    height: Option<u32>,
    nails: Vec<NailInstance>,
}

#[derive(Deserialize)]
struct NailInstance {
    id: Option<u32>,
    score: Option<f32>,
    polygon: Vec<f32>,
}

/// Parse the success body `{"nails": [{"polygon": [x0, y0, ...]}, ...]}`.
pub fn decode_nails(body: &str) -> Result<NailSet, Error> {
    let response: NailResponse =
        serde_json::from_str(body).map_err(|e| Error::Decode(e.to_string()))?;

    let nails = response
        .nails
        .into_iter()
        .enumerate()
        .map(|(i, n)| {
            let polygon = Polygon::from_flat(&n.polygon).ok_or_else(|| {
                Error::Decode(format!("nail {i}: polygon has odd length {}", n.polygon.len()))
            })?;
            Ok(Nail { id: n.id, score: n.score, polygon })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let source_size = match (response.width, response.height) {
        (Some(w), Some(h)) => Some((w, h)),
        _ => None,
    };
    Ok(NailSet { source_size, nails })
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

//! Remote inference over HTTP.
//!
//! The image is sent as an in-memory JPEG body in a synchronous POST; the
//! endpoint replies with JSON label/confidence pairs. Label strings are
//! interned into a per-detector table so remote results flow through the
//! same aggregation contract as local ones.

use anyhow::{anyhow, bail, Context, Result};
use image::DynamicImage;
use serde::Deserialize;
use std::io::Cursor;
use std::time::Duration;

use crate::detection::Detection;
use crate::detector::Detector;
use crate::labels::LabelTable;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Wire format returned by the inference endpoint.
#[derive(Debug, Deserialize)]
pub struct RemoteResponse {
    pub detections: Vec<RemoteDetection>,
}

#[derive(Debug, Deserialize)]
pub struct RemoteDetection {
    pub label: String,
    pub confidence: f32,
}

pub struct RemoteDetector {
    client: reqwest::blocking::Client,
    endpoint: String,
    labels: LabelTable,
}

impl RemoteDetector {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            labels: LabelTable::from_names(Vec::new()),
        })
    }

    /// Encode the image as JPEG entirely in memory; JPEG has no alpha, so
    /// flatten to RGB first.
    fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image.to_rgb8())
            .write_to(&mut buffer, image::ImageFormat::Jpeg)
            .context("failed to encode image as JPEG")?;
        Ok(buffer.into_inner())
    }

    fn map_detections(&mut self, remote: Vec<RemoteDetection>) -> Vec<Detection> {
        remote
            .into_iter()
            .map(|d| Detection {
                class_id: self.labels.intern(&d.label),
                confidence: d.confidence,
                bbox: None,
            })
            .collect()
    }
}

impl Detector for RemoteDetector {
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let body = Self::encode_jpeg(image)?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(body)
            .send()
            .map_err(|e| anyhow!("inference endpoint unreachable: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("inference endpoint returned {status}");
        }

        let parsed: RemoteResponse = response
            .json()
            .context("malformed response from inference endpoint")?;

        Ok(self.map_detections(parsed.detections))
    }

    fn label(&self, class_id: u32) -> Option<&str> {
        self.labels.resolve(class_id)
    }

    fn describe(&self) -> String {
        format!("remote endpoint {}", self.endpoint)
    }
}

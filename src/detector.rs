use anyhow::Result;
use image::DynamicImage;

use crate::detection::Detection;

/// A configured inference backend. Construction is the expensive part
/// (session build or HTTP client setup), so a detector is built once per run
/// and reused for every input image.
pub trait Detector {
    /// Raw detections for one image, in the backend's native order.
    /// Confidence thresholding happens later, in the aggregator.
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<Detection>>;

    /// Resolve a class id against this detector's label table.
    fn label(&self, class_id: u32) -> Option<&str>;

    /// Short human-readable description for logging.
    fn describe(&self) -> String;
}

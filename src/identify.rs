//! The identification pipeline: collect inputs, build a detector once, then
//! per image run inference, aggregate, and report.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::aggregate::aggregate;
use crate::annotate::save_annotated_image;
use crate::color_utils::symbols;
use crate::config::IdentifyConfig;
use crate::detection::Detection;
use crate::detector::Detector;
use crate::image_input::collect_images;
use crate::labels::LabelTable;
use crate::model_access::resolve_model_path;
use crate::onnx_session::determine_optimal_device;
use crate::remote::RemoteDetector;
use crate::report::{format_messages, NO_DETECTION_MESSAGE};
use crate::yolo::LocalDetector;

/// Build the configured inference backend. This is the expensive step; the
/// returned detector is shared across every image in the batch.
pub fn build_detector(config: &IdentifyConfig) -> Result<Box<dyn Detector>> {
    if let Some(endpoint) = &config.endpoint {
        return Ok(Box::new(RemoteDetector::new(endpoint)?));
    }

    let labels = match &config.labels_path {
        Some(path) => LabelTable::from_file(Path::new(path))?,
        None => LabelTable::product_defaults(),
    };

    let model_path = resolve_model_path(
        config.model_path.as_deref(),
        config.model_url.as_deref(),
        config.model_checksum.as_deref(),
    )?;

    let selection = determine_optimal_device(&config.device);
    log::debug!("⚙️  Device: {} ({})", selection.device, selection.reason);

    let detector = LocalDetector::load(&model_path, &selection.device, labels)?;
    Ok(Box::new(detector))
}

/// Process every input image sequentially. Returns the number of images
/// identified successfully.
pub fn run_identification(config: IdentifyConfig) -> Result<usize> {
    let batch_start = Instant::now();

    let image_files = collect_images(&config.sources, config.strict)?;
    if image_files.is_empty() {
        log::warn!("{}No valid images found to process", symbols::warning());
        return Ok(0);
    }
    log::info!(
        "{} Found {} image(s) to process",
        symbols::resources_found(),
        image_files.len()
    );

    let load_start = Instant::now();
    let mut detector = build_detector(&config)?;
    log::debug!(
        "⚡ Detector ready in {:.1} ms: {}",
        load_start.elapsed().as_secs_f64() * 1000.0,
        detector.describe()
    );

    let mut successful_count = 0;
    let mut failed_count = 0;

    for (index, image_path) in image_files.iter().enumerate() {
        match identify_single_image(detector.as_mut(), image_path, &config) {
            Ok(()) => {
                successful_count += 1;
                log::debug!(
                    "{} Processed {} ({}/{})",
                    symbols::completed_successfully(),
                    image_path.display(),
                    index + 1,
                    image_files.len()
                );
            }
            Err(e) => {
                failed_count += 1;
                if config.strict {
                    return Err(e);
                }
                log::warn!(
                    "{}Failed to process {} ({}/{}): {e}",
                    symbols::warning(),
                    image_path.display(),
                    index + 1,
                    image_files.len()
                );
            }
        }
    }

    if successful_count > 0 {
        log::info!(
            "{} Identified products in {} image(s) in {:.1}s",
            symbols::completed_successfully(),
            successful_count,
            batch_start.elapsed().as_secs_f64()
        );
    }
    if failed_count > 0 {
        log::warn!(
            "{}{failed_count} of {} images failed to process",
            symbols::warning(),
            image_files.len()
        );
    }

    Ok(successful_count)
}

fn identify_single_image(
    detector: &mut dyn Detector,
    image_path: &Path,
    config: &IdentifyConfig,
) -> Result<()> {
    let processing_start = Instant::now();

    let img = image::open(image_path)
        .with_context(|| format!("failed to read image {}", image_path.display()))?;

    let detections = detector.detect(&img)?;
    log::debug!(
        "📊 {} raw detection(s) for {}",
        detections.len(),
        image_path.display()
    );

    let summaries = aggregate(
        &detections,
        |class_id| detector.label(class_id).map(str::to_string),
        config.confidence,
    )?;

    if summaries.is_empty() {
        log::warn!(
            "{}{}: {NO_DETECTION_MESSAGE}",
            symbols::warning(),
            image_path.display()
        );
    } else {
        for message in format_messages(&summaries) {
            println!("{}: {message}", image_path.display());
        }
    }

    if config.annotated {
        let reported: Vec<Detection> = detections
            .iter()
            .filter(|d| d.confidence >= config.confidence)
            .cloned()
            .collect();
        if !reported.is_empty() {
            let output = annotated_output_path(image_path, config.output_dir.as_deref());
            save_annotated_image(&img, &reported, &output)?;
            log::info!(
                "{} Annotated image saved to: {}",
                symbols::save_file(),
                output.display()
            );
        }
    }

    log::debug!(
        "⚡ Processed {} in {:.1} ms",
        image_path.display(),
        processing_start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(())
}

/// PNG inputs keep PNG output to preserve fidelity; everything else gets JPG.
fn output_extension(input_path: &Path) -> &'static str {
    match input_path.extension() {
        Some(ext) if ext.to_string_lossy().to_lowercase() == "png" => "png",
        _ => "jpg",
    }
}

fn annotated_output_path(image_path: &Path, output_dir: Option<&str>) -> PathBuf {
    let stem = image_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let file_name = format!("{stem}_detections.{}", output_extension(image_path));

    match output_dir {
        Some(dir) => Path::new(dir).join(file_name),
        None => image_path.with_file_name(file_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotated_output_next_to_input() {
        let path = annotated_output_path(Path::new("/photos/shelf.jpg"), None);
        assert_eq!(path, PathBuf::from("/photos/shelf_detections.jpg"));
    }

    #[test]
    fn test_annotated_output_respects_output_dir() {
        let path = annotated_output_path(Path::new("/photos/shelf.png"), Some("/out"));
        assert_eq!(path, PathBuf::from("/out/shelf_detections.png"));
    }

    #[test]
    fn test_output_extension_preserves_png() {
        assert_eq!(output_extension(Path::new("a.PNG")), "png");
        assert_eq!(output_extension(Path::new("a.webp")), "jpg");
        assert_eq!(output_extension(Path::new("a")), "jpg");
    }
}

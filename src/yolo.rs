//! Local inference against a YOLO-style ONNX product model.
//!
//! Preprocessing letterboxes the image to the model's square input size;
//! postprocessing turns the raw `[1, 4+C, N]` output into detections with
//! per-box class argmax and class-wise NMS. The configured confidence
//! threshold is NOT applied here; the aggregator owns filtering.

use anyhow::{anyhow, bail, Result};
use image::{DynamicImage, GenericImageView};
use ndarray::Array;
use ort::{session::Session, value::Value};
use std::path::{Path, PathBuf};

use crate::detection::{nms, BoundingBox, Detection};
use crate::detector::Detector;
use crate::labels::LabelTable;
use crate::onnx_session::create_session;

/// Score floor for pulling candidate boxes out of the raw output. Low enough
/// to sit under any sensible reporting threshold.
const CANDIDATE_FLOOR: f32 = 0.05;

const IOU_THRESHOLD: f32 = 0.45;

pub struct LocalDetector {
    session: Session,
    labels: LabelTable,
    input_size: u32,
    model_path: PathBuf,
}

impl LocalDetector {
    pub fn load(model_path: &Path, device: &str, labels: LabelTable) -> Result<Self> {
        if labels.is_empty() {
            bail!("label table is empty; the local model needs at least one class name");
        }
        let session = create_session(model_path, device)?;
        let input_size = input_size_from_session(&session);
        log::debug!("⚙️  Model input size: {input_size}x{input_size}");
        Ok(Self {
            session,
            labels,
            input_size,
            model_path: model_path.to_path_buf(),
        })
    }
}

fn input_size_from_session(session: &Session) -> u32 {
    let input_md = &session.inputs[0];
    match &input_md.input_type {
        ort::value::ValueType::Tensor {
            ty: _,
            shape,
            dimension_symbols: _,
        } => {
            // [batch, channels, height, width]; assume square input
            shape
                .get(3)
                .copied()
                .filter(|&dim| dim > 0)
                .unwrap_or(640) as u32
        }
        _ => {
            log::debug!(
                "Unexpected input type: {:?}. Defaulting to 640x640",
                input_md.input_type
            );
            640
        }
    }
}

/// Letterbox the image into a normalized NCHW f32 tensor.
pub fn preprocess_image(
    img: &DynamicImage,
    target_size: u32,
) -> Result<Array<f32, ndarray::IxDyn>> {
    let rgb_img = img.to_rgb8();
    let (orig_width, orig_height) = rgb_img.dimensions();

    let max_dim = orig_width.max(orig_height);
    let scale = (target_size as f32) / (max_dim as f32);
    let new_width = (orig_width as f32 * scale) as u32;
    let new_height = (orig_height as f32 * scale) as u32;

    let resized = image::imageops::resize(
        &rgb_img,
        new_width,
        new_height,
        image::imageops::FilterType::Lanczos3,
    );

    // Gray padding around the centered resize
    let mut letterboxed = image::RgbImage::new(target_size, target_size);
    for pixel in letterboxed.pixels_mut() {
        *pixel = image::Rgb([114, 114, 114]);
    }

    let x_offset = (target_size - new_width) / 2;
    let y_offset = (target_size - new_height) / 2;

    for y in 0..new_height {
        for x in 0..new_width {
            let src_pixel = resized.get_pixel(x, y);
            letterboxed.put_pixel(x + x_offset, y + y_offset, *src_pixel);
        }
    }

    let mut input_data = Vec::with_capacity((3 * target_size * target_size) as usize);
    for c in 0..3 {
        for y in 0..target_size {
            for x in 0..target_size {
                let pixel = letterboxed.get_pixel(x, y);
                input_data.push(pixel[c] as f32 / 255.0);
            }
        }
    }

    let input = Array::from_shape_vec(
        ndarray::IxDyn(&[1, 3, target_size as usize, target_size as usize]),
        input_data,
    )?;

    Ok(input)
}

/// Turn the raw `[1, 4+C, N]` model output into detections in original-image
/// coordinates. The letterbox transform from preprocessing is inverted here.
pub fn postprocess_output(
    output: &Array<f32, ndarray::IxDyn>,
    img_width: u32,
    img_height: u32,
    model_size: u32,
) -> Result<Vec<Detection>> {
    let shape = output.shape();
    if shape.len() != 3 {
        bail!("expected 3D model output, got {}D", shape.len());
    }
    if shape[1] < 5 {
        bail!(
            "model output has {} channels; need at least 4 box values plus one class",
            shape[1]
        );
    }
    let num_classes = shape[1] - 4;
    let num_boxes = shape[2];

    let max_dim = img_width.max(img_height) as f32;
    let scale = model_size as f32 / max_dim;
    let x_offset = (model_size as f32 - img_width as f32 * scale) / 2.0;
    let y_offset = (model_size as f32 - img_height as f32 * scale) / 2.0;

    let mut detections = Vec::new();

    for i in 0..num_boxes {
        let x_center = output[[0, 0, i]];
        let y_center = output[[0, 1, i]];
        let width = output[[0, 2, i]];
        let height = output[[0, 3, i]];

        let mut max_confidence = 0.0;
        let mut best_class_id = 0u32;
        for class_idx in 0..num_classes {
            let class_confidence = output[[0, 4 + class_idx, i]];
            if class_confidence > max_confidence {
                max_confidence = class_confidence;
                best_class_id = class_idx as u32;
            }
        }

        if max_confidence < CANDIDATE_FLOOR {
            continue;
        }

        // Model coordinates -> original image coordinates
        let x1 = ((x_center - width / 2.0) - x_offset) / scale;
        let y1 = ((y_center - height / 2.0) - y_offset) / scale;
        let x2 = ((x_center + width / 2.0) - x_offset) / scale;
        let y2 = ((y_center + height / 2.0) - y_offset) / scale;

        detections.push(Detection {
            class_id: best_class_id,
            confidence: max_confidence,
            bbox: Some(BoundingBox {
                x1: x1.clamp(0.0, img_width as f32),
                y1: y1.clamp(0.0, img_height as f32),
                x2: x2.clamp(0.0, img_width as f32),
                y2: y2.clamp(0.0, img_height as f32),
            }),
        });
    }

    let mut detections = nms(detections, IOU_THRESHOLD);
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    Ok(detections)
}

impl Detector for LocalDetector {
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let (orig_width, orig_height) = image.dimensions();

        let input_tensor = preprocess_image(image, self.input_size)?;
        let input_value = Value::from_array(input_tensor)
            .map_err(|e| anyhow!("failed to create input value: {e}"))?;

        let outputs = self
            .session
            .run(ort::inputs!["images" => &input_value])
            .map_err(|e| anyhow!("inference failed: {e}"))?;

        let output_view = outputs["output0"]
            .try_extract_array::<f32>()
            .map_err(|e| anyhow!("failed to extract output array: {e}"))?;
        let output =
            Array::from_shape_vec(output_view.shape(), output_view.iter().cloned().collect())?;

        postprocess_output(&output, orig_width, orig_height, self.input_size)
    }

    fn label(&self, class_id: u32) -> Option<&str> {
        self.labels.resolve(class_id)
    }

    fn describe(&self) -> String {
        format!("local model {}", self.model_path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_shape_and_range() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            100,
            50,
            image::Rgb([255, 0, 0]),
        ));
        let tensor = preprocess_image(&img, 64).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 64, 64]);
        assert!(tensor.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_preprocess_letterbox_pads_with_gray() {
        // A wide image letterboxed into a square leaves gray rows on top
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            100,
            50,
            image::Rgb([255, 255, 255]),
        ));
        let tensor = preprocess_image(&img, 64).unwrap();
        // Top-left corner is padding: 114/255 on every channel
        let expected = 114.0 / 255.0;
        assert!((tensor[[0, 0, 0, 0]] - expected).abs() < 1e-6);
        // Center is image content: white
        assert!((tensor[[0, 0, 32, 32]] - 1.0).abs() < 1e-6);
    }

    /// Build a `[1, 4+C, N]` output array from (cx, cy, w, h, per-class scores).
    fn synthetic_output(boxes: &[(f32, f32, f32, f32, Vec<f32>)]) -> Array<f32, ndarray::IxDyn> {
        let num_classes = boxes[0].4.len();
        let num_boxes = boxes.len();
        let mut data = vec![0.0; (4 + num_classes) * num_boxes];
        for (i, (cx, cy, w, h, scores)) in boxes.iter().enumerate() {
            data[i] = *cx;
            data[num_boxes + i] = *cy;
            data[2 * num_boxes + i] = *w;
            data[3 * num_boxes + i] = *h;
            for (c, score) in scores.iter().enumerate() {
                data[(4 + c) * num_boxes + i] = *score;
            }
        }
        Array::from_shape_vec(ndarray::IxDyn(&[1, 4 + num_classes, num_boxes]), data).unwrap()
    }

    #[test]
    fn test_postprocess_picks_argmax_class() {
        let output = synthetic_output(&[(320.0, 320.0, 100.0, 100.0, vec![0.1, 0.8, 0.3])]);
        let detections = postprocess_output(&output, 640, 640, 640).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_id, 1);
        assert_eq!(detections[0].confidence, 0.8);
    }

    #[test]
    fn test_postprocess_drops_boxes_below_candidate_floor() {
        let output = synthetic_output(&[(320.0, 320.0, 100.0, 100.0, vec![0.01, 0.02])]);
        let detections = postprocess_output(&output, 640, 640, 640).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn test_postprocess_inverts_letterbox() {
        // 640-wide, 320-tall image: scale 1.0, y padding of 160 on each side.
        // A box centered at model (320, 320) maps back to image (320, 160).
        let output = synthetic_output(&[(320.0, 320.0, 100.0, 100.0, vec![0.9])]);
        let detections = postprocess_output(&output, 640, 320, 640).unwrap();
        let bbox = detections[0].bbox.unwrap();
        assert!((bbox.x1 - 270.0).abs() < 1.0);
        assert!((bbox.x2 - 370.0).abs() < 1.0);
        assert!((bbox.y1 - 110.0).abs() < 1.0);
        assert!((bbox.y2 - 210.0).abs() < 1.0);
    }

    #[test]
    fn test_postprocess_sorts_by_confidence() {
        let output = synthetic_output(&[
            (100.0, 100.0, 50.0, 50.0, vec![0.4]),
            (400.0, 400.0, 50.0, 50.0, vec![0.9]),
        ]);
        let detections = postprocess_output(&output, 640, 640, 640).unwrap();
        assert_eq!(detections.len(), 2);
        assert!(detections[0].confidence >= detections[1].confidence);
    }

    #[test]
    fn test_postprocess_rejects_wrong_rank() {
        let output = Array::from_shape_vec(ndarray::IxDyn(&[1, 5]), vec![0.0; 5]).unwrap();
        assert!(postprocess_output(&output, 640, 640, 640).is_err());
    }
}

//! Draws detection boxes onto a copy of the input image.

use anyhow::Result;
use image::DynamicImage;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::path::Path;

use crate::detection::Detection;

const BOX_COLOR: image::Rgb<u8> = image::Rgb([34, 139, 34]);
const BOX_THICKNESS: i32 = 3;

/// Save a copy of the image with a hollow box per detection. Detections
/// without geometry (remote results) are skipped.
pub fn save_annotated_image(
    img: &DynamicImage,
    detections: &[Detection],
    output_path: &Path,
) -> Result<()> {
    let mut rgb_img = img.to_rgb8();

    for detection in detections {
        let Some(bbox) = detection.bbox else {
            continue;
        };

        let x1 = bbox.x1.max(0.0) as i32;
        let y1 = bbox.y1.max(0.0) as i32;
        let x2 = bbox.x2.min(rgb_img.width() as f32) as i32;
        let y2 = bbox.y2.min(rgb_img.height() as f32) as i32;

        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        for offset in 0..BOX_THICKNESS {
            let rect = Rect::at(x1 - offset, y1 - offset).of_size(
                (x2 - x1 + 2 * offset) as u32,
                (y2 - y1 + 2 * offset) as u32,
            );
            draw_hollow_rect_mut(&mut rgb_img, rect, BOX_COLOR);
        }
    }

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    DynamicImage::ImageRgb8(rgb_img).save(output_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BoundingBox;
    use tempfile::tempdir;

    #[test]
    fn test_saves_annotated_copy() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            64,
            64,
            image::Rgb([200, 200, 200]),
        ));
        let detections = vec![Detection {
            class_id: 0,
            confidence: 0.9,
            bbox: Some(BoundingBox {
                x1: 10.0,
                y1: 10.0,
                x2: 50.0,
                y2: 50.0,
            }),
        }];

        let dir = tempdir().unwrap();
        let output = dir.path().join("annotated.png");
        save_annotated_image(&img, &detections, &output).unwrap();

        let saved = image::open(&output).unwrap().to_rgb8();
        // Box edge painted, interior untouched
        assert_eq!(*saved.get_pixel(10, 10), BOX_COLOR);
        assert_eq!(*saved.get_pixel(32, 32), image::Rgb([200, 200, 200]));
    }

    #[test]
    fn test_boxless_detections_are_skipped() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            32,
            32,
            image::Rgb([200, 200, 200]),
        ));
        let detections = vec![Detection {
            class_id: 0,
            confidence: 0.9,
            bbox: None,
        }];

        let dir = tempdir().unwrap();
        let output = dir.path().join("annotated.png");
        save_annotated_image(&img, &detections, &output).unwrap();

        let saved = image::open(&output).unwrap().to_rgb8();
        assert_eq!(*saved.get_pixel(0, 0), image::Rgb([200, 200, 200]));
    }
}

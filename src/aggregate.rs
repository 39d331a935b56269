//! Collapses raw detections into one summary per distinct product label.
//!
//! This is the only part of the pipeline with decision logic of its own:
//! thresholding, grouping by normalized label, and max-confidence tracking.
//! It is a pure function of its inputs and never touches the detector.

use anyhow::{bail, Result};

use crate::detection::Detection;

/// Summary of every surviving detection that resolved to the same label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSummary {
    pub label: String,
    pub max_confidence: f32,
    pub count: usize,
}

/// Turn a raw class name like "pineapple_chunks" into a display label like
/// "Pineapple Chunks". Distinct class names can collapse to the same display
/// label after normalization; the aggregator groups by the normalized form.
pub fn normalize_label(raw: &str) -> String {
    raw.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Aggregate raw detections for one image into per-label summaries.
///
/// Detections below `threshold` are dropped. Survivors are grouped by
/// normalized label in first-occurrence order; each group records its highest
/// confidence and its occurrence count. A class id the resolver cannot map is
/// an error: the label table is supposed to be complete for the model in use.
pub fn aggregate<F>(
    detections: &[Detection],
    resolve_label: F,
    threshold: f32,
) -> Result<Vec<LabelSummary>>
where
    F: Fn(u32) -> Option<String>,
{
    let mut summaries: Vec<LabelSummary> = Vec::new();

    for detection in detections {
        if detection.confidence < threshold {
            continue;
        }

        let raw = match resolve_label(detection.class_id) {
            Some(name) => name,
            None => bail!(
                "no label for class id {}; the label table is incomplete for this model",
                detection.class_id
            ),
        };
        let label = normalize_label(&raw);

        match summaries.iter_mut().find(|s| s.label == label) {
            Some(entry) => {
                entry.max_confidence = entry.max_confidence.max(detection.confidence);
                entry.count += 1;
            }
            None => summaries.push(LabelSummary {
                label,
                max_confidence: detection.confidence,
                count: 1,
            }),
        }
    }

    Ok(summaries)
}

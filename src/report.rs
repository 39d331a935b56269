//! Renders label summaries as the sentences shown to the user.

use crate::aggregate::LabelSummary;

/// Shown when nothing in the image cleared the confidence threshold.
pub const NO_DETECTION_MESSAGE: &str =
    "Sorry, we couldn't detect a product in this photo. Try a clearer picture or a different angle.";

/// A summary reads as plural when it covers more than one detection, or when
/// the label text itself ends in "s". The second clause is a label-text
/// heuristic, not grammar: a single "Pineapple Chunks" is phrased as plural,
/// and a singular noun ending in "s" would misfire the same way. Kept as-is.
fn is_plural(summary: &LabelSummary) -> bool {
    summary.count > 1 || summary.label.to_lowercase().ends_with('s')
}

/// One sentence per summary, in summary order.
pub fn format_messages(summaries: &[LabelSummary]) -> Vec<String> {
    summaries
        .iter()
        .map(|summary| {
            let percent = (summary.max_confidence * 100.0).round() as i64;
            let display = if summary.count > 1 {
                format!("{} {}", summary.count, summary.label)
            } else {
                summary.label.clone()
            };

            if is_plural(summary) {
                format!("I'm {percent}% sure these are {display}.")
            } else {
                format!("I'm {percent}% sure this is {display}.")
            }
        })
        .collect()
}

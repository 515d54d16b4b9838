use serde::{Deserialize, Serialize};

use super::color::normalize_label;

/// One classification result from the object model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub class_name: String,
    /// Confidence in `0..=1`.
    pub score: f32,
}

impl Detection {
    pub fn new(class_name: impl Into<String>, score: f32) -> Self {
        Self {
            class_name: class_name.into(),
            score,
        }
    }
}

/// Loose label comparison: exact, or either side contained in the other,
/// so "apple" and "red apple" match. Empty labels never match.
pub fn label_matches(class_name: &str, target: &str) -> bool {
    let class_name = normalize_label(class_name);
    let target = normalize_label(target);
    if class_name.is_empty() || target.is_empty() {
        return false;
    }
    class_name == target || class_name.contains(&target) || target.contains(&class_name)
}

pub fn detections_match(detections: &[Detection], target: &str, min_score: f32) -> bool {
    detections
        .iter()
        .any(|item| item.score >= min_score && label_matches(&item.class_name, target))
}

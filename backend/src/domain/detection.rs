//! Leaf deficiency detection results.

use serde::{Deserialize, Serialize};

/// Default minimum confidence for reported predictions.
pub const DEFAULT_CONFIDENCE: f64 = 0.25;

/// Single class prediction for an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Class label, normalised.
    #[serde(rename = "class")]
    pub class: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Predictions for one image, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDetections {
    /// Image path as given by the caller.
    pub image: String,
    /// Predictions at or above the confidence threshold.
    pub preds: Vec<Prediction>,
}

impl ImageDetections {
    /// Highest-confidence prediction, if any.
    pub fn best(&self) -> Option<&Prediction> {
        self.preds
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }
}

/// Clamp a requested confidence threshold into `[0, 1]`, using the default
/// for missing or non-finite values.
#[must_use]
pub fn confidence_threshold(raw: Option<f64>) -> f64 {
    match raw {
        Some(value) if value.is_finite() => value.clamp(0.0, 1.0),
        _ => DEFAULT_CONFIDENCE,
    }
}

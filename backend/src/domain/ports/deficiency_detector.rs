//! Driven port for the leaf deficiency classifier.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::{ImageDetections, Prediction};

use super::define_port_error;

define_port_error! {
    /// Errors raised by detector adapters.
    pub enum DetectorError {
        /// The detector could not be reached or has no model loaded.
        Unavailable { message: String } => "detector unavailable: {message}",
        /// Inference ran but failed.
        Inference { message: String } => "inference failed: {message}",
    }
}

/// Port for running the classifier over stored images.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeficiencyDetector: Send + Sync {
    /// Class labels the model emits.
    async fn labels(&self) -> Result<Vec<String>, DetectorError>;

    /// Predictions per image, in input order, keeping those at or above
    /// `confidence`.
    async fn detect(
        &self,
        images: &[PathBuf],
        confidence: f64,
    ) -> Result<Vec<ImageDetections>, DetectorError>;
}

/// Deterministic detector used when no inference service is configured.
///
/// Every image is classified as nitrogen deficient with confidence `0.82`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureDeficiencyDetector;

/// Confidence reported by [`FixtureDeficiencyDetector`].
pub const FIXTURE_CONFIDENCE: f64 = 0.82;

#[async_trait]
impl DeficiencyDetector for FixtureDeficiencyDetector {
    async fn labels(&self) -> Result<Vec<String>, DetectorError> {
        Ok(["K", "Mg", "N", "P", "normal"]
            .into_iter()
            .map(str::to_owned)
            .collect())
    }

    async fn detect(
        &self,
        images: &[PathBuf],
        confidence: f64,
    ) -> Result<Vec<ImageDetections>, DetectorError> {
        Ok(images
            .iter()
            .map(|path| ImageDetections {
                image: path.display().to_string(),
                preds: (FIXTURE_CONFIDENCE >= confidence)
                    .then(|| Prediction {
                        class: "N".to_owned(),
                        confidence: FIXTURE_CONFIDENCE,
                    })
                    .into_iter()
                    .collect(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn fixture_reports_nitrogen_for_every_image() {
        let images = vec![PathBuf::from("/up/a.jpg"), PathBuf::from("/up/b.jpg")];
        let results = FixtureDeficiencyDetector
            .detect(&images, 0.25)
            .await
            .expect("fixture detection");
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.preds.len() == 1 && r.preds[0].class == "N"));
    }

    #[rstest]
    #[tokio::test]
    async fn fixture_respects_threshold() {
        let results = FixtureDeficiencyDetector
            .detect(&[PathBuf::from("a.jpg")], 0.9)
            .await
            .expect("fixture detection");
        assert!(results[0].preds.is_empty());
    }
}

//! Driving port for ad-hoc detection over stored images.

use async_trait::async_trait;

use crate::domain::{Error, ImageDetections};

/// Port for running the classifier on demand.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DetectionQuery: Send + Sync {
    /// Labels exposed by the classifier, normalised.
    async fn labels(&self) -> Result<Vec<String>, Error>;

    /// Predictions for each requested image path.
    async fn detect(&self, images: Vec<String>, confidence: f64)
    -> Result<Vec<ImageDetections>, Error>;
}

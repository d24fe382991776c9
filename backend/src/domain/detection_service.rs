//! On-demand detection over images in the upload directory.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::ports::{
    DeficiencyDetector, DetectionQuery, DetectorError, ImageStore, ImageStoreError,
};
use crate::domain::{Error, ImageDetections, normalize_label};

fn map_detector_error(error: DetectorError) -> Error {
    match error {
        DetectorError::Unavailable { message } => {
            Error::service_unavailable(format!("detector unavailable: {message}"))
        }
        DetectorError::Inference { message } => {
            Error::internal(format!("inference failed: {message}"))
        }
    }
}

/// Detection service resolving caller paths before calling the detector.
#[derive(Clone)]
pub struct DetectionService<S: ?Sized, D: ?Sized> {
    images: Arc<S>,
    detector: Arc<D>,
}

impl<S: ?Sized, D: ?Sized> DetectionService<S, D> {
    /// Create a service over an image store and a detector.
    pub fn new(images: Arc<S>, detector: Arc<D>) -> Self {
        Self { images, detector }
    }
}

#[async_trait]
impl<S, D> DetectionQuery for DetectionService<S, D>
where
    S: ImageStore + ?Sized,
    D: DeficiencyDetector + ?Sized,
{
    async fn labels(&self) -> Result<Vec<String>, Error> {
        let labels = self.detector.labels().await.map_err(map_detector_error)?;
        Ok(labels.iter().map(|label| normalize_label(label)).collect())
    }

    async fn detect(
        &self,
        images: Vec<String>,
        confidence: f64,
    ) -> Result<Vec<ImageDetections>, Error> {
        if images.is_empty() {
            return Err(Error::invalid_request("no images given")
                .with_details(serde_json::json!({ "code": "no_images" })));
        }
        let paths = images
            .iter()
            .map(|image| {
                self.images.resolve(image).map_err(|err| match err {
                    ImageStoreError::InvalidPath { path } => {
                        Error::invalid_request(format!("path is outside the upload root: {path}"))
                            .with_details(serde_json::json!({ "code": "bad_path" }))
                    }
                    ImageStoreError::Io { message } => Error::internal(message),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let results = self
            .detector
            .detect(&paths, confidence)
            .await
            .map_err(|err| {
                warn!(error = %err, images = paths.len(), "detection failed");
                map_detector_error(err)
            })?;
        if results.len() != images.len() {
            return Err(Error::internal(format!(
                "detector returned {} results for {} images",
                results.len(),
                images.len()
            )));
        }

        Ok(images
            .into_iter()
            .zip(results)
            .map(|(image, mut result)| {
                result.image = image;
                for pred in &mut result.preds {
                    pred.class = normalize_label(&pred.class);
                }
                result
            })
            .collect())
    }
}

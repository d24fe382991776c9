//! Reqwest-backed `DeficiencyDetector` talking to an external inference
//! service.
//!
//! The service shares the upload volume, so requests carry absolute image
//! paths rather than image bytes:
//!
//! - `GET {base}/labels` → `{"labels": ["K", "Mg", ...]}`
//! - `POST {base}/detect` with `{"images": [...], "conf": 0.25}` →
//!   `{"results": [{"image": "...", "preds": [{"class": "N", "confidence": 0.82}]}]}`

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

use super::dto::{DetectRequestDto, DetectResponseDto, LabelsResponseDto};
use crate::domain::ImageDetections;
use crate::domain::ports::{DeficiencyDetector, DetectorError};

/// HTTP client for the inference service.
pub struct HttpDeficiencyDetector {
    client: Client,
    labels_url: Url,
    detect_url: Url,
}

impl HttpDeficiencyDetector {
    /// Build a detector against `base` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`DetectorError::Unavailable`] when the base URL cannot be
    /// extended or the client cannot be built.
    pub fn new(base: &Url, timeout: Duration) -> Result<Self, DetectorError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DetectorError::unavailable(err.to_string()))?;
        Ok(Self {
            client,
            labels_url: endpoint(base, "labels")?,
            detect_url: endpoint(base, "detect")?,
        })
    }
}

fn endpoint(base: &Url, path: &str) -> Result<Url, DetectorError> {
    let mut root = base.clone();
    if !root.path().ends_with('/') {
        let with_slash = format!("{}/", root.path());
        root.set_path(&with_slash);
    }
    root.join(path)
        .map_err(|err| DetectorError::unavailable(format!("invalid detector url: {err}")))
}

fn map_transport_error(error: &reqwest::Error) -> DetectorError {
    DetectorError::unavailable(error.to_string())
}

fn map_status_error(status: StatusCode, body: &[u8]) -> DetectorError {
    let preview: String = String::from_utf8_lossy(body).chars().take(160).collect();
    let message = format!("status {}: {}", status.as_u16(), preview.trim());
    if status.is_server_error() || status == StatusCode::NOT_FOUND {
        DetectorError::unavailable(message)
    } else {
        DetectorError::inference(message)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, DetectorError> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|err| map_transport_error(&err))?;
    if !status.is_success() {
        return Err(map_status_error(status, body.as_ref()));
    }
    serde_json::from_slice(body.as_ref())
        .map_err(|err| DetectorError::inference(format!("invalid detector payload: {err}")))
}

#[async_trait]
impl DeficiencyDetector for HttpDeficiencyDetector {
    async fn labels(&self) -> Result<Vec<String>, DetectorError> {
        let response = self
            .client
            .get(self.labels_url.clone())
            .send()
            .await
            .map_err(|err| map_transport_error(&err))?;
        let decoded: LabelsResponseDto = read_json(response).await?;
        Ok(decoded.labels)
    }

    async fn detect(
        &self,
        images: &[PathBuf],
        confidence: f64,
    ) -> Result<Vec<ImageDetections>, DetectorError> {
        let paths = images
            .iter()
            .map(|path| {
                path.to_str()
                    .ok_or_else(|| DetectorError::inference("image path is not UTF-8"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let response = self
            .client
            .post(self.detect_url.clone())
            .json(&DetectRequestDto {
                images: paths,
                conf: confidence,
            })
            .send()
            .await
            .map_err(|err| map_transport_error(&err))?;
        let decoded: DetectResponseDto = read_json(response).await?;
        Ok(decoded
            .results
            .into_iter()
            .map(ImageDetections::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://detector:8000", "http://detector:8000/detect")]
    #[case("http://detector:8000/v1", "http://detector:8000/v1/detect")]
    #[case("http://detector:8000/v1/", "http://detector:8000/v1/detect")]
    fn endpoints_extend_the_base_path(#[case] base: &str, #[case] expected: &str) {
        let url = Url::parse(base).expect("valid url");
        assert_eq!(endpoint(&url, "detect").expect("joined").as_str(), expected);
    }

    #[rstest]
    #[case(StatusCode::SERVICE_UNAVAILABLE, true)]
    #[case(StatusCode::NOT_FOUND, true)]
    #[case(StatusCode::UNPROCESSABLE_ENTITY, false)]
    fn statuses_split_unavailable_from_inference(
        #[case] status: StatusCode,
        #[case] unavailable: bool,
    ) {
        let err = map_status_error(status, b"model not loaded");
        assert_eq!(matches!(err, DetectorError::Unavailable { .. }), unavailable);
    }

    #[rstest]
    fn decodes_results_and_clamps_confidence() {
        let body = br#"{"results":[{"image":"/up/a.jpg","preds":[{"class":"K","confidence":1.2}]}]}"#;
        let decoded: DetectResponseDto = serde_json::from_slice(body).expect("valid payload");
        let results: Vec<ImageDetections> =
            decoded.results.into_iter().map(ImageDetections::from).collect();
        assert_eq!(results[0].preds[0].class, "K");
        assert!((results[0].preds[0].confidence - 1.0).abs() < f64::EPSILON);
    }
}

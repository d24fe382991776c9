//! Wire types for the inference service.

use serde::{Deserialize, Serialize};

use crate::domain::{ImageDetections, Prediction};

#[derive(Debug, Serialize)]
pub(super) struct DetectRequestDto<'a> {
    pub(super) images: Vec<&'a str>,
    pub(super) conf: f64,
}

#[derive(Debug, Deserialize)]
pub(super) struct DetectResponseDto {
    #[serde(default)]
    pub(super) results: Vec<ImageResultDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ImageResultDto {
    pub(super) image: String,
    #[serde(default)]
    pub(super) preds: Vec<PredictionDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PredictionDto {
    #[serde(rename = "class")]
    pub(super) class_name: String,
    pub(super) confidence: f64,
}

#[derive(Debug, Deserialize)]
pub(super) struct LabelsResponseDto {
    #[serde(default)]
    pub(super) labels: Vec<String>,
}

impl From<ImageResultDto> for ImageDetections {
    fn from(dto: ImageResultDto) -> Self {
        Self {
            image: dto.image,
            preds: dto
                .preds
                .into_iter()
                .filter(|p| p.confidence.is_finite())
                .map(|p| Prediction {
                    class: p.class_name,
                    confidence: p.confidence.clamp(0.0, 1.0),
                })
                .collect(),
        }
    }
}

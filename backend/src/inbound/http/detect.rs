//! Ad-hoc deficiency detection over stored images.
//!
//! ```text
//! GET  /api/detect/labels
//! POST /api/detect {"images":["inspections/4/4_20250301101500000000.jpg"],"conf":0.4}
//! ```

use actix_web::{get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::{ImageDetections, confidence_threshold};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{ErrorSchema, ImageDetectionsSchema};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, optional_f64};

const CONF: FieldName = FieldName::new("conf");

/// Class labels of the detector.
#[derive(Debug, Serialize, ToSchema)]
pub struct LabelsResponse {
    pub labels: Vec<String>,
}

/// Detection request. `paths` is accepted as an alias of `images`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DetectRequest {
    #[schema(value_type = Option<Vec<String>>)]
    pub images: Option<Value>,
    #[schema(value_type = Option<Vec<String>>)]
    pub paths: Option<Value>,
    /// Minimum confidence, default 0.25.
    #[schema(value_type = Option<f64>)]
    pub conf: Option<Value>,
}

impl DetectRequest {
    /// Requested image paths. Anything other than a non-empty list yields an
    /// empty list, which the detection service refuses.
    fn image_paths(&self) -> Vec<String> {
        let list = [&self.images, &self.paths]
            .into_iter()
            .flatten()
            .find_map(|value| value.as_array().filter(|items| !items.is_empty()));
        list.map(|items| {
            items
                .iter()
                .map(|item| match item {
                    Value::String(path) => path.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
    }
}

/// Predictions per requested image.
#[derive(Debug, Serialize, ToSchema)]
pub struct DetectResponse {
    #[schema(value_type = Vec<ImageDetectionsSchema>)]
    pub results: Vec<ImageDetections>,
}

/// Labels exposed by the detector, with healthy spellings normalised.
#[utoipa::path(
    get,
    path = "/api/detect/labels",
    responses(
        (status = 200, description = "Detector labels", body = LabelsResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 503, description = "Detector unavailable", body = ErrorSchema)
    ),
    tags = ["detect"],
    operation_id = "detectorLabels"
)]
#[get("/detect/labels")]
pub async fn labels(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<LabelsResponse>> {
    session.require_user_id()?;
    let labels = state.detection.labels().await?;
    Ok(web::Json(LabelsResponse { labels }))
}

/// Run the detector over images below the upload root.
#[utoipa::path(
    post,
    path = "/api/detect",
    request_body = DetectRequest,
    responses(
        (status = 200, description = "Predictions", body = DetectResponse),
        (status = 400, description = "No images or path outside the upload root", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 503, description = "Detector unavailable", body = ErrorSchema)
    ),
    tags = ["detect"],
    operation_id = "detect"
)]
#[post("/detect")]
pub async fn detect(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<DetectRequest>,
) -> ApiResult<web::Json<DetectResponse>> {
    session.require_user_id()?;
    let confidence = confidence_threshold(optional_f64(payload.conf.as_ref(), CONF)?);
    let results = state
        .detection
        .detect(payload.image_paths(), confidence)
        .await?;
    Ok(web::Json(DetectResponse { results }))
}

/// Register the detection routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(labels).service(detect);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::domain::ports::MockDetectionQuery;
    use crate::domain::{DEFAULT_CONFIDENCE, Error, Prediction};
    use crate::inbound::http::test_utils::{fixture_ports, signed_in, test_app};

    async fn send(detection: MockDetectionQuery, request: actix_test::TestRequest) -> (StatusCode, Value) {
        let mut ports = fixture_ports();
        ports.detection = Arc::new(detection);
        let app = actix_test::init_service(test_app(HttpState::new(ports), configure)).await;
        let cookie = signed_in(&app, 1).await;
        let res = actix_test::call_service(&app, request.cookie(cookie).to_request()).await;
        let status = res.status();
        let body: Value = actix_test::read_body_json(res).await;
        (status, body)
    }

    #[rstest]
    #[case(json!({"images": ["a.jpg"]}), vec!["a.jpg"])]
    #[case(json!({"paths": ["b.jpg", 7]}), vec!["b.jpg", "7"])]
    #[case(json!({"images": [], "paths": ["c.jpg"]}), vec!["c.jpg"])]
    #[case(json!({"images": "a.jpg"}), vec![])]
    #[case(json!({}), vec![])]
    fn image_paths_accept_both_keys(#[case] body: Value, #[case] expected: Vec<&str>) {
        let request: DetectRequest = serde_json::from_value(body).expect("request");
        assert_eq!(request.image_paths(), expected);
    }

    #[rstest]
    #[actix_web::test]
    async fn detect_uses_default_confidence() {
        let mut detection = MockDetectionQuery::new();
        detection
            .expect_detect()
            .withf(|images, conf| {
                images == &vec!["a.jpg".to_owned()] && (conf - DEFAULT_CONFIDENCE).abs() < f64::EPSILON
            })
            .times(1)
            .returning(|images, _| {
                Ok(images
                    .into_iter()
                    .map(|image| ImageDetections {
                        image,
                        preds: vec![Prediction {
                            class: "N".to_owned(),
                            confidence: 0.82,
                        }],
                    })
                    .collect())
            });

        let (status, body) = send(
            detection,
            actix_test::TestRequest::post()
                .uri("/api/detect")
                .set_json(json!({"images": ["a.jpg"]})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"][0]["image"], "a.jpg");
        assert_eq!(body["results"][0]["preds"][0]["class"], "N");
    }

    #[rstest]
    #[actix_web::test]
    async fn confidence_strings_are_clamped() {
        let mut detection = MockDetectionQuery::new();
        detection
            .expect_detect()
            .withf(|_, conf| (conf - 1.0).abs() < f64::EPSILON)
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let (status, _) = send(
            detection,
            actix_test::TestRequest::post()
                .uri("/api/detect")
                .set_json(json!({"images": ["a.jpg"], "conf": "4"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
    }

    #[rstest]
    #[actix_web::test]
    async fn unparseable_confidence_is_rejected() {
        let mut detection = MockDetectionQuery::new();
        detection.expect_detect().never();

        let (status, body) = send(
            detection,
            actix_test::TestRequest::post()
                .uri("/api/detect")
                .set_json(json!({"images": ["a.jpg"], "conf": "high"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["field"], "conf");
    }

    #[rstest]
    #[actix_web::test]
    async fn detector_outage_is_503() {
        let mut detection = MockDetectionQuery::new();
        detection
            .expect_labels()
            .returning(|| Err(Error::service_unavailable("detector unavailable")));

        let (status, body) = send(
            detection,
            actix_test::TestRequest::get().uri("/api/detect/labels"),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "service_unavailable");
    }

    #[rstest]
    #[actix_web::test]
    async fn labels_require_a_session() {
        let app = actix_test::init_service(test_app(HttpState::new(fixture_ports()), configure))
            .await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/api/detect/labels").to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}

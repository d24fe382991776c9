//! Tests for inspection round handlers.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use chrono::{NaiveDate, TimeZone, Utc};
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::*;
use crate::domain::ports::{MockInspectionCommand, MockInspectionQuery};
use crate::domain::{
    HistoryBucket, ImageId, ImageMeta, NutrientCount, UserId,
};
use crate::inbound::http::test_utils::{fixture_ports, signed_in, test_app};

fn sample_inspection(id: i32, status: InspectionStatus) -> Inspection {
    Inspection {
        id: InspectionId::new(id).expect("valid inspection id"),
        field_id: FieldId::new(1).expect("valid field id"),
        zone_id: ZoneId::new(2).expect("valid zone id"),
        owner_id: UserId::new(1).expect("valid user id"),
        round_no: 3,
        status,
        notes: None,
        inspected_at: Utc
            .with_ymd_and_hms(2025, 3, 1, 10, 15, 0)
            .single()
            .expect("valid timestamp"),
    }
}

fn sample_image(inspection: i32) -> InspectionImage {
    InspectionImage {
        id: ImageId::new(11).expect("valid image id"),
        inspection_id: InspectionId::new(inspection).expect("valid inspection id"),
        image_path: format!("inspections/{inspection}/{inspection}_20250301101500000000.jpg"),
        detection_path: None,
        captured_at: Utc
            .with_ymd_and_hms(2025, 3, 1, 10, 15, 0)
            .single()
            .expect("valid timestamp"),
        meta: ImageMeta {
            original_name: "leaf.jpg".to_owned(),
            saved_name: format!("{inspection}_20250301101500000000.jpg"),
            saved_at_utc: "20250301101500000000".to_owned(),
        },
    }
}

#[fixture]
fn command() -> MockInspectionCommand {
    MockInspectionCommand::new()
}

#[fixture]
fn query() -> MockInspectionQuery {
    MockInspectionQuery::new()
}

async fn send(
    command: MockInspectionCommand,
    query: MockInspectionQuery,
    request: actix_test::TestRequest,
) -> (StatusCode, Value) {
    let mut ports = fixture_ports();
    ports.inspections = Arc::new(command);
    ports.inspections_query = Arc::new(query);
    let app = actix_test::init_service(test_app(HttpState::new(ports), configure)).await;
    let cookie = signed_in(&app, 1).await;
    let res = actix_test::call_service(&app, request.cookie(cookie).to_request()).await;
    let status = res.status();
    let body = actix_test::read_body(res).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("JSON body")
    };
    (status, value)
}

#[rstest]
#[case(false, StatusCode::CREATED)]
#[case(true, StatusCode::OK)]
#[actix_web::test]
async fn start_round_status_reflects_idempotency(
    mut command: MockInspectionCommand,
    query: MockInspectionQuery,
    #[case] idempotent: bool,
    #[case] expected: StatusCode,
) {
    command
        .expect_start_round()
        .withf(|_, field, zone, notes| {
            field.get() == 1 && zone.get() == 2 && notes.as_deref() == Some("after rain")
        })
        .times(1)
        .returning(move |_, _, _, _| {
            Ok(StartedRound {
                inspection: sample_inspection(4, InspectionStatus::Pending),
                idempotent,
            })
        });

    let (status, body) = send(
        command,
        query,
        actix_test::TestRequest::post()
            .uri("/api/inspections/start")
            .set_json(json!({"field_id": "1", "zone_id": 2, "notes": " after rain "})),
    )
    .await;

    assert_eq!(status, expected);
    assert_eq!(body["inspection_id"], 4);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["idempotent"], idempotent);
}

#[rstest]
#[actix_web::test]
async fn start_round_requires_zone(mut command: MockInspectionCommand, query: MockInspectionQuery) {
    command.expect_start_round().never();

    let (status, body) = send(
        command,
        query,
        actix_test::TestRequest::post()
            .uri("/api/inspections/start")
            .set_json(json!({"field_id": 1})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "zone_id");
    assert_eq!(body["details"]["code"], "missing_field");
}

#[rstest]
#[actix_web::test]
async fn upload_passes_raw_body_and_filename(
    mut command: MockInspectionCommand,
    query: MockInspectionQuery,
) {
    command
        .expect_upload_image()
        .withf(|_, id, upload| {
            id.get() == 4 && upload.filename == "leaf.jpg" && upload.bytes == b"jpeg-bytes"
        })
        .times(1)
        .returning(|_, id, _| {
            Ok(UploadedImage {
                image: sample_image(id.get()),
                quota_remain: 4,
            })
        });

    let (status, body) = send(
        command,
        query,
        actix_test::TestRequest::post()
            .uri("/api/inspections/4/images?filename=leaf.jpg")
            .set_payload(&b"jpeg-bytes"[..]),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["quota_remain"], 4);
    assert_eq!(body["image"]["meta"]["original_name"], "leaf.jpg");
}

#[rstest]
#[actix_web::test]
async fn upload_derives_name_from_content_type(
    mut command: MockInspectionCommand,
    query: MockInspectionQuery,
) {
    command
        .expect_upload_image()
        .withf(|_, _, upload| upload.filename == "upload.png")
        .times(1)
        .returning(|_, id, _| {
            Ok(UploadedImage {
                image: sample_image(id.get()),
                quota_remain: 0,
            })
        });

    let (status, _) = send(
        command,
        query,
        actix_test::TestRequest::post()
            .uri("/api/inspections/4/images")
            .insert_header((header::CONTENT_TYPE, "image/png"))
            .set_payload(&b"png-bytes"[..]),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
}

#[rstest]
#[actix_web::test]
async fn oversized_upload_is_rejected_before_the_service(
    mut command: MockInspectionCommand,
    query: MockInspectionQuery,
) {
    command.expect_upload_image().never();

    let (status, body) = send(
        command,
        query,
        actix_test::TestRequest::post()
            .uri("/api/inspections/4/images?filename=leaf.jpg")
            .set_payload(vec![0_u8; MAX_IMAGE_BYTES + 1]),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["details"]["code"], "file_too_large");
}

#[rstest]
#[actix_web::test]
async fn quota_refusal_is_surfaced(mut command: MockInspectionCommand, query: MockInspectionQuery) {
    command.expect_upload_image().returning(|_, _, _| {
        Err(Error::invalid_request("image quota reached for this round")
            .with_details(json!({"code": "quota_full", "exist": 5, "max": 5})))
    });

    let (status, body) = send(
        command,
        query,
        actix_test::TestRequest::post()
            .uri("/api/inspections/4/images?filename=leaf.jpg")
            .set_payload(&b"x"[..]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["code"], "quota_full");
}

#[rstest]
#[actix_web::test]
async fn detail_flattens_round_and_lists_findings(
    command: MockInspectionCommand,
    mut query: MockInspectionQuery,
) {
    query.expect_get_inspection().returning(|_, id| {
        Ok(InspectionDetail {
            inspection: sample_inspection(id.get(), InspectionStatus::Pending),
            zone_name: "Zone A".to_owned(),
            field_name: "North".to_owned(),
            images: vec![sample_image(id.get())],
            findings: vec![Finding {
                image_id: ImageId::new(11).ok(),
                tree_no: None,
                nutrient_code: "N".to_owned(),
                severity: Severity::Moderate,
                confidence: 0.82,
                notes: None,
            }],
            warnings: vec![],
        })
    });

    let (status, body) = send(
        command,
        query,
        actix_test::TestRequest::get().uri("/api/inspections/4"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inspection_id"], 4);
    assert_eq!(body["zone_name"], "Zone A");
    assert_eq!(body["findings"][0]["severity"], "moderate");
    assert_eq!(body["images"][0]["image_id"], 11);
}

#[rstest]
#[actix_web::test]
async fn analyze_reports_outcome(mut command: MockInspectionCommand, query: MockInspectionQuery) {
    command.expect_analyze().times(1).returning(|_, _| {
        Ok(AnalysisOutcome {
            findings: vec![],
            recommendations: 0,
            warnings: vec!["detector failed for image 11".to_owned()],
        })
    });

    let (status, body) = send(
        command,
        query,
        actix_test::TestRequest::post().uri("/api/inspections/4/analyze"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recommendations"], 0);
    assert_eq!(body["warnings"][0], "detector failed for image 11");
}

#[rstest]
#[case(json!({"status": "finished"}), "bad_status")]
#[case(json!({}), "missing_field")]
#[actix_web::test]
async fn status_change_validates_input(
    mut command: MockInspectionCommand,
    query: MockInspectionQuery,
    #[case] payload: Value,
    #[case] code: &str,
) {
    command.expect_set_status().never();

    let (status, body) = send(
        command,
        query,
        actix_test::TestRequest::patch()
            .uri("/api/inspections/4/status")
            .set_json(payload),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["code"], code);
}

#[rstest]
#[actix_web::test]
async fn status_change_closes_round(mut command: MockInspectionCommand, query: MockInspectionQuery) {
    command
        .expect_set_status()
        .withf(|_, _, status| *status == InspectionStatus::Completed)
        .times(1)
        .returning(|_, id, status| Ok(sample_inspection(id.get(), status)));

    let (status, body) = send(
        command,
        query,
        actix_test::TestRequest::patch()
            .uri("/api/inspections/4/status")
            .set_json(json!({"status": "Completed"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
}

#[rstest]
#[actix_web::test]
async fn recommendations_render_dates(command: MockInspectionCommand, mut query: MockInspectionQuery) {
    query.expect_list_recommendations().returning(|_, id| {
        Ok(vec![Recommendation {
            id: RecommendationId::new(8).expect("valid recommendation id"),
            inspection_id: id,
            fertilizer_id: None,
            nutrient_code: Some("N".to_owned()),
            text: "Apply urea".to_owned(),
            rate_per_area: None,
            application_method: None,
            status: RecommendationStatus::Applied,
            applied_date: NaiveDate::from_ymd_opt(2025, 3, 9),
            created_at: Utc
                .with_ymd_and_hms(2025, 3, 2, 0, 0, 0)
                .single()
                .expect("valid timestamp"),
            fertilizer_name: Some("Urea".to_owned()),
            formulation: Some("46-0-0".to_owned()),
            nutrient_name: Some("Nitrogen".to_owned()),
        }])
    });

    let (status, body) = send(
        command,
        query,
        actix_test::TestRequest::get().uri("/api/inspections/4/recommendations"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["applied_date"], "2025-03-09");
    assert_eq!(body["data"][0]["status"], "applied");
}

#[rstest]
#[case(actix_test::TestRequest::patch())]
#[case(actix_test::TestRequest::put())]
#[actix_web::test]
async fn recommendation_update_accepts_patch_and_put(
    mut command: MockInspectionCommand,
    query: MockInspectionQuery,
    #[case] request: actix_test::TestRequest,
) {
    command
        .expect_update_recommendation()
        .withf(|_, id, change| {
            id.get() == 8
                && change.status == "applied"
                && change.applied_date.as_deref() == Some("2025-03-09")
        })
        .times(1)
        .returning(|_, _, _| Ok(()));

    let (status, body) = send(
        command,
        query,
        request
            .uri("/api/inspections/recommendations/8")
            .set_json(json!({"status": "applied", "applied_date": "2025-03-09"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"updated": true}));
}

#[rstest]
#[actix_web::test]
async fn history_parses_filters_leniently(
    command: MockInspectionCommand,
    mut query: MockInspectionQuery,
) {
    query
        .expect_history()
        .withf(|_, q| {
            q.group == HistoryGrouping::Month
                && q.range.from.is_some()
                && q.range.to.is_none()
                && q.zone_id.map(ZoneId::get) == Some(2)
        })
        .times(1)
        .returning(|_, q| {
            Ok(InspectionHistory {
                group: q.group,
                buckets: vec![HistoryBucket {
                    bucket: "2025-03".to_owned(),
                    inspections: 2,
                    findings: 3,
                }],
                top_nutrients: vec![NutrientCount {
                    nutrient_code: "K".to_owned(),
                    count: 3,
                }],
            })
        });

    let (status, body) = send(
        command,
        query,
        actix_test::TestRequest::get()
            .uri("/api/inspections/history?group=decade&from=2025-01-01&to=soon&zone_id=2"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["group"], "month");
    assert_eq!(body["buckets"][0]["bucket"], "2025-03");
    assert_eq!(body["top_nutrients"][0]["nutrient_code"], "K");
}

#[rstest]
#[actix_web::test]
async fn list_clamps_paging_and_uses_snake_case(
    command: MockInspectionCommand,
    mut query: MockInspectionQuery,
) {
    query
        .expect_list_inspections()
        .withf(|_, filter, page| {
            filter.year == Some(2025) && filter.month == Some(3) && page.size() == 100
        })
        .times(1)
        .returning(|_, _, page| {
            Ok(Paginated::new(
                vec![InspectionSummary {
                    inspection: sample_inspection(4, InspectionStatus::Completed),
                    zone_name: "Zone A".to_owned(),
                    field_name: "North".to_owned(),
                    images: 2,
                    findings: 1,
                    recommendations: 1,
                }],
                page,
                21,
            ))
        });

    let (status, body) = send(
        command,
        query,
        actix_test::TestRequest::get()
            .uri("/api/inspections?page=0&page_size=500&year=2025&month=3"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 1);
    assert_eq!(body["page_size"], 100);
    assert_eq!(body["total"], 21);
    assert_eq!(body["data"][0]["field_name"], "North");
}

#[rstest]
#[actix_web::test]
async fn list_rejects_month_out_of_range(
    command: MockInspectionCommand,
    mut query: MockInspectionQuery,
) {
    query.expect_list_inspections().never();

    let (status, body) = send(
        command,
        query,
        actix_test::TestRequest::get().uri("/api/inspections?month=13"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "month");
}

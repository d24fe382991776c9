//! Tests for zone and tree mark handlers.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use rstest::rstest;
use serde_json::{Value, json};

use super::*;
use crate::domain::CreatedZone;
use crate::domain::ports::{MockZoneCommand, MockZoneQuery};
use crate::inbound::http::test_utils::{fixture_ports, signed_in, test_app};

fn owner() -> UserId {
    UserId::new(1).expect("valid user id")
}

fn state_with(command: MockZoneCommand, query: MockZoneQuery) -> HttpState {
    let mut ports = fixture_ports();
    ports.zones = Arc::new(command);
    ports.zones_query = Arc::new(query);
    HttpState::new(ports)
}

async fn send(
    command: MockZoneCommand,
    query: MockZoneQuery,
    request: actix_test::TestRequest,
) -> (StatusCode, Value) {
    let app = actix_test::init_service(test_app(state_with(command, query), configure)).await;
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
#[actix_web::test]
async fn list_zones_passes_field_filter() {
    let mut query = MockZoneQuery::new();
    query
        .expect_list_zones()
        .withf(|who, field| *who == owner() && field.map(FieldId::get) == Some(4))
        .times(1)
        .returning(|who, _| Ok(vec![sample_zone(2, who), sample_zone(3, who)]));

    let (status, body) = send(
        MockZoneCommand::new(),
        query,
        actix_test::TestRequest::get().uri("/api/zones?field_id=4"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"][0]["zone_name"], "Zone 2");
    assert_eq!(body["data"][0]["created_at"], "2025-01-02T03:04:05+00:00");
}

#[rstest]
#[actix_web::test]
async fn create_zone_resolves_marks_and_reports_inserted_count() {
    let mut command = MockZoneCommand::new();
    command
        .expect_create_zone()
        .withf(|_, field, draft, marks| {
            field.get() == 1
                && draft.name() == "Zone A"
                && marks.as_ref().map(|list| list.iter().map(|m| m.tree_no).collect::<Vec<_>>())
                    == Some(vec![1, 3])
        })
        .times(1)
        .returning(|who, _, _, marks| {
            Ok(CreatedZone {
                zone: sample_zone(9, who),
                inserted_marks: marks.map_or(0, |list| list.len()),
            })
        });

    let (status, body) = send(
        command,
        MockZoneQuery::new(),
        actix_test::TestRequest::post().uri("/api/zones").set_json(json!({
            "field_id": "1",
            "zone_name": " Zone A ",
            "marks": [
                {"lat": 7.0, "lng": 99.0},
                {"lat": "bad"},
                {"latitude": "7.1", "longitude": "99.1"}
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({"zone_id": 9, "inserted_marks": 2}));
}

#[rstest]
#[case(json!([{"lat": "bad"}, {"latitude": null}]), Some(0))]
#[case(json!([]), Some(0))]
#[case(Value::Null, None)]
#[actix_web::test]
async fn create_zone_passes_marks_list_even_when_nothing_is_usable(
    #[case] marks: Value,
    #[case] expected: Option<usize>,
) {
    let mut command = MockZoneCommand::new();
    command
        .expect_create_zone()
        .withf(move |_, _, draft, marks| {
            draft.num_trees() == 40 && marks.as_ref().map(Vec::len) == expected
        })
        .times(1)
        .returning(|who, _, _, _| {
            Ok(CreatedZone {
                zone: sample_zone(9, who),
                inserted_marks: 0,
            })
        });

    let (status, body) = send(
        command,
        MockZoneQuery::new(),
        actix_test::TestRequest::post().uri("/api/zones").set_json(json!({
            "field_id": 1,
            "zone_name": "Zone A",
            "num_trees": 40,
            "marks": marks
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["inserted_marks"], 0);
}

#[rstest]
#[case(json!({"zone_name": "A"}), "missing_field")]
#[case(json!({"field_id": 1, "zone_name": " "}), "missing_field")]
#[case(json!({"field_id": 1, "zone_name": "A", "num_trees": -2}), "invalid_tree_count")]
#[case(json!({"field_id": 1, "zone_name": "A", "marks": "nope"}), "not_a_list")]
#[case(
    json!({"field_id": 1, "zone_name": "A", "marks": [
        {"tree_no": 2, "lat": 7.0, "lng": 99.0},
        {"tree_no": 2, "lat": 7.1, "lng": 99.1}
    ]}),
    "duplicate_tree_no"
)]
#[actix_web::test]
async fn create_zone_rejects_invalid_bodies(#[case] payload: Value, #[case] code: &str) {
    let mut command = MockZoneCommand::new();
    command.expect_create_zone().never();

    let (status, body) = send(
        command,
        MockZoneQuery::new(),
        actix_test::TestRequest::post().uri("/api/zones").set_json(payload),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["code"], code);
}

#[rstest]
#[actix_web::test]
async fn update_zone_requires_tree_count() {
    let mut command = MockZoneCommand::new();
    command.expect_update_zone().never();

    let (status, body) = send(
        command,
        MockZoneQuery::new(),
        actix_test::TestRequest::put()
            .uri("/api/zones/3")
            .set_json(json!({"zone_name": "Renamed"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "num_trees");
}

#[rstest]
#[actix_web::test]
async fn delete_zone_surfaces_service_refusal() {
    let mut command = MockZoneCommand::new();
    command.expect_delete_zone().returning(|_, _| {
        Err(Error::invalid_request("zone has inspection rounds")
            .with_details(json!({"code": "zone_has_inspections"})))
    });

    let (status, body) = send(
        command,
        MockZoneQuery::new(),
        actix_test::TestRequest::delete().uri("/api/zones/3"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["code"], "zone_has_inspections");
}

#[rstest]
#[actix_web::test]
async fn non_positive_zone_ids_are_not_found() {
    let mut query = MockZoneQuery::new();
    query.expect_get_zone().never();

    let (status, _) = send(
        MockZoneCommand::new(),
        query,
        actix_test::TestRequest::get().uri("/api/zones/0"),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[rstest]
#[actix_web::test]
async fn single_mark_needs_tree_number_and_coordinates() {
    let mut command = MockZoneCommand::new();
    command.expect_add_marks().never();

    let (status, body) = send(
        command,
        MockZoneQuery::new(),
        actix_test::TestRequest::post()
            .uri("/api/zones/3/marks")
            .set_json(json!({"latitude": 7.0, "longitude": 99.0})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "tree_no");
}

#[rstest]
#[actix_web::test]
async fn adding_an_empty_marks_list_is_rejected() {
    let mut command = MockZoneCommand::new();
    command.expect_add_marks().never();

    let (status, body) = send(
        command,
        MockZoneQuery::new(),
        actix_test::TestRequest::post()
            .uri("/api/zones/3/marks")
            .set_json(json!({"marks": []})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "marks");
    assert_eq!(body["details"]["code"], "missing_field");
}

#[rstest]
#[actix_web::test]
async fn single_mark_accepts_short_coordinate_names() {
    let mut command = MockZoneCommand::new();
    command
        .expect_add_marks()
        .withf(|_, zone, marks| zone.get() == 3 && marks.len() == 1 && marks[0].tree_no == 12)
        .times(1)
        .returning(|_, _, marks| {
            Ok(MarkTally {
                inserted: marks.len(),
                num_trees: 12,
            })
        });

    let (status, body) = send(
        command,
        MockZoneQuery::new(),
        actix_test::TestRequest::post()
            .uri("/api/zones/3/marks")
            .set_json(json!({"tree_no": "12", "lat": 7.0, "lng": 99.0})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"inserted": 1, "num_trees": 12}));
}

#[rstest]
#[actix_web::test]
async fn replacing_marks_requires_a_list() {
    let mut command = MockZoneCommand::new();
    command.expect_replace_marks().never();

    let (status, body) = send(
        command,
        MockZoneQuery::new(),
        actix_test::TestRequest::put()
            .uri("/api/zones/3/marks")
            .set_json(json!({"tree_no": 1, "lat": 7.0, "lng": 99.0})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["code"], "not_a_list");
}

#[rstest]
#[actix_web::test]
async fn list_marks_returns_count() {
    let mut query = MockZoneQuery::new();
    query.expect_list_marks().returning(|_, zone| {
        Ok(vec![TreeMark {
            id: crate::domain::MarkId::new(5).expect("valid mark id"),
            zone_id: zone,
            tree_no: 1,
            position: GeoPoint::new(7.0, 99.0).expect("valid point"),
        }])
    });

    let (status, body) = send(
        MockZoneCommand::new(),
        query,
        actix_test::TestRequest::get().uri("/api/zones/3/marks"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["mark_id"], 5);
    assert_eq!(body["data"][0]["latitude"], 7.0);
}

#[rstest]
#[actix_web::test]
async fn zone_routes_require_a_session() {
    let app = actix_test::init_service(test_app(
        state_with(MockZoneCommand::new(), MockZoneQuery::new()),
        configure,
    ))
    .await;

    let res =
        actix_test::call_service(&app, actix_test::TestRequest::get().uri("/api/zones").to_request())
            .await;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

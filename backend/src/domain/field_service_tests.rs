//! Tests for the field service.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{MockFieldRepository, MockZoneRepository};
use crate::domain::ErrorCode;

fn user(raw: i32) -> UserId {
    UserId::new(raw).expect("valid id")
}

fn field_id() -> FieldId {
    FieldId::new(5).expect("valid id")
}

fn field_owned_by(owner: i32) -> Field {
    Field {
        id: field_id(),
        owner_id: user(owner),
        name: "North plot".to_owned(),
        size_square_meter: 1600.0,
        created_at: Utc
            .with_ymd_and_hms(2025, 1, 2, 3, 4, 5)
            .single()
            .expect("valid time"),
    }
}

fn draft() -> FieldDraft {
    FieldDraft::try_new(Some("North plot"), Some(1600.0), None).expect("valid draft")
}

#[fixture]
fn zones() -> MockZoneRepository {
    MockZoneRepository::new()
}

fn repo_with(found: Option<Field>) -> MockFieldRepository {
    let mut fields = MockFieldRepository::new();
    fields.expect_find().return_once(move |_| Ok(found));
    fields
}

#[rstest]
#[case(None, ErrorCode::NotFound)]
#[case(Some(2), ErrorCode::Forbidden)]
#[tokio::test]
async fn update_checks_ownership(
    zones: MockZoneRepository,
    #[case] owner: Option<i32>,
    #[case] expected: ErrorCode,
) {
    let mut fields = repo_with(owner.map(field_owned_by));
    fields.expect_update().times(0);

    let service = FieldService::new(Arc::new(fields), Arc::new(zones));
    let err = service
        .update_field(user(1), field_id(), draft())
        .await
        .expect_err("not owned");
    assert_eq!(err.code(), expected);
}

#[rstest]
#[tokio::test]
async fn get_hides_foreign_fields(zones: MockZoneRepository) {
    let mut fields = repo_with(Some(field_owned_by(2)));
    fields.expect_vertices().times(0);

    let service = FieldService::new(Arc::new(fields), Arc::new(zones));
    let err = service
        .get_field(user(1), field_id())
        .await
        .expect_err("foreign field");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn get_returns_vertices(zones: MockZoneRepository) {
    let mut fields = repo_with(Some(field_owned_by(1)));
    fields.expect_vertices().return_once(|_| Ok(Vec::new()));

    let service = FieldService::new(Arc::new(fields), Arc::new(zones));
    let detail = service
        .get_field(user(1), field_id())
        .await
        .expect("owned field");
    assert_eq!(detail.field.name, "North plot");
    assert!(detail.vertices.is_empty());
}

#[rstest]
#[tokio::test]
async fn delete_refuses_fields_with_zones(zones: MockZoneRepository) {
    let mut fields = repo_with(Some(field_owned_by(1)));
    fields.expect_zone_count().return_once(|_| Ok(2));
    fields.expect_delete().times(0);

    let service = FieldService::new(Arc::new(fields), Arc::new(zones));
    let err = service
        .delete_field(user(1), field_id())
        .await
        .expect_err("field has zones");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(
        err.details().and_then(|d| d.get("code")),
        Some(&serde_json::json!("field_has_zones"))
    );
}

#[rstest]
#[tokio::test]
async fn delete_removes_empty_field(zones: MockZoneRepository) {
    let mut fields = repo_with(Some(field_owned_by(1)));
    fields.expect_zone_count().return_once(|_| Ok(0));
    fields.expect_delete().times(1).return_once(|_| Ok(()));

    let service = FieldService::new(Arc::new(fields), Arc::new(zones));
    service
        .delete_field(user(1), field_id())
        .await
        .expect("deleted");
}

#[rstest]
#[tokio::test]
async fn connection_failures_become_service_unavailable(zones: MockZoneRepository) {
    let mut fields = MockFieldRepository::new();
    fields
        .expect_list_for_owner()
        .return_once(|_| Err(FieldRepositoryError::connection("pool timed out")));

    let service = FieldService::new(Arc::new(fields), Arc::new(zones));
    let err = service.list_fields(user(1)).await.expect_err("pool down");
    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
}

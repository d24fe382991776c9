//! Field (land parcel) handlers.
//!
//! ```text
//! GET    /api/fields
//! POST   /api/fields {"field_name":"North","size_square_meter":"1600","vertices":[{"lat":7.0,"lng":99.0}]}
//! GET    /api/fields/{field_id}
//! PUT    /api/fields/{field_id}
//! DELETE /api/fields/{field_id}
//! GET    /api/fields/{field_id}/zones
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::{Field, FieldDetail, FieldDraft, FieldId, FieldSummary, FieldVertex};
use crate::inbound::http::ApiResult;
use crate::inbound::http::responses::ListResponse;
use crate::inbound::http::schemas::{ErrorSchema, VertexInputSchema};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    boundary_from, lenient_f64, map_field_validation_error, path_id, present,
};
use crate::inbound::http::zones::ZoneResponse;

/// Boundary vertex as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VertexResponse {
    pub point_order: i32,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<FieldVertex> for VertexResponse {
    fn from(vertex: FieldVertex) -> Self {
        Self {
            point_order: vertex.point_order,
            latitude: vertex.position.latitude(),
            longitude: vertex.position.longitude(),
        }
    }
}

/// Field as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FieldResponse {
    pub field_id: i32,
    #[schema(example = "North plot")]
    pub field_name: String,
    #[schema(example = 1600.0)]
    pub size_square_meter: f64,
    #[schema(format = "date-time")]
    pub created_at: String,
}

impl From<Field> for FieldResponse {
    fn from(field: Field) -> Self {
        Self {
            field_id: field.id.get(),
            field_name: field.name,
            size_square_meter: field.size_square_meter,
            created_at: field.created_at.to_rfc3339(),
        }
    }
}

/// Field list row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FieldSummaryResponse {
    #[serde(flatten)]
    pub field: FieldResponse,
    pub vertex_count: i64,
}

impl From<FieldSummary> for FieldSummaryResponse {
    fn from(summary: FieldSummary) -> Self {
        Self {
            field: FieldResponse::from(summary.field),
            vertex_count: summary.vertex_count,
        }
    }
}

/// Field with its boundary.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FieldDetailResponse {
    #[serde(flatten)]
    pub field: FieldResponse,
    pub vertices: Vec<VertexResponse>,
}

impl From<FieldDetail> for FieldDetailResponse {
    fn from(detail: FieldDetail) -> Self {
        Self {
            field: FieldResponse::from(detail.field),
            vertices: detail.vertices.into_iter().map(VertexResponse::from).collect(),
        }
    }
}

/// Body for creating or updating a field.
///
/// `vertices` may be a list or a JSON-encoded list. On update the stored
/// boundary is replaced only when the key is present.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct FieldRequest {
    pub field_name: Option<String>,
    #[schema(value_type = f64)]
    pub size_square_meter: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<Vec<VertexInputSchema>>)]
    pub vertices: Option<Value>,
}

impl FieldRequest {
    fn into_draft(self) -> ApiResult<FieldDraft> {
        FieldDraft::try_new(
            self.field_name.as_deref(),
            self.size_square_meter.as_ref().and_then(lenient_f64),
            self.vertices.as_ref().map(boundary_from),
        )
        .map_err(|err| map_field_validation_error(&err))
    }
}

/// Identifier of a newly created field.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatedFieldResponse {
    pub field_id: i32,
}

fn field_id(raw: i32) -> ApiResult<FieldId> {
    path_id(raw, "field")
}

/// List the user's fields ordered by name.
#[utoipa::path(
    get,
    path = "/api/fields",
    responses(
        (status = 200, description = "Fields", body = ListResponse<FieldSummaryResponse>),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["fields"],
    operation_id = "listFields"
)]
#[get("/fields")]
pub async fn list_fields(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<ListResponse<FieldSummaryResponse>>> {
    let owner = session.require_user_id()?;
    let fields = state.fields_query.list_fields(owner).await?;
    Ok(web::Json(ListResponse::from_rows(fields)))
}

/// Create a field with an optional boundary.
#[utoipa::path(
    post,
    path = "/api/fields",
    request_body = FieldRequest,
    responses(
        (status = 201, description = "Field created", body = CreatedFieldResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["fields"],
    operation_id = "createField"
)]
#[post("/fields")]
pub async fn create_field(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<FieldRequest>,
) -> ApiResult<HttpResponse> {
    let owner = session.require_user_id()?;
    let draft = payload.into_inner().into_draft()?;
    let field = state.fields.create_field(owner, draft).await?;
    Ok(HttpResponse::Created().json(CreatedFieldResponse {
        field_id: field.id.get(),
    }))
}

/// Fetch one field with its vertices. Fields of other users are reported as
/// missing.
#[utoipa::path(
    get,
    path = "/api/fields/{field_id}",
    params(("field_id" = i32, Path, description = "Field identifier")),
    responses(
        (status = 200, description = "Field", body = FieldDetailResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Field not found", body = ErrorSchema)
    ),
    tags = ["fields"],
    operation_id = "getField"
)]
#[get("/fields/{field_id}")]
pub async fn get_field(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
) -> ApiResult<web::Json<FieldDetailResponse>> {
    let owner = session.require_user_id()?;
    let detail = state
        .fields_query
        .get_field(owner, field_id(path.into_inner())?)
        .await?;
    Ok(web::Json(FieldDetailResponse::from(detail)))
}

/// Update a field's name and size, and its boundary when `vertices` is sent.
#[utoipa::path(
    put,
    path = "/api/fields/{field_id}",
    params(("field_id" = i32, Path, description = "Field identifier")),
    request_body = FieldRequest,
    responses(
        (status = 200, description = "Field updated", body = FieldResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Field owned by another user", body = ErrorSchema),
        (status = 404, description = "Field not found", body = ErrorSchema)
    ),
    tags = ["fields"],
    operation_id = "updateField"
)]
#[put("/fields/{field_id}")]
pub async fn update_field(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
    payload: web::Json<FieldRequest>,
) -> ApiResult<web::Json<FieldResponse>> {
    let owner = session.require_user_id()?;
    let id = field_id(path.into_inner())?;
    let draft = payload.into_inner().into_draft()?;
    let field = state.fields.update_field(owner, id, draft).await?;
    Ok(web::Json(FieldResponse::from(field)))
}

/// Delete a field that has no zones.
#[utoipa::path(
    delete,
    path = "/api/fields/{field_id}",
    params(("field_id" = i32, Path, description = "Field identifier")),
    responses(
        (status = 204, description = "Field deleted"),
        (status = 400, description = "Field still has zones", body = ErrorSchema),
        (status = 403, description = "Field owned by another user", body = ErrorSchema),
        (status = 404, description = "Field not found", body = ErrorSchema)
    ),
    tags = ["fields"],
    operation_id = "deleteField"
)]
#[delete("/fields/{field_id}")]
pub async fn delete_field(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    let owner = session.require_user_id()?;
    state
        .fields
        .delete_field(owner, field_id(path.into_inner())?)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// List the zones of a field with their inspection counts.
#[utoipa::path(
    get,
    path = "/api/fields/{field_id}/zones",
    params(("field_id" = i32, Path, description = "Field identifier")),
    responses(
        (status = 200, description = "Zones of the field", body = ListResponse<ZoneResponse>),
        (status = 403, description = "Field owned by another user", body = ErrorSchema),
        (status = 404, description = "Field not found", body = ErrorSchema)
    ),
    tags = ["fields"],
    operation_id = "listFieldZones"
)]
#[get("/fields/{field_id}/zones")]
pub async fn list_field_zones(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
) -> ApiResult<web::Json<ListResponse<ZoneResponse>>> {
    let owner = session.require_user_id()?;
    let zones = state
        .fields_query
        .list_field_zones(owner, field_id(path.into_inner())?)
        .await?;
    Ok(web::Json(ListResponse::from_rows(zones)))
}

/// Register every field route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_fields)
        .service(create_field)
        .service(list_field_zones)
        .service(get_field)
        .service(update_field)
        .service(delete_field);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;
    use crate::domain::ports::{MockFieldCommand, MockFieldQuery};
    use crate::domain::{Error, GeoPoint, UserId};
    use crate::inbound::http::test_utils::{fixture_ports, signed_in, test_app};
    use crate::inbound::http::zones::sample_zone;

    fn sample_field(id: i32, name: &str) -> Field {
        Field {
            id: FieldId::new(id).expect("valid field id"),
            owner_id: UserId::new(1).expect("valid user id"),
            name: name.to_owned(),
            size_square_meter: 1600.0,
            created_at: chrono::Utc
                .with_ymd_and_hms(2025, 2, 1, 8, 0, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    #[fixture]
    fn command() -> MockFieldCommand {
        MockFieldCommand::new()
    }

    #[fixture]
    fn query() -> MockFieldQuery {
        MockFieldQuery::new()
    }

    async fn send(
        command: MockFieldCommand,
        query: MockFieldQuery,
        request: actix_test::TestRequest,
    ) -> (StatusCode, Value) {
        let mut ports = fixture_ports();
        ports.fields = Arc::new(command);
        ports.fields_query = Arc::new(query);
        let app =
            actix_test::init_service(test_app(HttpState::new(ports), configure)).await;
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
    async fn list_fields_flattens_summary_rows(command: MockFieldCommand, mut query: MockFieldQuery) {
        query.expect_list_fields().returning(|_| {
            Ok(vec![FieldSummary {
                field: sample_field(1, "North"),
                vertex_count: 4,
            }])
        });

        let (status, body) =
            send(command, query, actix_test::TestRequest::get().uri("/api/fields")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["field_name"], "North");
        assert_eq!(body["data"][0]["vertex_count"], 4);
    }

    #[rstest]
    #[actix_web::test]
    async fn create_field_accepts_string_numbers_and_json_vertices(
        mut command: MockFieldCommand,
        query: MockFieldQuery,
    ) {
        command
            .expect_create_field()
            .withf(|_, draft| {
                draft.name() == "North"
                    && (draft.size_square_meter() - 1600.5).abs() < f64::EPSILON
                    && draft.boundary().map(|b| b.len()) == Some(2)
            })
            .times(1)
            .returning(|_, _| Ok(sample_field(7, "North")));

        let (status, body) = send(
            command,
            query,
            actix_test::TestRequest::post().uri("/api/fields").set_json(json!({
                "field_name": "North",
                "size_square_meter": "1600.5",
                "vertices": "[{\"lat\":7.0,\"lng\":99.0},{\"latitude\":7.1,\"longitude\":99.1}]"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"field_id": 7}));
    }

    #[rstest]
    #[case(json!({"size_square_meter": 10}), "field_name", "missing_field")]
    #[case(json!({"field_name": "A", "size_square_meter": "big"}), "size_square_meter", "invalid_size")]
    #[case(json!({"field_name": "A", "size_square_meter": 0}), "size_square_meter", "invalid_size")]
    #[actix_web::test]
    async fn create_field_rejects_invalid_drafts(
        mut command: MockFieldCommand,
        query: MockFieldQuery,
        #[case] payload: Value,
        #[case] field: &str,
        #[case] code: &str,
    ) {
        command.expect_create_field().never();

        let (status, body) = send(
            command,
            query,
            actix_test::TestRequest::post().uri("/api/fields").set_json(payload),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["field"], field);
        assert_eq!(body["details"]["code"], code);
    }

    #[rstest]
    #[case(json!({"field_name": "A", "size_square_meter": 5}), false)]
    #[case(json!({"field_name": "A", "size_square_meter": 5, "vertices": null}), true)]
    #[actix_web::test]
    async fn update_replaces_vertices_only_when_key_present(
        mut command: MockFieldCommand,
        query: MockFieldQuery,
        #[case] payload: Value,
        #[case] replaces: bool,
    ) {
        command
            .expect_update_field()
            .withf(move |_, id, draft| id.get() == 7 && draft.boundary().is_some() == replaces)
            .times(1)
            .returning(|_, _, _| Ok(sample_field(7, "A")));

        let (status, body) = send(
            command,
            query,
            actix_test::TestRequest::put().uri("/api/fields/7").set_json(payload),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["field_name"], "A");
    }

    #[rstest]
    #[actix_web::test]
    async fn get_field_returns_ordered_vertices(command: MockFieldCommand, mut query: MockFieldQuery) {
        query.expect_get_field().returning(|_, _| {
            Ok(FieldDetail {
                field: sample_field(3, "South"),
                vertices: vec![FieldVertex {
                    point_order: 1,
                    position: GeoPoint::new(7.0, 99.0).expect("valid point"),
                }],
            })
        });

        let (status, body) =
            send(command, query, actix_test::TestRequest::get().uri("/api/fields/3")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["field_id"], 3);
        assert_eq!(body["vertices"][0]["point_order"], 1);
    }

    #[rstest]
    #[actix_web::test]
    async fn foreign_field_delete_is_forbidden(mut command: MockFieldCommand, query: MockFieldQuery) {
        command
            .expect_delete_field()
            .returning(|_, _| Err(Error::forbidden("field belongs to another user")));

        let (status, _) =
            send(command, query, actix_test::TestRequest::delete().uri("/api/fields/3")).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[rstest]
    #[actix_web::test]
    async fn delete_field_answers_no_content(mut command: MockFieldCommand, query: MockFieldQuery) {
        command.expect_delete_field().times(1).returning(|_, _| Ok(()));

        let (status, body) =
            send(command, query, actix_test::TestRequest::delete().uri("/api/fields/3")).await;

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);
    }

    #[rstest]
    #[actix_web::test]
    async fn field_zones_are_listed(command: MockFieldCommand, mut query: MockFieldQuery) {
        query
            .expect_list_field_zones()
            .returning(|who, _| Ok(vec![sample_zone(4, who)]));

        let (status, body) =
            send(command, query, actix_test::TestRequest::get().uri("/api/fields/1/zones")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["zone_id"], 4);
    }
}

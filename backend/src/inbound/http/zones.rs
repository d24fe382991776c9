//! Zone and tree mark handlers.
//!
//! ```text
//! GET    /api/zones?field_id=1
//! POST   /api/zones {"field_id":1,"zone_name":"A","marks":[{"lat":7.0,"lng":99.0}]}
//! GET    /api/zones/{zone_id}
//! PUT    /api/zones/{zone_id} {"zone_name":"A","num_trees":40}
//! DELETE /api/zones/{zone_id}
//! GET    /api/zones/{zone_id}/marks
//! POST   /api/zones/{zone_id}/marks {"tree_no":3,"latitude":7.0,"longitude":99.0}
//! PUT    /api/zones/{zone_id}/marks {"marks":[...]}
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    Error, FieldId, GeoPoint, MarkTally, TreeMark, TreeMarkDraft, TreeMarkInput, UserId, Zone,
    ZoneDraft, ZoneId, resolve_tree_marks,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::responses::ListResponse;
use crate::inbound::http::schemas::{ErrorSchema, MarkInputSchema};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, body_id, lenient_f64, map_zone_validation_error, mark_inputs, missing_field_error,
    not_a_list_error, optional_i32, path_id,
};

const FIELD_ID: FieldName = FieldName::new("field_id");
const NUM_TREES: FieldName = FieldName::new("num_trees");
const MARKS: FieldName = FieldName::new("marks");
const TREE_NO: FieldName = FieldName::new("tree_no");
const LATITUDE: FieldName = FieldName::new("latitude");
const LONGITUDE: FieldName = FieldName::new("longitude");

/// Zone as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ZoneResponse {
    pub zone_id: i32,
    pub field_id: i32,
    #[schema(example = "Zone A")]
    pub zone_name: String,
    pub num_trees: i32,
    pub inspection_count: i64,
    #[schema(format = "date-time")]
    pub created_at: String,
}

impl From<Zone> for ZoneResponse {
    fn from(zone: Zone) -> Self {
        Self {
            zone_id: zone.id.get(),
            field_id: zone.field_id.get(),
            zone_name: zone.name,
            num_trees: zone.num_trees,
            inspection_count: zone.inspection_count,
            created_at: zone.created_at.to_rfc3339(),
        }
    }
}

/// Stored tree mark.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TreeMarkResponse {
    pub mark_id: i32,
    pub zone_id: i32,
    pub tree_no: i32,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<TreeMark> for TreeMarkResponse {
    fn from(mark: TreeMark) -> Self {
        Self {
            mark_id: mark.id.get(),
            zone_id: mark.zone_id.get(),
            tree_no: mark.tree_no,
            latitude: mark.position.latitude(),
            longitude: mark.position.longitude(),
        }
    }
}

/// Query string for the zone list.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ZonesQuery {
    /// Restrict the list to one field.
    pub field_id: Option<i32>,
}

/// Body for `POST /api/zones`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateZoneRequest {
    #[schema(value_type = i32)]
    pub field_id: Option<Value>,
    pub zone_name: Option<String>,
    #[schema(value_type = Option<i32>)]
    pub num_trees: Option<Value>,
    #[schema(value_type = Option<Vec<MarkInputSchema>>)]
    pub marks: Option<Value>,
}

/// Body for `PUT /api/zones/{zone_id}`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateZoneRequest {
    pub zone_name: Option<String>,
    #[schema(value_type = i32)]
    pub num_trees: Option<Value>,
}

/// Body for the mark endpoints: either a `marks` list or one mark.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct MarksRequest {
    #[schema(value_type = Option<Vec<MarkInputSchema>>)]
    pub marks: Option<Value>,
    #[schema(value_type = Option<i32>)]
    pub tree_no: Option<Value>,
    #[schema(value_type = Option<f64>)]
    pub latitude: Option<Value>,
    #[schema(value_type = Option<f64>)]
    pub longitude: Option<Value>,
    #[schema(value_type = Option<f64>)]
    pub lat: Option<Value>,
    #[schema(value_type = Option<f64>)]
    pub lng: Option<Value>,
}

/// Result of creating a zone.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatedZoneResponse {
    pub zone_id: i32,
    pub inserted_marks: usize,
}

/// Result of adding or replacing marks.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MarkTallyResponse {
    pub inserted: usize,
    pub num_trees: i32,
}

impl From<MarkTally> for MarkTallyResponse {
    fn from(tally: MarkTally) -> Self {
        Self {
            inserted: tally.inserted,
            num_trees: tally.num_trees,
        }
    }
}

fn resolve(inputs: &[TreeMarkInput]) -> ApiResult<Vec<TreeMarkDraft>> {
    resolve_tree_marks(inputs).map_err(|err| map_zone_validation_error(&err))
}

/// `None` for absent or null lists; an error for anything but an array.
fn mark_list(marks: Option<&Value>) -> ApiResult<Option<&[Value]>> {
    match marks {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items.as_slice())),
        Some(_) => Err(not_a_list_error(MARKS)),
    }
}

fn coordinate(primary: Option<&Value>, alias: Option<&Value>, field: FieldName) -> ApiResult<f64> {
    primary
        .or(alias)
        .and_then(lenient_f64)
        .ok_or_else(|| missing_field_error(field))
}

fn single_mark(body: &MarksRequest) -> ApiResult<TreeMarkInput> {
    let tree_no = optional_i32(body.tree_no.as_ref(), TREE_NO)?
        .ok_or_else(|| missing_field_error(TREE_NO))?;
    let latitude = coordinate(body.latitude.as_ref(), body.lat.as_ref(), LATITUDE)?;
    let longitude = coordinate(body.longitude.as_ref(), body.lng.as_ref(), LONGITUDE)?;
    let position = GeoPoint::new(latitude, longitude).ok_or_else(|| {
        Error::invalid_request("coordinates are out of range")
            .with_details(json!({ "code": "invalid_coordinates" }))
    })?;
    Ok(TreeMarkInput {
        tree_no: Some(tree_no),
        position: Some(position),
    })
}

fn zone_id(raw: i32) -> ApiResult<ZoneId> {
    path_id(raw, "zone")
}

/// List the user's zones, optionally for one field.
#[utoipa::path(
    get,
    path = "/api/zones",
    params(ZonesQuery),
    responses(
        (status = 200, description = "Zones", body = ListResponse<ZoneResponse>),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Field owned by another user", body = ErrorSchema),
        (status = 404, description = "Field not found", body = ErrorSchema)
    ),
    tags = ["zones"],
    operation_id = "listZones"
)]
#[get("/zones")]
pub async fn list_zones(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<ZonesQuery>,
) -> ApiResult<web::Json<ListResponse<ZoneResponse>>> {
    let owner = session.require_user_id()?;
    let field_id = query
        .field_id
        .map(|raw| path_id::<FieldId>(raw, "field"))
        .transpose()?;
    let zones = state.zones_query.list_zones(owner, field_id).await?;
    Ok(web::Json(ListResponse::from_rows(zones)))
}

/// Create a zone, optionally with its tree marks.
#[utoipa::path(
    post,
    path = "/api/zones",
    request_body = CreateZoneRequest,
    responses(
        (status = 201, description = "Zone created", body = CreatedZoneResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Field owned by another user", body = ErrorSchema),
        (status = 404, description = "Field not found", body = ErrorSchema)
    ),
    tags = ["zones"],
    operation_id = "createZone"
)]
#[post("/zones")]
pub async fn create_zone(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateZoneRequest>,
) -> ApiResult<HttpResponse> {
    let owner = session.require_user_id()?;
    let body = payload.into_inner();
    let field_id: FieldId = optional_i32(body.field_id.as_ref(), FIELD_ID)?
        .ok_or_else(|| missing_field_error(FIELD_ID))
        .and_then(|raw| body_id(raw, FIELD_ID))?;
    let draft = ZoneDraft::try_new(
        body.zone_name.as_deref(),
        optional_i32(body.num_trees.as_ref(), NUM_TREES)?,
    )
    .map_err(|err| map_zone_validation_error(&err))?;
    let marks = mark_list(body.marks.as_ref())?
        .map(|items| resolve(&mark_inputs(items)))
        .transpose()?;
    let created = state
        .zones
        .create_zone(owner, field_id, draft, marks)
        .await?;
    Ok(HttpResponse::Created().json(CreatedZoneResponse {
        zone_id: created.zone.id.get(),
        inserted_marks: created.inserted_marks,
    }))
}

/// Fetch one zone. Zones of other users are reported as missing.
#[utoipa::path(
    get,
    path = "/api/zones/{zone_id}",
    params(("zone_id" = i32, Path, description = "Zone identifier")),
    responses(
        (status = 200, description = "Zone", body = ZoneResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Zone not found", body = ErrorSchema)
    ),
    tags = ["zones"],
    operation_id = "getZone"
)]
#[get("/zones/{zone_id}")]
pub async fn get_zone(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
) -> ApiResult<web::Json<ZoneResponse>> {
    let owner = session.require_user_id()?;
    let zone = state
        .zones_query
        .get_zone(owner, zone_id(path.into_inner())?)
        .await?;
    Ok(web::Json(ZoneResponse::from(zone)))
}

/// Rename a zone and set its tree count.
#[utoipa::path(
    put,
    path = "/api/zones/{zone_id}",
    params(("zone_id" = i32, Path, description = "Zone identifier")),
    request_body = UpdateZoneRequest,
    responses(
        (status = 200, description = "Zone updated", body = ZoneResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Zone owned by another user", body = ErrorSchema),
        (status = 404, description = "Zone not found", body = ErrorSchema)
    ),
    tags = ["zones"],
    operation_id = "updateZone"
)]
#[put("/zones/{zone_id}")]
pub async fn update_zone(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
    payload: web::Json<UpdateZoneRequest>,
) -> ApiResult<web::Json<ZoneResponse>> {
    let owner = session.require_user_id()?;
    let id = zone_id(path.into_inner())?;
    let body = payload.into_inner();
    let num_trees = optional_i32(body.num_trees.as_ref(), NUM_TREES)?
        .ok_or_else(|| missing_field_error(NUM_TREES))?;
    let draft = ZoneDraft::try_new(body.zone_name.as_deref(), Some(num_trees))
        .map_err(|err| map_zone_validation_error(&err))?;
    let zone = state.zones.update_zone(owner, id, draft).await?;
    Ok(web::Json(ZoneResponse::from(zone)))
}

/// Delete a zone that has no inspection rounds.
#[utoipa::path(
    delete,
    path = "/api/zones/{zone_id}",
    params(("zone_id" = i32, Path, description = "Zone identifier")),
    responses(
        (status = 204, description = "Zone deleted"),
        (status = 400, description = "Zone has inspection rounds", body = ErrorSchema),
        (status = 403, description = "Zone owned by another user", body = ErrorSchema),
        (status = 404, description = "Zone not found", body = ErrorSchema)
    ),
    tags = ["zones"],
    operation_id = "deleteZone"
)]
#[delete("/zones/{zone_id}")]
pub async fn delete_zone(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    let owner = session.require_user_id()?;
    state
        .zones
        .delete_zone(owner, zone_id(path.into_inner())?)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// List a zone's tree marks ordered by tree number.
#[utoipa::path(
    get,
    path = "/api/zones/{zone_id}/marks",
    params(("zone_id" = i32, Path, description = "Zone identifier")),
    responses(
        (status = 200, description = "Tree marks", body = ListResponse<TreeMarkResponse>),
        (status = 403, description = "Zone owned by another user", body = ErrorSchema),
        (status = 404, description = "Zone not found", body = ErrorSchema)
    ),
    tags = ["zones"],
    operation_id = "listMarks"
)]
#[get("/zones/{zone_id}/marks")]
pub async fn list_marks(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
) -> ApiResult<web::Json<ListResponse<TreeMarkResponse>>> {
    let owner = session.require_user_id()?;
    let marks = state
        .zones_query
        .list_marks(owner, zone_id(path.into_inner())?)
        .await?;
    Ok(web::Json(ListResponse::from_rows(marks)))
}

/// Add one mark, or several through a `marks` list.
#[utoipa::path(
    post,
    path = "/api/zones/{zone_id}/marks",
    params(("zone_id" = i32, Path, description = "Zone identifier")),
    request_body = MarksRequest,
    responses(
        (status = 200, description = "Marks added", body = MarkTallyResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Zone owned by another user", body = ErrorSchema),
        (status = 404, description = "Zone not found", body = ErrorSchema),
        (status = 409, description = "Tree already marked", body = ErrorSchema)
    ),
    tags = ["zones"],
    operation_id = "addMarks"
)]
#[post("/zones/{zone_id}/marks")]
pub async fn add_marks(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
    payload: web::Json<MarksRequest>,
) -> ApiResult<web::Json<MarkTallyResponse>> {
    let owner = session.require_user_id()?;
    let id = zone_id(path.into_inner())?;
    let body = payload.into_inner();
    let marks = match mark_list(body.marks.as_ref())? {
        Some([]) => return Err(missing_field_error(MARKS)),
        Some(items) => resolve(&mark_inputs(items))?,
        None => resolve(&[single_mark(&body)?])?,
    };
    let tally = state.zones.add_marks(owner, id, marks).await?;
    Ok(web::Json(MarkTallyResponse::from(tally)))
}

/// Replace every mark of a zone.
#[utoipa::path(
    put,
    path = "/api/zones/{zone_id}/marks",
    params(("zone_id" = i32, Path, description = "Zone identifier")),
    request_body = MarksRequest,
    responses(
        (status = 200, description = "Marks replaced", body = MarkTallyResponse),
        (status = 400, description = "marks is not a list", body = ErrorSchema),
        (status = 403, description = "Zone owned by another user", body = ErrorSchema),
        (status = 404, description = "Zone not found", body = ErrorSchema)
    ),
    tags = ["zones"],
    operation_id = "replaceMarks"
)]
#[put("/zones/{zone_id}/marks")]
pub async fn replace_marks(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
    payload: web::Json<MarksRequest>,
) -> ApiResult<web::Json<MarkTallyResponse>> {
    let owner = session.require_user_id()?;
    let id = zone_id(path.into_inner())?;
    let body = payload.into_inner();
    let items = mark_list(body.marks.as_ref())?.ok_or_else(|| not_a_list_error(MARKS))?;
    let marks = resolve(&mark_inputs(items))?;
    let tally = state.zones.replace_marks(owner, id, marks).await?;
    Ok(web::Json(MarkTallyResponse::from(tally)))
}

/// Register every zone route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_zones)
        .service(create_zone)
        .service(list_marks)
        .service(add_marks)
        .service(replace_marks)
        .service(get_zone)
        .service(update_zone)
        .service(delete_zone);
}

#[cfg(test)]
pub(crate) fn sample_zone(id: i32, owner: UserId) -> Zone {
    use chrono::TimeZone;
    Zone {
        id: ZoneId::new(id).expect("valid zone id"),
        field_id: FieldId::new(1).expect("valid field id"),
        owner_id: owner,
        name: format!("Zone {id}"),
        num_trees: 10,
        inspection_count: 0,
        created_at: chrono::Utc
            .with_ymd_and_hms(2025, 1, 2, 3, 4, 5)
            .single()
            .expect("valid timestamp"),
    }
}

#[cfg(test)]
#[path = "zones_tests.rs"]
mod tests;

//! Reference data handlers. Public: no session is required.

use actix_web::{get, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Fertilizer, Nutrient, ReferenceCatalogue};
use crate::inbound::http::ApiResult;
use crate::inbound::http::responses::ListResponse;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

/// Liveness payload of the reference service.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReferenceHealth {
    #[schema(example = "reference")]
    pub service: &'static str,
    #[schema(example = "ok")]
    pub status: &'static str,
}

/// Nutrient deficiency as returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NutrientResponse {
    #[schema(example = "N")]
    pub code: String,
    pub name: String,
    pub symptoms: Option<String>,
    pub notes: Option<String>,
}

impl From<Nutrient> for NutrientResponse {
    fn from(nutrient: Nutrient) -> Self {
        Self {
            code: nutrient.code,
            name: nutrient.name,
            symptoms: nutrient.symptoms,
            notes: nutrient.notes,
        }
    }
}

/// Fertilizer as returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FertilizerResponse {
    pub id: i32,
    pub name: String,
    #[schema(example = "46-0-0")]
    pub formulation: Option<String>,
    pub description: Option<String>,
}

impl From<Fertilizer> for FertilizerResponse {
    fn from(fertilizer: Fertilizer) -> Self {
        Self {
            id: fertilizer.id.get(),
            name: fertilizer.name,
            formulation: fertilizer.formulation,
            description: fertilizer.description,
        }
    }
}

/// Both reference lists.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CatalogueResponse {
    pub nutrients: Vec<NutrientResponse>,
    pub fertilizers: Vec<FertilizerResponse>,
}

impl From<ReferenceCatalogue> for CatalogueResponse {
    fn from(value: ReferenceCatalogue) -> Self {
        Self {
            nutrients: value.nutrients.into_iter().map(Into::into).collect(),
            fertilizers: value.fertilizers.into_iter().map(Into::into).collect(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/reference/health",
    responses((status = 200, description = "Reference service is up", body = ReferenceHealth)),
    tags = ["reference"],
    operation_id = "referenceHealth",
    security([])
)]
#[get("/reference/health")]
pub async fn reference_health() -> web::Json<ReferenceHealth> {
    web::Json(ReferenceHealth {
        service: "reference",
        status: "ok",
    })
}

/// Nutrient deficiencies ordered by code.
#[utoipa::path(
    get,
    path = "/api/reference/nutrients",
    responses(
        (status = 200, description = "Nutrients", body = ListResponse<NutrientResponse>),
        (status = 503, description = "Database unavailable", body = ErrorSchema)
    ),
    tags = ["reference"],
    operation_id = "listNutrients",
    security([])
)]
#[get("/reference/nutrients")]
pub async fn nutrients(
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<ListResponse<NutrientResponse>>> {
    let rows = state.reference.nutrients().await?;
    Ok(web::Json(ListResponse::from_rows(rows)))
}

/// Fertilizers ordered by id.
#[utoipa::path(
    get,
    path = "/api/reference/fertilizers",
    responses(
        (status = 200, description = "Fertilizers", body = ListResponse<FertilizerResponse>),
        (status = 503, description = "Database unavailable", body = ErrorSchema)
    ),
    tags = ["reference"],
    operation_id = "listFertilizers",
    security([])
)]
#[get("/reference/fertilizers")]
pub async fn fertilizers(
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<ListResponse<FertilizerResponse>>> {
    let rows = state.reference.fertilizers().await?;
    Ok(web::Json(ListResponse::from_rows(rows)))
}

/// Nutrients and fertilizers in one response.
#[utoipa::path(
    get,
    path = "/api/reference/all",
    responses(
        (status = 200, description = "Reference catalogue", body = CatalogueResponse),
        (status = 503, description = "Database unavailable", body = ErrorSchema)
    ),
    tags = ["reference"],
    operation_id = "referenceCatalogue",
    security([])
)]
#[get("/reference/all")]
pub async fn catalogue(state: web::Data<HttpState>) -> ApiResult<web::Json<CatalogueResponse>> {
    let catalogue = state.reference.catalogue().await?;
    Ok(web::Json(CatalogueResponse::from(catalogue)))
}

/// Register every reference route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(reference_health)
        .service(nutrients)
        .service(fertilizers)
        .service(catalogue);
}

//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] collects every HTTP endpoint of the inbound layer together with
//! the schema wrappers from [`crate::inbound::http::schemas`], which describe
//! domain types without deriving utoipa traits on them. Response DTOs that
//! handlers reference are registered automatically through their paths.
//!
//! The document backs Swagger UI in debug builds and is exported by
//! `cargo run --bin openapi-dump`.

use crate::inbound::http::schemas::{
    ErrorCodeSchema, ErrorSchema, HistoryGroupingSchema, ImageDetectionsSchema,
    InspectionStatusSchema, MarkInputSchema, PredictionSchema, RecommendationStatusSchema,
    SeveritySchema, VertexInputSchema,
};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/auth/login or /api/auth/register.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Cocoa Farm Management API",
        description = "Fields, zones and inspection rounds for cocoa farms, with \
                       image-based nutrient deficiency detection and fertilizer \
                       recommendations."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::health::index,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
        crate::inbound::http::auth::login,
        crate::inbound::http::auth::register,
        crate::inbound::http::auth::logout,
        crate::inbound::http::auth::validate,
        crate::inbound::http::users::user_info,
        crate::inbound::http::fields::list_fields,
        crate::inbound::http::fields::create_field,
        crate::inbound::http::fields::get_field,
        crate::inbound::http::fields::update_field,
        crate::inbound::http::fields::delete_field,
        crate::inbound::http::fields::list_field_zones,
        crate::inbound::http::zones::list_zones,
        crate::inbound::http::zones::create_zone,
        crate::inbound::http::zones::get_zone,
        crate::inbound::http::zones::update_zone,
        crate::inbound::http::zones::delete_zone,
        crate::inbound::http::zones::list_marks,
        crate::inbound::http::zones::add_marks,
        crate::inbound::http::zones::replace_marks,
        crate::inbound::http::inspections::list_inspections,
        crate::inbound::http::inspections::history,
        crate::inbound::http::inspections::start_round,
        crate::inbound::http::inspections::upload_image,
        crate::inbound::http::inspections::get_inspection,
        crate::inbound::http::inspections::analyze,
        crate::inbound::http::inspections::set_status,
        crate::inbound::http::inspections::list_recommendations,
        crate::inbound::http::inspections::update_recommendation,
        crate::inbound::http::reference::reference_health,
        crate::inbound::http::reference::nutrients,
        crate::inbound::http::reference::fertilizers,
        crate::inbound::http::reference::catalogue,
        crate::inbound::http::detect::labels,
        crate::inbound::http::detect::detect,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        InspectionStatusSchema,
        RecommendationStatusSchema,
        SeveritySchema,
        HistoryGroupingSchema,
        PredictionSchema,
        ImageDetectionsSchema,
        VertexInputSchema,
        MarkInputSchema,
    )),
    tags(
        (name = "auth", description = "Sign-in, sign-up and session checks"),
        (name = "users", description = "Current account profile"),
        (name = "health", description = "Service index and probes"),
        (name = "fields", description = "Farm fields and their boundaries"),
        (name = "zones", description = "Zones within a field and their tree marks"),
        (name = "inspections", description = "Inspection rounds, images, analysis and recommendations"),
        (name = "reference", description = "Nutrient and fertilizer catalogue"),
        (name = "detect", description = "Direct access to the deficiency detector")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Tests verifying the registered paths, schemas and security scheme.

    use super::*;
    use rstest::rstest;
    use utoipa::OpenApi;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    // utoipa replaces :: with . in schema names
    const ERROR_SCHEMA_NAME: &str = "crate.domain.Error";

    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[rstest]
    fn error_schema_has_code_and_message() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let error_schema = schemas.get(ERROR_SCHEMA_NAME).expect("Error schema");

        assert_object_schema_has_field(error_schema, "code");
        assert_object_schema_has_field(error_schema, "message");
    }

    #[rstest]
    #[case("/api/auth/login")]
    #[case("/api/fields/{field_id}/zones")]
    #[case("/api/zones/{zone_id}/marks")]
    #[case("/api/inspections/start")]
    #[case("/api/inspections/{inspection_id}/images")]
    #[case("/api/inspections/{inspection_id}/status")]
    #[case("/api/inspections/recommendations/{rec_id}")]
    #[case("/api/reference/all")]
    #[case("/api/detect")]
    #[case("/health/ready")]
    fn documents_endpoint(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing path {path}");
    }

    #[rstest]
    fn registers_session_cookie_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("SessionCookie"));
    }

    #[rstest]
    fn document_serialises_to_json() {
        let json = ApiDoc::openapi().to_json().expect("openapi json");
        assert!(json.contains("Cocoa Farm Management API"));
    }
}

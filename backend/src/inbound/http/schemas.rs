//! OpenAPI schema definitions for domain types.
//!
//! Domain types remain framework-agnostic by not deriving `ToSchema`. This
//! module provides the schema definitions required for OpenAPI documentation
//! using utoipa's external schema registration. Payload types owned by the
//! handlers derive `ToSchema` directly.

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
///
/// Stable machine-readable error codes returned in API error responses.
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// Authentication failed or is missing.
    #[schema(rename = "unauthorized")]
    Unauthorized,
    /// Authenticated but not permitted to perform this action.
    #[schema(rename = "forbidden")]
    Forbidden,
    /// The requested resource does not exist.
    #[schema(rename = "not_found")]
    NotFound,
    /// The request conflicts with stored state.
    #[schema(rename = "conflict")]
    Conflict,
    /// The uploaded body exceeds the size limit.
    #[schema(rename = "payload_too_large")]
    PayloadTooLarge,
    /// The uploaded file type is not accepted.
    #[schema(rename = "unsupported_media_type")]
    UnsupportedMediaType,
    /// A backing service (database, detector) is unavailable.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    /// An unexpected error occurred on the server.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Error)]
#[schema(rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorSchema {
    /// Stable machine-readable error code.
    #[schema(example = "invalid_request")]
    code: ErrorCodeSchema,
    /// Human-readable message returned to clients.
    #[schema(example = "field_name is required")]
    message: String,
    /// Correlation identifier for tracing this error across systems.
    #[schema(example = "7d3c3a76-8ad1-4d4b-9a4e-2f43d9b1f0c2")]
    trace_id: Option<String>,
    /// Supplementary error details, usually `{field?, code}`.
    details: Option<serde_json::Value>,
}

/// OpenAPI schema for [`crate::domain::InspectionStatus`].
#[derive(ToSchema)]
#[schema(as = crate::domain::InspectionStatus)]
pub enum InspectionStatusSchema {
    #[schema(rename = "pending")]
    Pending,
    #[schema(rename = "completed")]
    Completed,
    #[schema(rename = "cancelled")]
    Cancelled,
}

/// OpenAPI schema for [`crate::domain::RecommendationStatus`].
#[derive(ToSchema)]
#[schema(as = crate::domain::RecommendationStatus)]
pub enum RecommendationStatusSchema {
    #[schema(rename = "suggested")]
    Suggested,
    #[schema(rename = "applied")]
    Applied,
    #[schema(rename = "skipped")]
    Skipped,
}

/// OpenAPI schema for [`crate::domain::Severity`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Severity)]
pub enum SeveritySchema {
    #[schema(rename = "mild")]
    Mild,
    #[schema(rename = "moderate")]
    Moderate,
    #[schema(rename = "severe")]
    Severe,
}

/// OpenAPI schema for [`crate::domain::HistoryGrouping`].
#[derive(ToSchema)]
#[schema(as = crate::domain::HistoryGrouping)]
pub enum HistoryGroupingSchema {
    #[schema(rename = "month")]
    Month,
    #[schema(rename = "year")]
    Year,
}

/// OpenAPI schema for [`crate::domain::Prediction`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Prediction)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct PredictionSchema {
    /// Class label, `ปกติ` for healthy leaves.
    #[schema(rename = "class", example = "N")]
    class: String,
    /// Detector confidence in `[0, 1]`.
    #[schema(example = 0.82)]
    confidence: f64,
}

/// OpenAPI schema for [`crate::domain::ImageDetections`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ImageDetections)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ImageDetectionsSchema {
    /// Image path as given by the caller.
    #[schema(example = "inspections/4/4_20250301T101500.jpg")]
    image: String,
    /// Predictions for the image.
    preds: Vec<PredictionSchema>,
}

/// Vertex as accepted in field requests. `lat`/`lng` are accepted as
/// aliases and numeric strings are accepted for both coordinates.
#[derive(ToSchema)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct VertexInputSchema {
    #[schema(example = 7.0123)]
    latitude: f64,
    #[schema(example = 99.5432)]
    longitude: f64,
}

/// Tree mark as accepted in zone and mark requests. `tree_no` defaults to
/// the mark's 1-based position in the submitted list.
#[derive(ToSchema)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct MarkInputSchema {
    #[schema(example = 1)]
    tree_no: Option<i32>,
    #[schema(example = 7.0123)]
    latitude: f64,
    #[schema(example = 99.5432)]
    longitude: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use utoipa::PartialSchema;

    fn schema_to_json<T: PartialSchema>() -> String {
        serde_json::to_string(&T::schema()).expect("schema serialises to JSON")
    }

    #[rstest]
    fn error_code_schema_lists_every_code() {
        let schema_json = schema_to_json::<ErrorCodeSchema>();
        // utoipa replaces :: with . in schema names
        assert_eq!(ErrorCodeSchema::name(), "crate.domain.ErrorCode");
        for code in [
            "invalid_request",
            "unauthorized",
            "forbidden",
            "not_found",
            "conflict",
            "payload_too_large",
            "unsupported_media_type",
            "service_unavailable",
            "internal_error",
        ] {
            assert!(schema_json.contains(code), "missing {code}");
        }
    }

    #[rstest]
    fn error_schema_uses_camel_case_trace_id() {
        let schema_json = schema_to_json::<ErrorSchema>();
        assert_eq!(ErrorSchema::name(), "crate.domain.Error");
        assert!(schema_json.contains("traceId"));
        assert!(schema_json.contains("details"));
    }

    #[rstest]
    #[case(schema_to_json::<InspectionStatusSchema>(), "cancelled")]
    #[case(schema_to_json::<RecommendationStatusSchema>(), "skipped")]
    #[case(schema_to_json::<SeveritySchema>(), "moderate")]
    #[case(schema_to_json::<HistoryGroupingSchema>(), "year")]
    fn status_schemas_use_lowercase_values(#[case] schema_json: String, #[case] value: &str) {
        assert!(schema_json.contains(value), "missing {value} in {schema_json}");
    }

    #[rstest]
    fn prediction_schema_names_the_class_field() {
        let schema_json = schema_to_json::<ImageDetectionsSchema>();
        assert!(schema_json.contains("preds"));
        assert!(schema_to_json::<PredictionSchema>().contains("\"class\""));
    }
}

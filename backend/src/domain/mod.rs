//! Domain primitives, aggregates, ports and services.
//!
//! Purpose: Define strongly typed farm records (fields, zones, tree marks,
//! inspection rounds) and the use-cases that operate on them. Types stay
//! transport agnostic; inbound adapters translate them into HTTP payloads and
//! outbound adapters into SQL rows.
//!
//! Public surface:
//! - Error / ErrorCode: error payload shared by every use-case.
//! - Accounts: `User`, `LoginCredentials`, `Registration`.
//! - Farm records: `Field`, `Zone`, `TreeMark`, `Inspection` and friends.
//! - `ports`: driving and driven port traits.
//! - Services implementing the driving ports over the driven ones.

pub mod auth;
pub mod detection;
pub mod error;
pub mod field;
pub mod ids;
pub mod inspection;
pub mod ports;
pub mod reference;
pub mod trace_id;
pub mod user;
pub mod zone;

mod account_service;
mod detection_service;
mod field_service;
mod inspection_service;
mod ownership;
mod reference_service;
mod zone_service;

pub use self::account_service::AccountService;
pub use self::auth::{
    LoginCredentials, LoginValidationError, PASSWORD_MIN, Registration, RegistrationParts,
    RegistrationValidationError,
};
pub use self::detection::{
    DEFAULT_CONFIDENCE, ImageDetections, Prediction, confidence_threshold,
};
pub use self::detection_service::DetectionService;
pub use self::error::{Error, ErrorCode, ErrorValidationError, TRACE_ID_HEADER};
pub use self::field::{
    Boundary, Field, FieldDetail, FieldDraft, FieldSummary, FieldValidationError, FieldVertex,
    GeoPoint,
};
pub use self::field_service::FieldService;
pub use self::ids::{
    FertilizerId, FieldId, ImageId, InspectionId, InvalidId, MarkId, RecommendationId, UserId,
    ZoneId,
};
pub use self::inspection::{
    ALLOWED_IMAGE_EXTENSIONS, AnalysisOutcome, DateRange, Finding, HistoryBucket,
    HistoryGrouping, HistoryQuery, ImageMeta, ImageUpload, Inspection, InspectionDetail,
    InspectionFilter, InspectionHistory, InspectionImage, InspectionStatus, InspectionSummary,
    MAX_IMAGE_BYTES, MAX_IMAGES_PER_ROUND, NewInspection, NewInspectionImage, NewRecommendation,
    NutrientCount, Recommendation, RecommendationStatus, RecommendationUpdate,
    RecommendationUpdateError, Severity, StartedRound, TOP_NUTRIENTS, UnknownStatus,
    UploadedImage, image_extension, parse_day,
};
pub use self::inspection_service::{InspectionService, InspectionServicePorts};
pub use self::reference::{
    Fertilizer, NORMAL_LABEL, Nutrient, ReferenceCatalogue, is_normal_label, normalize_label,
};
pub use self::reference_service::ReferenceService;
pub use self::trace_id::TraceId;
pub use self::user::{
    DisplayName, PHONE_MIN, PhoneNumber, USERNAME_MIN, User, UserValidationError, Username,
};
pub use self::zone::{
    CreatedZone, MarkTally, TreeMark, TreeMarkDraft, TreeMarkInput, Zone, ZoneDraft,
    ZoneValidationError, resolve_tree_marks,
};
pub use self::zone_service::ZoneService;

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;

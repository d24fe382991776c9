//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driving ports (`*Command`, `*Query`, `LoginService`) are called by inbound
//! adapters. Driven ports (`*Repository`, `PasswordHasher`, `ImageStore`,
//! `DeficiencyDetector`) are implemented by outbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod deficiency_detector;
mod detection_query;
mod field_command;
mod field_query;
mod field_repository;
mod image_store;
mod inspection_command;
mod inspection_query;
mod inspection_repository;
mod login_service;
mod password_hasher;
mod reference_query;
mod reference_repository;
mod user_profile_query;
mod user_repository;
mod zone_command;
mod zone_query;
mod zone_repository;

#[cfg(test)]
pub use deficiency_detector::MockDeficiencyDetector;
pub use deficiency_detector::{
    DeficiencyDetector, DetectorError, FIXTURE_CONFIDENCE, FixtureDeficiencyDetector,
};
#[cfg(test)]
pub use detection_query::MockDetectionQuery;
pub use detection_query::DetectionQuery;
#[cfg(test)]
pub use field_command::MockFieldCommand;
pub use field_command::{FieldCommand, FixtureFieldCommand};
#[cfg(test)]
pub use field_query::MockFieldQuery;
pub use field_query::{FieldQuery, FixtureFieldQuery};
#[cfg(test)]
pub use field_repository::MockFieldRepository;
pub use field_repository::{FieldRepository, FieldRepositoryError};
#[cfg(test)]
pub use image_store::MockImageStore;
pub use image_store::{ImageStore, ImageStoreError};
#[cfg(test)]
pub use inspection_command::MockInspectionCommand;
pub use inspection_command::{
    FixtureInspectionCommand, InspectionCommand, RecommendationChange,
};
#[cfg(test)]
pub use inspection_query::MockInspectionQuery;
pub use inspection_query::{FixtureInspectionQuery, InspectionQuery};
#[cfg(test)]
pub use inspection_repository::MockInspectionRepository;
pub use inspection_repository::{InspectionRepository, InspectionRepositoryError};
#[cfg(test)]
pub use login_service::{MockLoginService, MockRegistrationService};
pub use login_service::{
    FixtureLoginService, FixtureRegistrationService, LoginService, RegistrationService,
    fixture_user, invalid_credentials,
};
#[cfg(test)]
pub use password_hasher::MockPasswordHasher;
pub use password_hasher::{PasswordHashError, PasswordHasher};
#[cfg(test)]
pub use reference_query::MockReferenceQuery;
pub use reference_query::ReferenceQuery;
#[cfg(test)]
pub use reference_repository::MockReferenceRepository;
pub use reference_repository::{
    FixtureReferenceRepository, ReferenceRepository, ReferenceRepositoryError,
};
#[cfg(test)]
pub use user_profile_query::MockUserProfileQuery;
pub use user_profile_query::{FixtureUserProfileQuery, UserProfileQuery};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{NewUserRecord, StoredUser, UserPersistenceError, UserRepository};
#[cfg(test)]
pub use zone_command::MockZoneCommand;
pub use zone_command::{FixtureZoneCommand, ZoneCommand};
#[cfg(test)]
pub use zone_query::MockZoneQuery;
pub use zone_query::{FixtureZoneQuery, ZoneQuery};
#[cfg(test)]
pub use zone_repository::MockZoneRepository;
pub use zone_repository::{ZoneRepository, ZoneRepositoryError};

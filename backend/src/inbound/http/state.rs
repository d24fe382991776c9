//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    DetectionQuery, FieldCommand, FieldQuery, FixtureFieldCommand, FixtureFieldQuery,
    FixtureInspectionCommand, FixtureInspectionQuery, FixtureLoginService,
    FixtureReferenceRepository, FixtureRegistrationService, FixtureUserProfileQuery,
    FixtureZoneCommand, FixtureZoneQuery, InspectionCommand, InspectionQuery, LoginService,
    ReferenceQuery, RegistrationService, UserProfileQuery, ZoneCommand, ZoneQuery,
};
use crate::domain::ReferenceService;

/// Parameter object bundling all port implementations for HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub login: Arc<dyn LoginService>,
    pub registration: Arc<dyn RegistrationService>,
    pub profile: Arc<dyn UserProfileQuery>,
    pub fields: Arc<dyn FieldCommand>,
    pub fields_query: Arc<dyn FieldQuery>,
    pub zones: Arc<dyn ZoneCommand>,
    pub zones_query: Arc<dyn ZoneQuery>,
    pub inspections: Arc<dyn InspectionCommand>,
    pub inspections_query: Arc<dyn InspectionQuery>,
    pub reference: Arc<dyn ReferenceQuery>,
    pub detection: Arc<dyn DetectionQuery>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub login: Arc<dyn LoginService>,
    pub registration: Arc<dyn RegistrationService>,
    pub profile: Arc<dyn UserProfileQuery>,
    pub fields: Arc<dyn FieldCommand>,
    pub fields_query: Arc<dyn FieldQuery>,
    pub zones: Arc<dyn ZoneCommand>,
    pub zones_query: Arc<dyn ZoneQuery>,
    pub inspections: Arc<dyn InspectionCommand>,
    pub inspections_query: Arc<dyn InspectionQuery>,
    pub reference: Arc<dyn ReferenceQuery>,
    pub detection: Arc<dyn DetectionQuery>,
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        Self::new(ports)
    }
}

impl HttpState {
    /// Construct state from a ports bundle.
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            login,
            registration,
            profile,
            fields,
            fields_query,
            zones,
            zones_query,
            inspections,
            inspections_query,
            reference,
            detection,
        } = ports;
        Self {
            login,
            registration,
            profile,
            fields,
            fields_query,
            zones,
            zones_query,
            inspections,
            inspections_query,
            reference,
            detection,
        }
    }
}

impl HttpStatePorts {
    /// Fixture ports for every use-case that needs a database, paired with
    /// the supplied detection port.
    ///
    /// # Examples
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use backend::domain::DetectionService;
    /// use backend::domain::ports::FixtureDeficiencyDetector;
    /// use backend::inbound::http::state::{HttpState, HttpStatePorts};
    /// use backend::outbound::storage::CapStdImageStore;
    ///
    /// let images = Arc::new(CapStdImageStore::open("uploads").expect("upload root"));
    /// let detection = DetectionService::new(images, Arc::new(FixtureDeficiencyDetector));
    /// let state = HttpState::new(HttpStatePorts::fixtures(Arc::new(detection)));
    /// let _login = state.login.clone();
    /// ```
    pub fn fixtures(detection: Arc<dyn DetectionQuery>) -> Self {
        Self {
            login: Arc::new(FixtureLoginService),
            registration: Arc::new(FixtureRegistrationService),
            profile: Arc::new(FixtureUserProfileQuery),
            fields: Arc::new(FixtureFieldCommand),
            fields_query: Arc::new(FixtureFieldQuery),
            zones: Arc::new(FixtureZoneCommand),
            zones_query: Arc::new(FixtureZoneQuery),
            inspections: Arc::new(FixtureInspectionCommand),
            inspections_query: Arc::new(FixtureInspectionQuery),
            reference: Arc::new(ReferenceService::new(Arc::new(FixtureReferenceRepository))),
            detection,
        }
    }
}

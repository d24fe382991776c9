//! Builders for HTTP state ports.
//!
//! With a database pool every port is served by a domain service over the
//! Diesel repositories; without one the fixture ports answer. Storage and
//! detection are wired in both modes.

use std::sync::Arc;

use actix_web::web;
use mockable::DefaultClock;
use tracing::warn;

use backend::domain::ports::{
    DeficiencyDetector, DetectionQuery, FixtureDeficiencyDetector, ImageStore,
};
use backend::domain::{
    AccountService, DetectionService, FieldService, InspectionService, InspectionServicePorts,
    ReferenceService, ZoneService,
};
use backend::inbound::http::state::{HttpState, HttpStatePorts};
use backend::outbound::detector::HttpDeficiencyDetector;
use backend::outbound::persistence::{
    DbPool, DieselFieldRepository, DieselInspectionRepository, DieselReferenceRepository,
    DieselUserRepository, DieselZoneRepository,
};
use backend::outbound::security::Argon2PasswordHasher;
use backend::outbound::storage::CapStdImageStore;

use super::ServerConfig;

/// Adapters shared by the fixture and database modes.
struct SharedAdapters {
    images: Arc<dyn ImageStore>,
    detector: Arc<dyn DeficiencyDetector>,
}

fn build_detector(config: &ServerConfig) -> std::io::Result<Arc<dyn DeficiencyDetector>> {
    match &config.detector {
        Some((url, timeout)) => {
            let detector = HttpDeficiencyDetector::new(url, *timeout)
                .map_err(|err| std::io::Error::other(format!("detector client: {err}")))?;
            Ok(Arc::new(detector))
        }
        None => {
            warn!("no detector url configured; using fixture predictions (dev only)");
            Ok(Arc::new(FixtureDeficiencyDetector))
        }
    }
}

fn build_shared(config: &ServerConfig) -> std::io::Result<SharedAdapters> {
    let images = CapStdImageStore::open(&config.upload_root).map_err(|err| {
        std::io::Error::other(format!(
            "open upload root {}: {err}",
            config.upload_root.display()
        ))
    })?;
    Ok(SharedAdapters {
        images: Arc::new(images),
        detector: build_detector(config)?,
    })
}

fn build_detection(shared: &SharedAdapters) -> Arc<dyn DetectionQuery> {
    Arc::new(DetectionService::new(
        shared.images.clone(),
        shared.detector.clone(),
    ))
}

fn build_persistent_ports(pool: &DbPool, shared: &SharedAdapters) -> HttpStatePorts {
    let users = Arc::new(DieselUserRepository::new(pool.clone()));
    let fields_repo = Arc::new(DieselFieldRepository::new(pool.clone()));
    let zones_repo = Arc::new(DieselZoneRepository::new(pool.clone()));
    let reference_repo = Arc::new(DieselReferenceRepository::new(pool.clone()));
    let inspections_repo = Arc::new(DieselInspectionRepository::new(pool.clone()));

    let accounts = Arc::new(AccountService::new(
        users,
        Arc::new(Argon2PasswordHasher::default()),
    ));
    let fields = Arc::new(FieldService::new(fields_repo.clone(), zones_repo.clone()));
    let zones = Arc::new(ZoneService::new(fields_repo.clone(), zones_repo.clone()));
    let reference = Arc::new(ReferenceService::new(reference_repo.clone()));
    let inspections = Arc::new(InspectionService::new(
        InspectionServicePorts {
            inspections: inspections_repo,
            fields: fields_repo,
            zones: zones_repo,
            reference: reference_repo,
            images: shared.images.clone(),
            detector: shared.detector.clone(),
        },
        Arc::new(DefaultClock),
    ));

    HttpStatePorts {
        login: accounts.clone(),
        registration: accounts.clone(),
        profile: accounts,
        fields: fields.clone(),
        fields_query: fields,
        zones: zones.clone(),
        zones_query: zones,
        inspections: inspections.clone(),
        inspections_query: inspections,
        reference,
        detection: build_detection(shared),
    }
}

/// Build the shared HTTP state for every worker.
///
/// # Errors
///
/// Returns [`std::io::Error`] when the upload root cannot be opened or the
/// detector client cannot be built.
pub(super) fn build_http_state(config: &ServerConfig) -> std::io::Result<web::Data<HttpState>> {
    let shared = build_shared(config)?;
    let ports = match &config.db_pool {
        Some(pool) => build_persistent_ports(pool, &shared),
        None => {
            warn!("no database configured; serving fixture data");
            HttpStatePorts::fixtures(build_detection(&shared))
        }
    };
    Ok(web::Data::new(HttpState::new(ports)))
}

//! Inspection round use-cases.
//!
//! Rounds belong to a zone and, through it, to the owner of the field. The
//! service enforces the round lifecycle (only pending rounds accept images
//! or close), the per-round image quota, and regenerates findings and
//! suggested recommendations from detector output.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use pagination::{PageRequest, Paginated};
use serde_json::json;
use tracing::{info, warn};

use super::field_service::{map_zone_error, owned_field};
use super::ownership::{Foreign, missing, owned};
use crate::domain::ports::{
    DeficiencyDetector, FieldRepository, ImageStore, ImageStoreError,
    InspectionCommand, InspectionQuery, InspectionRepository, InspectionRepositoryError,
    RecommendationChange, ReferenceRepository, ReferenceRepositoryError, ZoneRepository,
};
use crate::domain::{
    ALLOWED_IMAGE_EXTENSIONS, AnalysisOutcome, DEFAULT_CONFIDENCE, Error, Fertilizer, FieldId,
    Finding, HistoryQuery, ImageMeta, ImageUpload, Inspection, InspectionDetail,
    InspectionFilter, InspectionHistory, InspectionId, InspectionImage, InspectionStatus,
    InspectionSummary, MAX_IMAGE_BYTES, MAX_IMAGES_PER_ROUND, NewInspection,
    NewInspectionImage, NewRecommendation, Nutrient, Recommendation, RecommendationId,
    RecommendationUpdate, Severity, StartedRound, UploadedImage, UserId, ZoneId,
    image_extension, is_normal_label, normalize_label,
};

/// Note stored on findings produced by the detector.
const AUTO_FINDING_NOTE: &str = "auto-generated";

fn map_repository_error(error: InspectionRepositoryError) -> Error {
    match error {
        InspectionRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("inspection repository unavailable: {message}"))
        }
        InspectionRepositoryError::Query { message } => {
            Error::internal(format!("inspection repository error: {message}"))
        }
        InspectionRepositoryError::RoundTaken { message } => {
            Error::conflict(format!("inspection round was opened concurrently: {message}"))
        }
        InspectionRepositoryError::QuotaFull { existing } => quota_full(existing),
    }
}

fn quota_full(existing: i64) -> Error {
    Error::invalid_request("image quota reached for this round").with_details(json!({
        "code": "quota_full",
        "exist": existing,
        "max": MAX_IMAGES_PER_ROUND,
    }))
}

fn map_reference_error(error: ReferenceRepositoryError) -> Error {
    match error {
        ReferenceRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("reference repository unavailable: {message}"))
        }
        ReferenceRepositoryError::Query { message } => {
            Error::internal(format!("reference repository error: {message}"))
        }
    }
}

fn map_store_error(error: ImageStoreError) -> Error {
    match error {
        ImageStoreError::InvalidPath { path } => {
            Error::invalid_request(format!("path is outside the upload root: {path}"))
        }
        ImageStoreError::Io { message } => Error::internal(format!("image storage failed: {message}")),
    }
}

fn coded(error: Error, code: &str) -> Error {
    error.with_details(json!({ "code": code }))
}

/// Driven ports used by [`InspectionService`].
#[derive(Clone)]
pub struct InspectionServicePorts {
    /// Round persistence.
    pub inspections: Arc<dyn InspectionRepository>,
    /// Field lookups for ownership.
    pub fields: Arc<dyn FieldRepository>,
    /// Zone lookups for ownership.
    pub zones: Arc<dyn ZoneRepository>,
    /// Nutrient and fertilizer lookups for recommendations.
    pub reference: Arc<dyn ReferenceRepository>,
    /// Upload directory.
    pub images: Arc<dyn ImageStore>,
    /// Leaf classifier.
    pub detector: Arc<dyn DeficiencyDetector>,
}

/// Inspection service implementing the inspection driving ports.
#[derive(Clone)]
pub struct InspectionService {
    ports: InspectionServicePorts,
    clock: Arc<dyn Clock>,
}

impl InspectionService {
    /// Create a service over its driven ports and a clock.
    pub fn new(ports: InspectionServicePorts, clock: Arc<dyn Clock>) -> Self {
        Self { ports, clock }
    }

    async fn owned_inspection(&self, owner: UserId, id: InspectionId) -> Result<Inspection, Error> {
        let found = self
            .ports
            .inspections
            .find(id)
            .await
            .map_err(map_repository_error)?;
        owned(found, |i| i.owner_id, owner, "inspection", id, Foreign::Forbid)
    }

    async fn detect_round(
        &self,
        images: &[InspectionImage],
    ) -> Result<(Vec<Finding>, Vec<String>), Error> {
        let mut findings = Vec::new();
        let mut warnings = Vec::new();
        for image in images {
            let path = match self.ports.images.resolve(&image.image_path) {
                Ok(path) => path,
                Err(err) => {
                    warn!(image_id = %image.id, error = %err, "stored image path rejected");
                    warnings.push(format!("image {}: {err}", image.id));
                    continue;
                }
            };
            let detections = match self
                .ports
                .detector
                .detect(std::slice::from_ref(&path), DEFAULT_CONFIDENCE)
                .await
            {
                Ok(detections) => detections,
                Err(err) => {
                    warn!(image_id = %image.id, error = %err, "detector failed on image");
                    warnings.push(format!("image {}: {err}", image.id));
                    continue;
                }
            };
            let best = detections.iter().filter_map(|d| d.best()).max_by(|a, b| {
                a.confidence.total_cmp(&b.confidence)
            });
            let Some(prediction) = best else {
                continue;
            };
            if is_normal_label(&prediction.class) {
                continue;
            }
            findings.push(Finding {
                image_id: Some(image.id),
                tree_no: None,
                nutrient_code: normalize_label(&prediction.class),
                severity: Severity::from_confidence(prediction.confidence),
                confidence: (prediction.confidence * 10_000.0).round() / 100.0,
                notes: Some(AUTO_FINDING_NOTE.to_owned()),
            });
        }
        Ok((findings, warnings))
    }

    async fn suggest(&self, findings: &[Finding]) -> Result<Vec<NewRecommendation>, Error> {
        if findings.is_empty() {
            return Ok(Vec::new());
        }
        let nutrients: HashMap<String, Nutrient> = self
            .ports
            .reference
            .nutrients()
            .await
            .map_err(map_reference_error)?
            .into_iter()
            .map(|n| (n.code.clone(), n))
            .collect();
        let fertilizers: HashMap<_, Fertilizer> = self
            .ports
            .reference
            .fertilizers()
            .await
            .map_err(map_reference_error)?
            .into_iter()
            .map(|f| (f.id, f))
            .collect();

        let mut seen = Vec::<&str>::new();
        let mut recommendations = Vec::new();
        for finding in findings {
            let code = finding.nutrient_code.as_str();
            if seen.contains(&code) {
                continue;
            }
            seen.push(code);
            let nutrient = nutrients.get(code);
            let fertilizer = nutrient
                .and_then(|n| n.fertilizer_id)
                .and_then(|id| fertilizers.get(&id));
            recommendations.push(recommendation_for(code, nutrient, fertilizer));
        }
        Ok(recommendations)
    }
}

fn recommendation_for(
    code: &str,
    nutrient: Option<&Nutrient>,
    fertilizer: Option<&Fertilizer>,
) -> NewRecommendation {
    let subject = nutrient.map_or(code, |n| n.name.as_str());
    let text = match fertilizer {
        Some(fertilizer) => match fertilizer.formulation.as_deref() {
            Some(formulation) => format!(
                "Apply {} ({formulation}) to correct {subject} deficiency",
                fertilizer.name
            ),
            None => format!("Apply {} to correct {subject} deficiency", fertilizer.name),
        },
        None => format!("Review {subject} deficiency and choose a suitable fertilizer"),
    };
    NewRecommendation {
        fertilizer_id: fertilizer.map(|f| f.id),
        nutrient_code: code.to_owned(),
        text,
    }
}

#[async_trait]
impl InspectionCommand for InspectionService {
    async fn start_round(
        &self,
        owner: UserId,
        field_id: FieldId,
        zone_id: ZoneId,
        notes: Option<String>,
    ) -> Result<StartedRound, Error> {
        owned_field(self.ports.fields.as_ref(), owner, field_id, Foreign::Forbid).await?;
        let zone = self
            .ports
            .zones
            .find(zone_id)
            .await
            .map_err(map_zone_error)?
            .filter(|zone| zone.field_id == field_id)
            .ok_or_else(|| missing("zone", zone_id))?;

        if let Some(inspection) = self
            .ports
            .inspections
            .find_pending(zone.id)
            .await
            .map_err(map_repository_error)?
        {
            return Ok(StartedRound {
                inspection,
                idempotent: true,
            });
        }

        let round_no = self
            .ports
            .inspections
            .next_round_no(zone.id)
            .await
            .map_err(map_repository_error)?;
        let round = NewInspection {
            field_id,
            zone_id: zone.id,
            round_no,
            notes: notes
                .map(|n| n.trim().to_owned())
                .filter(|n| !n.is_empty()),
            inspected_at: self.clock.utc(),
        };
        let inspection = self
            .ports
            .inspections
            .create(&round)
            .await
            .map_err(map_repository_error)?;
        info!(inspection_id = %inspection.id, zone_id = %zone.id, round_no, "inspection round opened");
        Ok(StartedRound {
            inspection,
            idempotent: false,
        })
    }

    async fn upload_image(
        &self,
        owner: UserId,
        id: InspectionId,
        upload: ImageUpload,
    ) -> Result<UploadedImage, Error> {
        let inspection = self.owned_inspection(owner, id).await?;
        if inspection.status != InspectionStatus::Pending {
            return Err(coded(
                Error::invalid_request("inspection round is closed"),
                "closed_round",
            ));
        }
        let existing = self
            .ports
            .inspections
            .image_count(id)
            .await
            .map_err(map_repository_error)?;
        if existing >= MAX_IMAGES_PER_ROUND {
            return Err(quota_full(existing));
        }
        let Some(ext) = image_extension(&upload.filename) else {
            return Err(Error::unsupported_media_type("unsupported image type").with_details(
                json!({ "code": "bad_extension", "allowed": ALLOWED_IMAGE_EXTENSIONS }),
            ));
        };
        if upload.bytes.is_empty() {
            return Err(coded(Error::invalid_request("image is empty"), "empty_file"));
        }
        if upload.bytes.len() > MAX_IMAGE_BYTES {
            return Err(Error::payload_too_large("image exceeds the size limit")
                .with_details(json!({ "code": "file_too_large", "maxBytes": MAX_IMAGE_BYTES })));
        }

        let now = self.clock.utc();
        let saved_at_utc = now.format("%Y%m%d%H%M%S%6f").to_string();
        let saved_name = format!("{id}_{saved_at_utc}.{ext}");
        let relative = format!("inspections/{id}/{saved_name}");
        self.ports
            .images
            .save(&relative, &upload.bytes)
            .await
            .map_err(map_store_error)?;

        let new_image = NewInspectionImage {
            image_path: relative,
            captured_at: now,
            meta: ImageMeta {
                original_name: upload.filename,
                saved_name,
                saved_at_utc,
            },
        };
        let image = match self
            .ports
            .inspections
            .add_image(id, &new_image, MAX_IMAGES_PER_ROUND)
            .await
        {
            Ok(image) => image,
            Err(err) => {
                if let Err(cleanup) = self.ports.images.remove(&new_image.image_path).await {
                    warn!(
                        path = %new_image.image_path,
                        error = %cleanup,
                        "failed to remove unrecorded image"
                    );
                }
                return Err(map_repository_error(err));
            }
        };
        Ok(UploadedImage {
            image,
            quota_remain: (MAX_IMAGES_PER_ROUND - existing - 1).max(0),
        })
    }

    async fn analyze(&self, owner: UserId, id: InspectionId) -> Result<AnalysisOutcome, Error> {
        self.owned_inspection(owner, id).await?;
        let images = self
            .ports
            .inspections
            .images(id)
            .await
            .map_err(map_repository_error)?;
        if images.is_empty() {
            return Err(coded(
                Error::invalid_request("no images uploaded for this round"),
                "no_images",
            ));
        }

        let (findings, warnings) = self.detect_round(&images).await?;
        let recommendations = self.suggest(&findings).await?;
        self.ports
            .inspections
            .replace_analysis(id, &findings, &recommendations)
            .await
            .map_err(map_repository_error)?;
        info!(
            inspection_id = %id,
            findings = findings.len(),
            recommendations = recommendations.len(),
            "inspection analysed"
        );
        Ok(AnalysisOutcome {
            findings,
            recommendations: recommendations.len(),
            warnings,
        })
    }

    async fn set_status(
        &self,
        owner: UserId,
        id: InspectionId,
        status: InspectionStatus,
    ) -> Result<Inspection, Error> {
        if status == InspectionStatus::Pending {
            return Err(coded(
                Error::invalid_request("status must be completed or cancelled"),
                "bad_status",
            ));
        }
        let inspection = self.owned_inspection(owner, id).await?;
        if inspection.status != InspectionStatus::Pending {
            return Err(Error::conflict(format!(
                "inspection {id} is already {}",
                inspection.status.as_str()
            )));
        }
        self.ports
            .inspections
            .set_status(id, status)
            .await
            .map_err(map_repository_error)
    }

    async fn update_recommendation(
        &self,
        owner: UserId,
        id: RecommendationId,
        change: RecommendationChange,
    ) -> Result<(), Error> {
        let update = RecommendationUpdate::try_new(
            &change.status,
            change.applied_date.as_deref(),
            self.clock.utc().date_naive(),
        )
        .map_err(|err| coded(Error::invalid_request(err.to_string()), err.code()))?;

        let found = self
            .ports
            .inspections
            .recommendation_owner(id)
            .await
            .map_err(map_repository_error)?;
        owned(found, |o| *o, owner, "recommendation", id, Foreign::Forbid)?;
        self.ports
            .inspections
            .update_recommendation(id, update)
            .await
            .map_err(map_repository_error)
    }
}

#[async_trait]
impl InspectionQuery for InspectionService {
    async fn get_inspection(
        &self,
        owner: UserId,
        id: InspectionId,
    ) -> Result<InspectionDetail, Error> {
        let found = self
            .ports
            .inspections
            .detail(id)
            .await
            .map_err(map_repository_error)?;
        let mut detail = owned(
            found,
            |d| d.inspection.owner_id,
            owner,
            "inspection",
            id,
            Foreign::Forbid,
        )?;
        detail.warnings = InspectionDetail::derive_warnings(
            detail.images.len(),
            detail.findings.len(),
            detail.inspection.status,
        );
        Ok(detail)
    }

    async fn list_recommendations(
        &self,
        owner: UserId,
        id: InspectionId,
    ) -> Result<Vec<Recommendation>, Error> {
        self.owned_inspection(owner, id).await?;
        self.ports
            .inspections
            .recommendations(id)
            .await
            .map_err(map_repository_error)
    }

    async fn history(
        &self,
        owner: UserId,
        query: HistoryQuery,
    ) -> Result<InspectionHistory, Error> {
        self.ports
            .inspections
            .history(owner, &query)
            .await
            .map_err(map_repository_error)
    }

    async fn list_inspections(
        &self,
        owner: UserId,
        filter: InspectionFilter,
        page: PageRequest,
    ) -> Result<Paginated<InspectionSummary>, Error> {
        self.ports
            .inspections
            .list(owner, &filter, page)
            .await
            .map_err(map_repository_error)
    }
}

#[cfg(test)]
#[path = "inspection_service_tests.rs"]
mod tests;

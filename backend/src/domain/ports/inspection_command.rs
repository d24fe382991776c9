//! Driving port for inspection round mutations.

use async_trait::async_trait;

use crate::domain::{
    AnalysisOutcome, Error, FieldId, ImageUpload, Inspection, InspectionId, InspectionStatus,
    RecommendationId, StartedRound, UploadedImage, UserId, ZoneId,
};

/// Requested change to a recommendation, as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationChange {
    /// `suggested`, `applied` or `skipped`.
    pub status: String,
    /// Optional `YYYY-MM-DD` day.
    pub applied_date: Option<String>,
}

/// Port for inspection writes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InspectionCommand: Send + Sync {
    /// Open a round for a zone, or return its pending one.
    async fn start_round(
        &self,
        owner: UserId,
        field_id: FieldId,
        zone_id: ZoneId,
        notes: Option<String>,
    ) -> Result<StartedRound, Error>;

    /// Store one image for a pending round.
    async fn upload_image(
        &self,
        owner: UserId,
        id: InspectionId,
        upload: ImageUpload,
    ) -> Result<UploadedImage, Error>;

    /// Run the detector over the round's images and regenerate findings and
    /// suggested recommendations.
    async fn analyze(&self, owner: UserId, id: InspectionId) -> Result<AnalysisOutcome, Error>;

    /// Close a pending round as completed or cancelled.
    async fn set_status(
        &self,
        owner: UserId,
        id: InspectionId,
        status: InspectionStatus,
    ) -> Result<Inspection, Error>;

    /// Update the status of a recommendation.
    async fn update_recommendation(
        &self,
        owner: UserId,
        id: RecommendationId,
        change: RecommendationChange,
    ) -> Result<(), Error>;
}

/// Inspection command used when no database is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureInspectionCommand;

fn persistence_required() -> Error {
    Error::service_unavailable("inspections require a configured database")
}

#[async_trait]
impl InspectionCommand for FixtureInspectionCommand {
    async fn start_round(
        &self,
        _owner: UserId,
        _field_id: FieldId,
        _zone_id: ZoneId,
        _notes: Option<String>,
    ) -> Result<StartedRound, Error> {
        Err(persistence_required())
    }

    async fn upload_image(
        &self,
        _owner: UserId,
        _id: InspectionId,
        _upload: ImageUpload,
    ) -> Result<UploadedImage, Error> {
        Err(persistence_required())
    }

    async fn analyze(&self, _owner: UserId, _id: InspectionId) -> Result<AnalysisOutcome, Error> {
        Err(persistence_required())
    }

    async fn set_status(
        &self,
        _owner: UserId,
        _id: InspectionId,
        _status: InspectionStatus,
    ) -> Result<Inspection, Error> {
        Err(persistence_required())
    }

    async fn update_recommendation(
        &self,
        _owner: UserId,
        _id: RecommendationId,
        _change: RecommendationChange,
    ) -> Result<(), Error> {
        Err(persistence_required())
    }
}

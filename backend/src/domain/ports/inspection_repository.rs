//! Driven port for inspection rounds and their images, findings and
//! recommendations.

use async_trait::async_trait;
use pagination::{PageRequest, Paginated};

use crate::domain::{
    Finding, HistoryQuery, Inspection, InspectionDetail, InspectionFilter, InspectionHistory,
    InspectionId, InspectionImage, InspectionStatus, InspectionSummary, NewInspection,
    NewInspectionImage, NewRecommendation, Recommendation, RecommendationId,
    RecommendationUpdate, UserId, ZoneId,
};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by inspection repository adapters.
    pub enum InspectionRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "inspection repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "inspection repository query failed: {message}",
        /// A concurrent writer claimed the same round number.
        RoundTaken { message: String } => "inspection round already exists: {message}",
        /// The round already holds the maximum number of images.
        QuotaFull { existing: i64 } => "inspection round already holds {existing} images",
    }
}

/// Port for inspection persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InspectionRepository: Send + Sync {
    /// Pending round of a zone, if one exists.
    async fn find_pending(
        &self,
        zone_id: ZoneId,
    ) -> Result<Option<Inspection>, InspectionRepositoryError>;

    /// Next free round number of a zone (highest plus one).
    async fn next_round_no(&self, zone_id: ZoneId) -> Result<i32, InspectionRepositoryError>;

    /// Insert a pending round.
    async fn create(&self, round: &NewInspection) -> Result<Inspection, InspectionRepositoryError>;

    /// Fetch a round by identifier, whoever owns it.
    async fn find(&self, id: InspectionId)
    -> Result<Option<Inspection>, InspectionRepositoryError>;

    /// Round with names, images and findings. Warnings are left empty.
    async fn detail(
        &self,
        id: InspectionId,
    ) -> Result<Option<InspectionDetail>, InspectionRepositoryError>;

    /// Images of a round ordered by id.
    async fn images(
        &self,
        id: InspectionId,
    ) -> Result<Vec<InspectionImage>, InspectionRepositoryError>;

    /// Number of images stored for a round.
    async fn image_count(&self, id: InspectionId) -> Result<i64, InspectionRepositoryError>;

    /// Record an uploaded image unless the round already holds `max_images`.
    ///
    /// The count and the insert happen under a lock on the round, so two
    /// concurrent uploads cannot both take the last slot.
    async fn add_image(
        &self,
        id: InspectionId,
        image: &NewInspectionImage,
        max_images: i64,
    ) -> Result<InspectionImage, InspectionRepositoryError>;

    /// Replace the findings and the suggested recommendations of a round in
    /// one transaction. Applied or skipped recommendations are kept.
    async fn replace_analysis(
        &self,
        id: InspectionId,
        findings: &[Finding],
        recommendations: &[NewRecommendation],
    ) -> Result<(), InspectionRepositoryError>;

    /// Change the status of a round.
    async fn set_status(
        &self,
        id: InspectionId,
        status: InspectionStatus,
    ) -> Result<Inspection, InspectionRepositoryError>;

    /// Recommendations of a round ordered by id, with reference names.
    async fn recommendations(
        &self,
        id: InspectionId,
    ) -> Result<Vec<Recommendation>, InspectionRepositoryError>;

    /// Owner of the field a recommendation belongs to.
    async fn recommendation_owner(
        &self,
        id: RecommendationId,
    ) -> Result<Option<UserId>, InspectionRepositoryError>;

    /// Store a recommendation status change.
    async fn update_recommendation(
        &self,
        id: RecommendationId,
        update: RecommendationUpdate,
    ) -> Result<(), InspectionRepositoryError>;

    /// Bucketed counts and top nutrients for an owner's rounds.
    async fn history(
        &self,
        owner: UserId,
        query: &HistoryQuery,
    ) -> Result<InspectionHistory, InspectionRepositoryError>;

    /// One page of an owner's rounds, newest first.
    async fn list(
        &self,
        owner: UserId,
        filter: &InspectionFilter,
        page: PageRequest,
    ) -> Result<Paginated<InspectionSummary>, InspectionRepositoryError>;
}

//! Driving port for inspection reads.

use async_trait::async_trait;
use pagination::{PageRequest, Paginated};

use crate::domain::{
    Error, HistoryQuery, InspectionDetail, InspectionFilter, InspectionHistory, InspectionId,
    InspectionSummary, Recommendation, UserId,
};

/// Port for inspection reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InspectionQuery: Send + Sync {
    /// Round with images, findings and advisory warnings.
    async fn get_inspection(&self, owner: UserId, id: InspectionId)
    -> Result<InspectionDetail, Error>;

    /// Recommendations of a round.
    async fn list_recommendations(
        &self,
        owner: UserId,
        id: InspectionId,
    ) -> Result<Vec<Recommendation>, Error>;

    /// Bucketed inspection history.
    async fn history(&self, owner: UserId, query: HistoryQuery)
    -> Result<InspectionHistory, Error>;

    /// Paged round list.
    async fn list_inspections(
        &self,
        owner: UserId,
        filter: InspectionFilter,
        page: PageRequest,
    ) -> Result<Paginated<InspectionSummary>, Error>;
}

/// Inspection query serving a farm without rounds.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureInspectionQuery;

#[async_trait]
impl InspectionQuery for FixtureInspectionQuery {
    async fn get_inspection(
        &self,
        _owner: UserId,
        id: InspectionId,
    ) -> Result<InspectionDetail, Error> {
        Err(Error::not_found(format!("inspection {id} not found")))
    }

    async fn list_recommendations(
        &self,
        _owner: UserId,
        id: InspectionId,
    ) -> Result<Vec<Recommendation>, Error> {
        Err(Error::not_found(format!("inspection {id} not found")))
    }

    async fn history(
        &self,
        _owner: UserId,
        query: HistoryQuery,
    ) -> Result<InspectionHistory, Error> {
        Ok(InspectionHistory {
            group: query.group,
            buckets: Vec::new(),
            top_nutrients: Vec::new(),
        })
    }

    async fn list_inspections(
        &self,
        _owner: UserId,
        _filter: InspectionFilter,
        page: PageRequest,
    ) -> Result<Paginated<InspectionSummary>, Error> {
        Ok(Paginated::new(Vec::new(), page, 0))
    }
}

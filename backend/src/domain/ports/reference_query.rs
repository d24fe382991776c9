//! Driving port for reference data reads.

use async_trait::async_trait;

use crate::domain::{Error, Fertilizer, Nutrient, ReferenceCatalogue};

/// Port for nutrient and fertilizer lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReferenceQuery: Send + Sync {
    /// Nutrient deficiencies ordered by code, names normalised.
    async fn nutrients(&self) -> Result<Vec<Nutrient>, Error>;

    /// Fertilizers ordered by id, names normalised.
    async fn fertilizers(&self) -> Result<Vec<Fertilizer>, Error>;

    /// Both lists in one call.
    async fn catalogue(&self) -> Result<ReferenceCatalogue, Error>;
}

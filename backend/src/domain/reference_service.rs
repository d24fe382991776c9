//! Reference data use-cases.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ports::{ReferenceQuery, ReferenceRepository, ReferenceRepositoryError};
use crate::domain::{Error, Fertilizer, Nutrient, ReferenceCatalogue, normalize_label};

fn map_repository_error(error: ReferenceRepositoryError) -> Error {
    match error {
        ReferenceRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("reference repository unavailable: {message}"))
        }
        ReferenceRepositoryError::Query { message } => {
            Error::internal(format!("reference repository error: {message}"))
        }
    }
}

/// Reference service normalising labels read from the repository.
#[derive(Clone)]
pub struct ReferenceService<R> {
    repo: Arc<R>,
}

impl<R> ReferenceService<R> {
    /// Create a service over a reference repository.
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl<R> ReferenceQuery for ReferenceService<R>
where
    R: ReferenceRepository,
{
    async fn nutrients(&self) -> Result<Vec<Nutrient>, Error> {
        let mut nutrients = self.repo.nutrients().await.map_err(map_repository_error)?;
        for nutrient in &mut nutrients {
            nutrient.name = normalize_label(&nutrient.name);
        }
        Ok(nutrients)
    }

    async fn fertilizers(&self) -> Result<Vec<Fertilizer>, Error> {
        let mut fertilizers = self.repo.fertilizers().await.map_err(map_repository_error)?;
        for fertilizer in &mut fertilizers {
            fertilizer.name = normalize_label(&fertilizer.name);
        }
        Ok(fertilizers)
    }

    async fn catalogue(&self) -> Result<ReferenceCatalogue, Error> {
        Ok(ReferenceCatalogue {
            nutrients: self.nutrients().await?,
            fertilizers: self.fertilizers().await?,
        })
    }
}

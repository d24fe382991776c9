//! Driven port for nutrient and fertilizer reference data.

use async_trait::async_trait;

use crate::domain::{Fertilizer, FertilizerId, Nutrient};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by reference data adapters.
    pub enum ReferenceRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "reference repository connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } => "reference repository query failed: {message}",
    }
}

/// Port for reading reference tables.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReferenceRepository: Send + Sync {
    /// Nutrient deficiencies ordered by code.
    async fn nutrients(&self) -> Result<Vec<Nutrient>, ReferenceRepositoryError>;

    /// Fertilizers ordered by id.
    async fn fertilizers(&self) -> Result<Vec<Fertilizer>, ReferenceRepositoryError>;
}

/// In-memory copy of the rows seeded by the initial migration.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureReferenceRepository;

const SEED_FERTILIZERS: [(i32, &str, &str, &str); 4] = [
    (1, "Urea", "46-0-0", "Fast-acting nitrogen source"),
    (2, "Triple superphosphate", "0-46-0", "Phosphorus for root and flower development"),
    (3, "Muriate of potash", "0-0-60", "Potassium for pod filling"),
    (4, "Magnesium sulphate", "MgSO4", "Corrects interveinal chlorosis"),
];

const SEED_NUTRIENTS: [(&str, &str, &str, &str, i32); 4] = [
    ("K", "Potassium", "Leaf margins scorch and curl", "Check older leaves first", 3),
    ("Mg", "Magnesium", "Yellowing between veins of older leaves", "Common on acid soils", 4),
    ("N", "Nitrogen", "Uniform pale green to yellow leaves", "Starts on older leaves", 1),
    ("P", "Phosphorus", "Small dark leaves, poor flowering", "Slow growth overall", 2),
];

#[async_trait]
impl ReferenceRepository for FixtureReferenceRepository {
    async fn nutrients(&self) -> Result<Vec<Nutrient>, ReferenceRepositoryError> {
        Ok(SEED_NUTRIENTS
            .iter()
            .map(|&(code, name, symptoms, notes, fertilizer)| Nutrient {
                code: code.to_owned(),
                name: name.to_owned(),
                symptoms: Some(symptoms.to_owned()),
                notes: Some(notes.to_owned()),
                fertilizer_id: FertilizerId::new(fertilizer).ok(),
            })
            .collect())
    }

    async fn fertilizers(&self) -> Result<Vec<Fertilizer>, ReferenceRepositoryError> {
        SEED_FERTILIZERS
            .iter()
            .map(|&(raw_id, name, formulation, description)| {
                let id = FertilizerId::new(raw_id)
                    .map_err(|err| ReferenceRepositoryError::query(err.to_string()))?;
                Ok(Fertilizer {
                    id,
                    name: name.to_owned(),
                    formulation: Some(formulation.to_owned()),
                    description: Some(description.to_owned()),
                })
            })
            .collect()
    }
}

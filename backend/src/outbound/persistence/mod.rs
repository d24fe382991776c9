//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Repositories are thin translators between Diesel rows (`models.rs`) and
//! domain records. Rows and `schema.rs` never leave this module. Connections
//! come from a `bb8` pool through `diesel-async`.
//!
//! ```ignore
//! use backend::outbound::persistence::{DbPool, DieselFieldRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/cocoa")).await?;
//! let fields = DieselFieldRepository::new(pool);
//! ```

mod diesel_field_repository;
mod diesel_helpers;
mod diesel_inspection_repository;
mod diesel_reference_repository;
mod diesel_user_repository;
mod diesel_zone_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_field_repository::DieselFieldRepository;
pub use diesel_inspection_repository::DieselInspectionRepository;
pub use diesel_reference_repository::DieselReferenceRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use diesel_zone_repository::DieselZoneRepository;
pub use migrations::{MigrationError, apply_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};

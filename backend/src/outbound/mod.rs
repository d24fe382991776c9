//! Outbound adapters implementing the driven ports.
//!
//! - **persistence**: PostgreSQL repositories using Diesel
//! - **storage**: the upload directory, via `cap-std`
//! - **detector**: HTTP client for the inference service
//! - **security**: Argon2 password hashing
//!
//! Adapters translate between domain types and infrastructure
//! representations. They hold no business rules.

pub mod detector;
pub mod persistence;
pub mod security;
pub mod storage;

//! HTTP inbound adapter exposing REST endpoints.

pub mod auth;
pub mod detect;
pub mod error;
pub mod fields;
pub mod health;
pub mod inspections;
pub mod reference;
pub mod responses;
pub mod schemas;
pub mod session;
pub mod session_config;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod users;
pub mod validation;
pub mod zones;

pub use error::ApiResult;

//! Request middleware.
//!
//! Purpose: Define middleware components for request lifecycle concerns:
//! trace identifiers and cross-origin access for browser clients.

pub mod cors;
pub mod trace;

pub use cors::Cors;
pub use trace::Trace;

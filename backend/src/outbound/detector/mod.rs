//! Deficiency detector adapters.

mod dto;
mod http_detector;

pub use http_detector::HttpDeficiencyDetector;

//! Use cases

pub mod analysis_service;

pub use analysis_service::{fuse_with_volume, AnalysisService};

//! Domain services

pub mod calorie_calculator;
pub mod capture_quality;
pub mod fusion;

pub use calorie_calculator::{calories_from_geometry, geometry_estimate, MIN_GEOMETRY_SIGMA_KCAL};
pub use capture_quality::{CapturePhase, CaptureQualityEstimator};
pub use fusion::{fuse, AnalyzerEstimate, ANALYZER_WEIGHT, GEOMETRY_WEIGHT};

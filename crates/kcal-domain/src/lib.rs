//! Domain layer - calorie fusion, capture quality gating, capability traits
//!
//! Everything here is pure or trait-only; network and filesystem adapters
//! live in `kcal-infra`.

pub mod capture;
pub mod model;
pub mod repository;
pub mod service;

pub use capture::{FrameCaptureService, MockCaptureService};
pub use model::{
    CaptureQualityParameters, CaptureQualitySample, CaptureQualityStatus, CapturedFrame,
    TrackingState,
};
pub use repository::ImageRepository;
pub use service::{
    calories_from_geometry, fuse, geometry_estimate, AnalyzerEstimate, CapturePhase,
    CaptureQualityEstimator,
};

//! Domain model types

pub mod capture;

pub use capture::{
    CaptureQualityParameters, CaptureQualitySample, CaptureQualityStatus, CapturedFrame,
    TrackingState,
};

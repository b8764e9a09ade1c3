//! Capture session model: frames, tracking samples, gating parameters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Still frame handed over by a capture service
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Encoded image bytes (JPEG, PNG, ...)
    pub rgb_image: Vec<u8>,
    pub mime_type: String,
}

impl CapturedFrame {
    pub fn new(rgb_image: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            rgb_image,
            mime_type: mime_type.into(),
        }
    }
}

/// Camera tracking state reported by the AR layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackingState {
    NotAvailable,
    Limited,
    Normal,
}

impl TrackingState {
    /// Quality contribution in [0, 1]
    pub fn quality_score(&self) -> f64 {
        match self {
            TrackingState::Normal => 1.0,
            TrackingState::Limited => 0.6,
            TrackingState::NotAvailable => 0.0,
        }
    }

    /// Stable frames count toward the minimum-stable-frames gate
    pub fn is_stable(&self) -> bool {
        *self == TrackingState::Normal
    }
}

/// One per-frame tracking observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureQualitySample {
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Parallax travelled since capture start (metres)
    pub parallax: f64,
    pub tracking_state: TrackingState,
    /// Fraction of pixels with reliable depth
    pub depth_coverage: f64,
}

impl CaptureQualitySample {
    pub fn new(parallax: f64, tracking_state: TrackingState, depth_coverage: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            parallax,
            tracking_state,
            depth_coverage,
        }
    }
}

/// Gating decision for the latest sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureQualityStatus {
    /// Weighted quality score
    pub score: f64,
    /// Score relative to the stop threshold, capped at 1
    pub progress: f64,
    pub should_stop: bool,
    pub meets_parallax: bool,
    pub meets_depth: bool,
    pub meets_tracking: bool,
}

/// Targets and weights for capture quality gating.
///
/// Values are clamped on construction and on deserialization:
/// weights >= 0, parallax target >= 0.01, depth coverage target in
/// [0.01, 1], stop threshold in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "RawCaptureQualityParameters")]
pub struct CaptureQualityParameters {
    pub parallax_target: f64,
    pub depth_coverage_target: f64,
    pub parallax_weight: f64,
    pub depth_weight: f64,
    pub tracking_weight: f64,
    pub minimum_stable_frames: usize,
    pub stop_threshold: f64,
}

impl CaptureQualityParameters {
    pub fn new(
        parallax_target: f64,
        depth_coverage_target: f64,
        parallax_weight: f64,
        depth_weight: f64,
        tracking_weight: f64,
        minimum_stable_frames: i64,
        stop_threshold: f64,
    ) -> Self {
        Self {
            parallax_target: parallax_target.max(0.01),
            depth_coverage_target: depth_coverage_target.clamp(0.01, 1.0),
            parallax_weight: parallax_weight.max(0.0),
            depth_weight: depth_weight.max(0.0),
            tracking_weight: tracking_weight.max(0.0),
            minimum_stable_frames: minimum_stable_frames.max(0) as usize,
            stop_threshold: stop_threshold.clamp(0.0, 1.0),
        }
    }

    /// Looser preset used while tuning on development devices
    pub fn development() -> Self {
        Self::new(0.28, 0.65, 0.4, 0.35, 0.25, 3, 0.82)
    }
}

impl Default for CaptureQualityParameters {
    fn default() -> Self {
        Self::new(0.25, 0.60, 0.4, 0.35, 0.25, 3, 0.8)
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct RawCaptureQualityParameters {
    parallax_target: f64,
    depth_coverage_target: f64,
    parallax_weight: f64,
    depth_weight: f64,
    tracking_weight: f64,
    minimum_stable_frames: i64,
    stop_threshold: f64,
}

impl Default for RawCaptureQualityParameters {
    fn default() -> Self {
        let d = CaptureQualityParameters::default();
        Self {
            parallax_target: d.parallax_target,
            depth_coverage_target: d.depth_coverage_target,
            parallax_weight: d.parallax_weight,
            depth_weight: d.depth_weight,
            tracking_weight: d.tracking_weight,
            minimum_stable_frames: d.minimum_stable_frames as i64,
            stop_threshold: d.stop_threshold,
        }
    }
}

impl From<RawCaptureQualityParameters> for CaptureQualityParameters {
    fn from(raw: RawCaptureQualityParameters) -> Self {
        Self::new(
            raw.parallax_target,
            raw.depth_coverage_target,
            raw.parallax_weight,
            raw.depth_weight,
            raw.tracking_weight,
            raw.minimum_stable_frames,
            raw.stop_threshold,
        )
    }
}

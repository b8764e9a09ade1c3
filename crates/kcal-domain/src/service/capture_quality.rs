//! Capture quality gating for one capture session
//!
//! Single owner per session; no internal locking.

use crate::model::{CaptureQualityParameters, CaptureQualitySample, CaptureQualityStatus};

/// Per-component score a sample must reach before capture may stop
const COMPONENT_PASS_SCORE: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Idle,
    Accumulating,
    ReadyToStop,
}

#[derive(Debug, Clone)]
pub struct CaptureQualityEstimator {
    parameters: CaptureQualityParameters,
    samples: Vec<CaptureQualitySample>,
    ready: bool,
}

impl CaptureQualityEstimator {
    pub fn new(parameters: CaptureQualityParameters) -> Self {
        Self {
            parameters,
            samples: Vec::new(),
            ready: false,
        }
    }

    pub fn parameters(&self) -> &CaptureQualityParameters {
        &self.parameters
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn phase(&self) -> CapturePhase {
        if self.samples.is_empty() {
            CapturePhase::Idle
        } else if self.ready {
            CapturePhase::ReadyToStop
        } else {
            CapturePhase::Accumulating
        }
    }

    /// Drop all samples and return to idle
    pub fn reset(&mut self) {
        self.samples.clear();
        self.ready = false;
    }

    pub fn evaluate(&mut self, sample: CaptureQualitySample) -> CaptureQualityStatus {
        let p = &self.parameters;

        let parallax_score = (sample.parallax / p.parallax_target).min(1.0);
        let depth_score = (sample.depth_coverage / p.depth_coverage_target).min(1.0);
        let tracking_score = sample.tracking_state.quality_score();

        self.samples.push(sample);

        let stable_frames = self
            .samples
            .iter()
            .filter(|s| s.tracking_state.is_stable())
            .count();
        let meets_tracking = stable_frames >= p.minimum_stable_frames;

        let score = parallax_score * p.parallax_weight
            + depth_score * p.depth_weight
            + tracking_score * p.tracking_weight;

        let progress = if p.stop_threshold > 0.0 {
            (score / p.stop_threshold).min(1.0)
        } else {
            1.0
        };

        let meets_parallax = parallax_score >= COMPONENT_PASS_SCORE;
        let meets_depth = depth_score >= COMPONENT_PASS_SCORE;
        let should_stop =
            score >= p.stop_threshold && meets_parallax && meets_depth && meets_tracking;

        self.ready = should_stop;

        CaptureQualityStatus {
            score,
            progress,
            should_stop,
            meets_parallax,
            meets_depth,
            meets_tracking,
        }
    }
}

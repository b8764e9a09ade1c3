//! Evidence fusion of a geometry estimate with an analyzer observation
//!
//! Fixed weights, not inverse-variance weighting. Sigma is the quadrature
//! sum of the weighted sigmas, which assumes independent errors.

use kcal_types::{AnalysisObservation, FusedResult, GeometryEstimate};

pub const ANALYZER_WEIGHT: f64 = 0.7;
pub const GEOMETRY_WEIGHT: f64 = 0.3;

/// Analyzer sigma as a fraction of its calories when none was reported
pub const DEFAULT_ANALYZER_SIGMA_FRACTION: f64 = 0.2;

/// Calorie evidence from an analyzer independent of the geometry pipeline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyzerEstimate {
    pub calories: Option<f64>,
    pub sigma_calories: Option<f64>,
    pub evidence: Vec<String>,
}

impl From<&AnalysisObservation> for AnalyzerEstimate {
    fn from(obs: &AnalysisObservation) -> Self {
        Self {
            calories: Some(obs.calories).filter(|c| c.is_finite()),
            sigma_calories: Some(obs.sigma_calories).filter(|s| s.is_finite() && *s >= 0.0),
            evidence: obs.evidence.clone(),
        }
    }
}

pub fn fuse(geometry: &GeometryEstimate, analyzer: Option<&AnalyzerEstimate>) -> FusedResult {
    let Some((analyzer, analyzer_calories)) =
        analyzer.and_then(|a| a.calories.map(|calories| (a, calories)))
    else {
        return FusedResult {
            calories: geometry.calories,
            sigma: geometry.sigma,
            evidence: geometry.evidence.clone(),
        };
    };

    let analyzer_sigma = analyzer
        .sigma_calories
        .unwrap_or(analyzer_calories * DEFAULT_ANALYZER_SIGMA_FRACTION);

    let calories = analyzer_calories * ANALYZER_WEIGHT + geometry.calories * GEOMETRY_WEIGHT;
    let sigma = ((analyzer_sigma * ANALYZER_WEIGHT).powi(2)
        + (geometry.sigma * GEOMETRY_WEIGHT).powi(2))
    .sqrt();

    let mut evidence = geometry.evidence.clone();
    evidence.extend(analyzer.evidence.iter().cloned());

    FusedResult {
        calories,
        sigma,
        evidence,
    }
}

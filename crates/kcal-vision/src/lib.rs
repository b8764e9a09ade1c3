//! Vision module - model-backed food image analysis

pub mod ai;
pub mod parser;
pub mod selector;

// Re-export main types for convenience
pub use ai::backend_impl::{OpenAiBackend, BACKEND_NAME};
pub use ai::prompts::build_prompt;
pub use ai::VisionBackend;
pub use parser::{
    decode_failure, is_placeholder_label, parse_response, sanitize_label, upstream_failure,
};
pub use selector::{HintPathClassifier, PathClassifier};

use kcal_types::{AnalysisObservation, AnalysisPath, ImageReference, Result};
use log::{info, warn};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(12);

/// Analyzer configuration
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f64,
    /// `low`, `high` or `auto`
    pub image_detail: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_tokens: 300,
            temperature: 0.1,
            image_detail: "low".to_string(),
        }
    }
}

impl AnalyzerConfig {
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        if let Some(model) = model {
            self.model = model;
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Run one analysis call for `path` and parse the result.
///
/// Upstream failures (bad status, timeout, broken envelope) come back as a
/// degraded observation tagged `API_Failed`. Only a missing credential or
/// another non-upstream error is returned as `Err`.
pub async fn analyze_image(
    backend: &dyn VisionBackend,
    image: &ImageReference,
    path: AnalysisPath,
) -> Result<AnalysisObservation> {
    let prompt = build_prompt(path);

    match backend.send_prompt(&prompt, image).await {
        Ok(response) => {
            let observation = parse_response(&response, path, backend.name());
            info!(
                "{} analysis: {} ({:.0} ± {:.0} kcal, confidence {:.2})",
                path, observation.label, observation.calories, observation.sigma_calories,
                observation.confidence
            );
            Ok(observation)
        }
        Err(e) if e.is_absorbed() => {
            warn!("Vision call failed: {e}");
            Ok(upstream_failure(path, backend.name()))
        }
        Err(e) => Err(e),
    }
}

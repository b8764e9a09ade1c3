//! Vision-model backends and prompts

pub mod backend_impl;
pub mod prompts;

use async_trait::async_trait;
use kcal_types::{ImageReference, Result};

/// One structured-extraction call to a multimodal model.
///
/// Returns the raw message text, expected (not guaranteed) to hold JSON.
/// Implementations fail with `Error::UpstreamUnavailable` when their
/// credential is missing and `Error::UpstreamError` for everything the
/// upstream does wrong, timeouts included.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// Name recorded in evidence tags and response metadata
    fn name(&self) -> &str;

    async fn send_prompt(&self, prompt: &str, image: &ImageReference) -> Result<String>;
}

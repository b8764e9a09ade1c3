//! Adapter construction from configuration

use std::sync::Arc;

use kcal_domain::ImageRepository;
use kcal_infra::SupabaseImageRepository;
use kcal_types::Result;
use kcal_vision::{OpenAiBackend, VisionBackend};
use log::info;

use crate::config::Config;

/// Open the vision backend
pub fn open_vision_backend(config: &Config) -> Result<Arc<dyn VisionBackend>> {
    let backend = OpenAiBackend::new(config.analyzer_config())?;
    Ok(Arc::new(backend))
}

/// Open the durable image store, if storage is configured
pub fn open_image_repo(config: &Config) -> Option<Arc<dyn ImageRepository>> {
    let options = config.storage_options()?;
    info!(
        "Image storage enabled: {} (bucket {})",
        options.base_url, options.bucket
    );
    Some(Arc::new(SupabaseImageRepository::new(options)))
}

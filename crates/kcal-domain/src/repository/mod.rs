//! Repository trait definitions for durable persistence

use async_trait::async_trait;
use kcal_types::{ImageReference, StorageError};

/// Durable store for submitted images
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Short backend name reported in response metadata
    fn name(&self) -> &str;

    /// Persist a data-URL image and return its public URL
    async fn persist(&self, image: &ImageReference) -> Result<String, StorageError>;
}

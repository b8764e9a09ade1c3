//! File-backed frame capture
//!
//! Stands in for a camera on hosts that have none: the "frame" is a photo
//! already on disk. Format is sniffed from the bytes, not the extension.

use async_trait::async_trait;
use base64::prelude::*;
use log::debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use kcal_domain::capture::FrameCaptureService;
use kcal_domain::model::CapturedFrame;
use kcal_types::{CaptureError, ImageReference};

pub struct StillImageCaptureService {
    path: PathBuf,
    running: AtomicBool,
}

impl StillImageCaptureService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            running: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn check_readable(&self) -> Result<(), CaptureError> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(CaptureError::CameraUnavailable),
            Err(e) => Err(map_io_error(e)),
        }
    }
}

fn map_io_error(e: std::io::Error) -> CaptureError {
    match e.kind() {
        ErrorKind::NotFound => CaptureError::CameraUnavailable,
        ErrorKind::PermissionDenied => CaptureError::PermissionDenied,
        _ => CaptureError::CaptureFailure(e.to_string()),
    }
}

#[async_trait]
impl FrameCaptureService for StillImageCaptureService {
    fn is_available(&self) -> bool {
        self.path.is_file()
    }

    async fn request_permission(&self) -> Result<(), CaptureError> {
        self.check_readable().await
    }

    async fn start_session(&self) -> Result<(), CaptureError> {
        self.check_readable().await?;
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_session(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    async fn capture_frame(&self) -> Result<CapturedFrame, CaptureError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(CaptureError::SessionNotStarted);
        }

        let bytes = tokio::fs::read(&self.path).await.map_err(map_io_error)?;
        let format = image::guess_format(&bytes).map_err(|e| {
            CaptureError::CaptureFailure(format!(
                "{}: not a recognized image ({e})",
                self.path.display()
            ))
        })?;
        let mime_type = format.to_mime_type();
        debug!("Captured {} ({}, {} bytes)", self.path.display(), mime_type, bytes.len());

        Ok(CapturedFrame::new(bytes, mime_type))
    }
}

/// Inline a captured frame as a data URL
pub fn frame_to_image_reference(frame: &CapturedFrame) -> ImageReference {
    ImageReference::from_base64(&BASE64_STANDARD.encode(&frame.rgb_image), &frame.mime_type)
}

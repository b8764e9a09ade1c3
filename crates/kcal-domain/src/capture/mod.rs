//! Frame capture capability
//!
//! Implementations are chosen by the caller: [`MockCaptureService`] for
//! tests, a platform-backed service (see `kcal-infra`) otherwise.

use async_trait::async_trait;
use kcal_types::CaptureError;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::model::CapturedFrame;

#[async_trait]
pub trait FrameCaptureService: Send + Sync {
    fn is_available(&self) -> bool;

    async fn request_permission(&self) -> Result<(), CaptureError>;

    async fn start_session(&self) -> Result<(), CaptureError>;

    fn stop_session(&self);

    async fn capture_frame(&self) -> Result<CapturedFrame, CaptureError>;
}

/// Test double returning a canned frame, or failing every call
#[derive(Debug, Default)]
pub struct MockCaptureService {
    pub should_fail: bool,
    pub mock_frame: Option<CapturedFrame>,
    running: AtomicBool,
}

impl MockCaptureService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn with_frame(frame: CapturedFrame) -> Self {
        Self {
            mock_frame: Some(frame),
            ..Self::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameCaptureService for MockCaptureService {
    fn is_available(&self) -> bool {
        true
    }

    async fn request_permission(&self) -> Result<(), CaptureError> {
        if self.should_fail {
            return Err(CaptureError::PermissionDenied);
        }
        Ok(())
    }

    async fn start_session(&self) -> Result<(), CaptureError> {
        if self.should_fail {
            return Err(CaptureError::CameraUnavailable);
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_session(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    async fn capture_frame(&self) -> Result<CapturedFrame, CaptureError> {
        if self.should_fail {
            return Err(CaptureError::CaptureFailure("Mock failure".to_string()));
        }
        Ok(self
            .mock_frame
            .clone()
            .unwrap_or_else(|| CapturedFrame::new(Vec::new(), "image/jpeg")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_session_lifecycle() {
        let service = MockCaptureService::with_frame(CapturedFrame::new(vec![1, 2, 3], "image/png"));
        assert!(service.is_available());
        service.request_permission().await.unwrap();
        service.start_session().await.unwrap();
        assert!(service.is_running());

        let frame = service.capture_frame().await.unwrap();
        assert_eq!(frame.rgb_image, vec![1, 2, 3]);
        assert_eq!(frame.mime_type, "image/png");

        service.stop_session();
        assert!(!service.is_running());
    }

    #[tokio::test]
    async fn test_failing_mock() {
        let service = MockCaptureService::failing();
        assert!(matches!(
            service.request_permission().await,
            Err(CaptureError::PermissionDenied)
        ));
        assert!(matches!(
            service.start_session().await,
            Err(CaptureError::CameraUnavailable)
        ));
        assert!(matches!(
            service.capture_frame().await,
            Err(CaptureError::CaptureFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_default_frame_is_empty_jpeg() {
        let frame = MockCaptureService::new().capture_frame().await.unwrap();
        assert!(frame.rgb_image.is_empty());
        assert_eq!(frame.mime_type, "image/jpeg");
    }
}

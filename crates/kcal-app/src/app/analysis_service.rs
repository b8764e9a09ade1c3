//! Analysis Service - core use case for food image analysis
//!
//! This service orchestrates one request:
//! 1. Normalize the image input
//! 2. Persist inline images to durable storage (best effort)
//! 3. Select the analysis path
//! 4. Call the vision model and parse its answer
//! 5. Assemble the response with metadata
//!
//! Built once at start-up and shared; holds no per-request state.

use std::sync::Arc;
use std::time::Instant;

use kcal_domain::{fuse, geometry_estimate, AnalyzerEstimate, ImageRepository};
use kcal_types::{
    AnalysisObservation, AnalysisPath, AnalyzeRequest, AnalyzeResponse, FusedResult,
    GeometryEstimate, ImageReference, ResponseMeta, Result, VolumeEstimate,
};
use kcal_vision::{
    analyze_image, is_placeholder_label, HintPathClassifier, PathClassifier, VisionBackend,
};
use log::{debug, warn};

use crate::config::Config;
use crate::normalizer::normalize;
use crate::repository::{open_image_repo, open_vision_backend};

pub struct AnalysisService {
    backend: Arc<dyn VisionBackend>,
    image_repo: Option<Arc<dyn ImageRepository>>,
    classifier: Arc<dyn PathClassifier>,
}

impl AnalysisService {
    pub fn new(backend: Arc<dyn VisionBackend>) -> Self {
        Self {
            backend,
            image_repo: None,
            classifier: Arc::new(HintPathClassifier),
        }
    }

    pub fn with_image_repository(mut self, repo: Arc<dyn ImageRepository>) -> Self {
        self.image_repo = Some(repo);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn PathClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Wire the OpenAI backend and, when configured, Supabase storage
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut service = Self::new(open_vision_backend(config)?);
        if let Some(repo) = open_image_repo(config) {
            service = service.with_image_repository(repo);
        }
        Ok(service)
    }

    pub fn has_image_repository(&self) -> bool {
        self.image_repo.is_some()
    }

    /// Handle one HTTP-shaped request
    pub async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse> {
        let started = Instant::now();
        let image = normalize(request)?;
        self.run(image, request.path, started).await
    }

    /// Analyze an already canonical image reference
    pub async fn analyze_reference(
        &self,
        image: ImageReference,
        hint: Option<AnalysisPath>,
    ) -> Result<AnalyzeResponse> {
        self.run(image, hint, Instant::now()).await
    }

    async fn run(
        &self,
        image: ImageReference,
        hint: Option<AnalysisPath>,
        started: Instant,
    ) -> Result<AnalyzeResponse> {
        let mut used = Vec::new();

        let image = self.persist_best_effort(image, &mut used).await;
        let path = self.classifier.classify(&image, hint);
        debug!("Analysis path: {path}");

        let observation = analyze_image(self.backend.as_ref(), &image, path).await?;
        if is_placeholder_label(&observation.label) {
            warn!(
                "Analyzer produced a generic label for {path} analysis (evidence: {})",
                observation.evidence.join(", ")
            );
        }
        used.push(self.backend.name().to_lowercase());

        Ok(AnalyzeResponse {
            items: vec![observation],
            meta: ResponseMeta {
                used,
                latency_ms: started.elapsed().as_millis() as u64,
            },
        })
    }

    /// Swap an inline image for its stored public URL. Any failure keeps
    /// the original reference.
    async fn persist_best_effort(
        &self,
        image: ImageReference,
        used: &mut Vec<String>,
    ) -> ImageReference {
        let Some(repo) = self.image_repo.as_ref() else {
            return image;
        };
        if !image.is_data_url() {
            return image;
        }

        used.push(repo.name().to_string());
        match repo.persist(&image).await {
            Ok(url) => ImageReference::Remote(url),
            Err(e) => {
                warn!("Image storage failed, using inline image: {e}");
                image
            }
        }
    }
}

/// Combine an analyzer observation with a measured food volume.
///
/// The geometry side uses the observation's priors (defaults when the
/// model gave none); the observation itself is the independent analyzer
/// estimate.
pub fn fuse_with_volume(
    observation: &AnalysisObservation,
    volume: VolumeEstimate,
) -> (GeometryEstimate, FusedResult) {
    let priors = observation.priors.unwrap_or_default();
    let geometry = geometry_estimate(&observation.label, &volume, &priors);
    let analyzer = AnalyzerEstimate::from(observation);
    let fused = fuse(&geometry, Some(&analyzer));
    (geometry, fused)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kcal_types::{Error, StorageError};
    use std::sync::Mutex;

    struct FakeBackend {
        reply: fn() -> Result<String>,
        seen: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn new(reply: fn() -> Result<String>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl VisionBackend for FakeBackend {
        fn name(&self) -> &str {
            "Fake"
        }

        async fn send_prompt(&self, _prompt: &str, image: &ImageReference) -> Result<String> {
            self.seen.lock().unwrap().push(image.as_str().to_string());
            (self.reply)()
        }
    }

    struct FakeRepo(bool);

    #[async_trait]
    impl ImageRepository for FakeRepo {
        fn name(&self) -> &str {
            "fakestore"
        }

        async fn persist(&self, _image: &ImageReference) -> std::result::Result<String, StorageError> {
            if self.0 {
                Ok("https://store.example.com/camera/1.jpg".to_string())
            } else {
                Err(StorageError::Upload {
                    status: 500,
                    body: "boom".to_string(),
                })
            }
        }
    }

    fn salmon() -> Result<String> {
        Ok(r#"{"label": "grilled salmon", "estimatedCalories": 420, "confidence": 0.8}"#.to_string())
    }

    fn base64_request() -> AnalyzeRequest {
        AnalyzeRequest {
            image_base64: Some("AAAA".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_stored_url_is_sent_to_model() {
        let backend = FakeBackend::new(salmon);
        let service = AnalysisService::new(backend.clone())
            .with_image_repository(Arc::new(FakeRepo(true)));

        let response = service.analyze(&base64_request()).await.unwrap();
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].label, "Grilled Salmon");
        assert_eq!(response.meta.used, vec!["fakestore", "fake"]);
        assert_eq!(
            backend.seen.lock().unwrap()[0],
            "https://store.example.com/camera/1.jpg"
        );
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_inline_image() {
        let backend = FakeBackend::new(salmon);
        let service = AnalysisService::new(backend.clone())
            .with_image_repository(Arc::new(FakeRepo(false)));

        let response = service.analyze(&base64_request()).await.unwrap();
        assert_eq!(response.items[0].calories, 420.0);
        assert_eq!(
            backend.seen.lock().unwrap()[0],
            "data:image/jpeg;base64,AAAA"
        );
    }

    #[tokio::test]
    async fn test_storage_timeout_sends_inline_image() {
        use axum::{routing::post, Router};
        use kcal_infra::{SupabaseImageRepository, SupabaseStorageOptions};
        use std::time::Duration;

        let router = Router::new().route(
            "/storage/v1/bucket",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "{}"
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let mut options =
            SupabaseStorageOptions::new(format!("http://{addr}"), Some("service-key".to_string()));
        options.timeout = Duration::from_millis(150);

        let backend = FakeBackend::new(salmon);
        let service = AnalysisService::new(backend.clone())
            .with_image_repository(Arc::new(SupabaseImageRepository::new(options)));

        let response = service.analyze(&base64_request()).await.unwrap();
        assert_eq!(response.meta.used, vec!["supabase", "fake"]);
        assert_eq!(response.items[0].label, "Grilled Salmon");
        assert!(response.meta.latency_ms < 2000);
        assert_eq!(
            backend.seen.lock().unwrap()[0],
            "data:image/jpeg;base64,AAAA"
        );
    }

    #[tokio::test]
    async fn test_remote_url_skips_storage() {
        let backend = FakeBackend::new(salmon);
        let service =
            AnalysisService::new(backend).with_image_repository(Arc::new(FakeRepo(true)));

        let request = AnalyzeRequest {
            image_url: Some("https://example.com/lunch.jpg".to_string()),
            ..Default::default()
        };
        let response = service.analyze(&request).await.unwrap();
        assert_eq!(response.meta.used, vec!["fake"]);
    }

    #[tokio::test]
    async fn test_path_hint_is_honored() {
        let backend = FakeBackend::new(|| {
            Ok(r#"{"restaurant": "Diner", "itemName": "Club Sandwich", "calories": 610}"#.to_string())
        });
        let service = AnalysisService::new(backend);
        let request = AnalyzeRequest {
            path: Some(AnalysisPath::Menu),
            ..base64_request()
        };
        let response = service.analyze(&request).await.unwrap();
        assert_eq!(response.items[0].path, AnalysisPath::Menu);
        assert_eq!(response.items[0].label, "Club Sandwich");
    }

    #[tokio::test]
    async fn test_custom_classifier_overrides_default() {
        struct AlwaysLabel;
        impl PathClassifier for AlwaysLabel {
            fn classify(&self, _image: &ImageReference, _hint: Option<AnalysisPath>) -> AnalysisPath {
                AnalysisPath::Label
            }
        }

        let service = AnalysisService::new(FakeBackend::new(|| Ok("garbled".to_string())))
            .with_classifier(Arc::new(AlwaysLabel));
        let response = service.analyze(&base64_request()).await.unwrap();
        let item = &response.items[0];
        assert_eq!(item.path, AnalysisPath::Label);
        assert_eq!((item.calories, item.sigma_calories, item.confidence), (200.0, 20.0, 0.6));
        assert!(item.has_evidence("Fallback"));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_degraded_not_error() {
        let backend = FakeBackend::new(|| {
            Err(Error::UpstreamError {
                status: None,
                message: "timed out".to_string(),
            })
        });
        let service = AnalysisService::new(backend);
        let response = service.analyze(&base64_request()).await.unwrap();
        let item = &response.items[0];
        assert_eq!((item.calories, item.sigma_calories, item.confidence), (200.0, 100.0, 0.3));
        assert!(item.has_evidence("API_Failed"));
    }

    #[tokio::test]
    async fn test_missing_image_and_missing_key_are_errors() {
        let service = AnalysisService::new(FakeBackend::new(salmon));
        let err = service.analyze(&AnalyzeRequest::default()).await.unwrap_err();
        assert_eq!(err.http_status(), 400);

        let service = AnalysisService::new(FakeBackend::new(|| {
            Err(Error::UpstreamUnavailable("OPENAI_API_KEY not configured".to_string()))
        }));
        let err = service.analyze(&base64_request()).await.unwrap_err();
        assert_eq!(err.http_status(), 500);
        assert_eq!(err.to_string(), "OPENAI_API_KEY not configured");
    }

    #[test]
    fn test_fuse_with_volume() {
        let observation = AnalysisObservation {
            label: "Rice".to_string(),
            confidence: 0.7,
            calories: 500.0,
            sigma_calories: 75.0,
            path: AnalysisPath::Geometry,
            evidence: vec!["Analyzer".to_string()],
            macros: None,
            nutrition_label: None,
            menu_item: None,
            priors: None,
        };
        let (geometry, fused) = fuse_with_volume(&observation, VolumeEstimate::new(300.0, 30.0));
        assert!((geometry.calories - 331.5).abs() < 1e-9);
        let expected = 500.0 * 0.7 + 331.5 * 0.3;
        assert!((fused.calories - expected).abs() < 1e-9);
        assert!(fused.evidence.contains(&"Geometry".to_string()));
        assert!(fused.evidence.contains(&"Analyzer".to_string()));
    }
}

//! Analysis path selection

use kcal_types::{AnalysisPath, ImageReference};

/// Chooses the analysis path for a submission.
///
/// Implementations must be total and cheap; selection happens before the
/// model call and never fails a request.
pub trait PathClassifier: Send + Sync {
    fn classify(&self, image: &ImageReference, hint: Option<AnalysisPath>) -> AnalysisPath;
}

/// Honors the caller's hint, geometry otherwise. No image inspection.
#[derive(Debug, Clone, Copy, Default)]
pub struct HintPathClassifier;

impl PathClassifier for HintPathClassifier {
    fn classify(&self, _image: &ImageReference, hint: Option<AnalysisPath>) -> AnalysisPath {
        hint.unwrap_or(AnalysisPath::Geometry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_geometry() {
        let image = ImageReference::Remote("https://example.com/plate.jpg".to_string());
        assert_eq!(HintPathClassifier.classify(&image, None), AnalysisPath::Geometry);
    }

    #[test]
    fn test_hint_wins() {
        let image = ImageReference::from_base64("AAAA", "image/jpeg");
        assert_eq!(
            HintPathClassifier.classify(&image, Some(AnalysisPath::Menu)),
            AnalysisPath::Menu
        );
    }
}

//! Request normalization - one canonical image reference per request

use kcal_types::{AnalyzeRequest, Error, ImageReference, Result};

pub const MISSING_IMAGE_MESSAGE: &str = "Either imageBase64 or imageUrl is required";
pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Declared MIME type if it is `image/*`, else JPEG
fn mime_type(request: &AnalyzeRequest) -> &str {
    request
        .mime_type
        .as_deref()
        .map(str::trim)
        .filter(|m| {
            m.len() > 6
                && m.get(..6)
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
        })
        .unwrap_or(DEFAULT_MIME_TYPE)
}

/// Field value as sent; only an empty string counts as absent
fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Resolve `imageUrl` / `imageBase64` into a URL or data URL.
///
/// `imageUrl` wins when both are sent. Values that are already URLs or
/// data URLs pass through unchanged; anything else is treated as raw
/// base64 and wrapped. Payload validity is not checked here.
pub fn normalize(request: &AnalyzeRequest) -> Result<ImageReference> {
    let raw = present(&request.image_url)
        .or_else(|| present(&request.image_base64))
        .ok_or_else(|| Error::InvalidRequest(MISSING_IMAGE_MESSAGE.to_string()))?;

    Ok(ImageReference::recognize(raw)
        .unwrap_or_else(|| ImageReference::from_base64(raw, mime_type(request))))
}

//! Data model shared by every crate in the workspace

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Analysis path
// ============================================================================

/// Analysis strategy chosen for a submission
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisPath {
    /// Reading a nutrition facts panel
    Label,
    /// Identifying a known restaurant item
    Menu,
    /// Estimating from visual appearance / volume
    #[default]
    Geometry,
}

impl AnalysisPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisPath::Label => "label",
            AnalysisPath::Menu => "menu",
            AnalysisPath::Geometry => "geometry",
        }
    }

    /// Evidence tag recorded when this path ran
    pub fn evidence_tag(&self) -> &'static str {
        match self {
            AnalysisPath::Label => "Label",
            AnalysisPath::Menu => "Menu",
            AnalysisPath::Geometry => "Geometry",
        }
    }
}

impl fmt::Display for AnalysisPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "label" => Ok(AnalysisPath::Label),
            "menu" => Ok(AnalysisPath::Menu),
            "geometry" => Ok(AnalysisPath::Geometry),
            other => Err(format!("unknown analysis path: {}", other)),
        }
    }
}

// ============================================================================
// Statistical priors
// ============================================================================

/// Mean and standard deviation of a physical quantity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorStats {
    pub mu: f64,
    pub sigma: f64,
}

impl PriorStats {
    /// Negative or non-finite sigma is clamped to zero
    pub fn new(mu: f64, sigma: f64) -> Self {
        let sigma = if sigma.is_finite() { sigma.max(0.0) } else { 0.0 };
        Self { mu, sigma }
    }

    /// Coefficient of variation; infinite when `mu == 0`
    pub fn relative_uncertainty(&self) -> f64 {
        if self.mu == 0.0 {
            return f64::INFINITY;
        }
        self.sigma / self.mu.abs()
    }
}

/// Density (g/mL) and energy-density (kcal/g) priors for one food
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodPriors {
    pub density: PriorStats,
    pub kcal_per_g: PriorStats,
}

impl FoodPriors {
    pub const DEFAULT_DENSITY: PriorStats = PriorStats { mu: 0.85, sigma: 0.13 };
    pub const DEFAULT_KCAL_PER_G: PriorStats = PriorStats { mu: 1.30, sigma: 0.26 };
}

impl Default for FoodPriors {
    fn default() -> Self {
        Self {
            density: Self::DEFAULT_DENSITY,
            kcal_per_g: Self::DEFAULT_KCAL_PER_G,
        }
    }
}

/// Volume estimate in milliliters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeEstimate {
    pub mu_ml: f64,
    pub sigma_ml: f64,
}

impl VolumeEstimate {
    pub fn new(mu_ml: f64, sigma_ml: f64) -> Self {
        Self {
            mu_ml,
            sigma_ml: sigma_ml.max(0.0),
        }
    }

    pub fn relative_uncertainty(&self) -> f64 {
        if self.mu_ml == 0.0 {
            return f64::INFINITY;
        }
        self.sigma_ml / self.mu_ml.abs()
    }
}

// ============================================================================
// Nutrition payloads
// ============================================================================

/// Protein / carbohydrate / fat grams per 100 g of edible portion
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacronutrientProfile {
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

impl MacronutrientProfile {
    pub fn new(protein_g: f64, carbs_g: f64, fat_g: f64) -> Self {
        Self {
            protein_g: non_negative(protein_g),
            carbs_g: non_negative(carbs_g),
            fat_g: non_negative(fat_g),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionLabel {
    pub serving_size: String,
    pub calories_per_serving: f64,
    pub total_servings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub restaurant: String,
    pub item_name: String,
    pub calories: f64,
}

// ============================================================================
// Observations and estimates
// ============================================================================

/// Sanitized analyzer output for one food item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisObservation {
    pub label: String,
    pub confidence: f64,
    pub calories: f64,
    pub sigma_calories: f64,
    pub path: AnalysisPath,
    pub evidence: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macros: Option<MacronutrientProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition_label: Option<NutritionLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_item: Option<MenuItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priors: Option<FoodPriors>,
}

impl AnalysisObservation {
    /// Confidence into [0, 1], calories and sigma non-negative
    pub fn clamped(mut self) -> Self {
        self.confidence = if self.confidence.is_finite() {
            self.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.calories = non_negative(self.calories);
        self.sigma_calories = non_negative(self.sigma_calories);
        self
    }

    /// 95% interval (±2σ)
    pub fn confidence_interval(&self) -> (f64, f64) {
        (
            self.calories - 2.0 * self.sigma_calories,
            self.calories + 2.0 * self.sigma_calories,
        )
    }

    pub fn has_evidence(&self, tag: &str) -> bool {
        self.evidence.iter().any(|e| e == tag)
    }
}

/// Calorie estimate derived from measured volume and food priors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryEstimate {
    pub label: String,
    pub volume_ml: f64,
    pub calories: f64,
    pub sigma: f64,
    pub evidence: Vec<String>,
}

/// Output of evidence fusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusedResult {
    pub calories: f64,
    pub sigma: f64,
    pub evidence: Vec<String>,
}

impl FusedResult {
    pub fn relative_uncertainty(&self) -> f64 {
        if self.calories == 0.0 {
            return f64::INFINITY;
        }
        self.sigma / self.calories.abs()
    }

    pub fn confidence_interval(&self) -> (f64, f64) {
        (self.calories - 2.0 * self.sigma, self.calories + 2.0 * self.sigma)
    }
}

// ============================================================================
// Image references
// ============================================================================

/// `^https?://`, case-insensitive
pub fn looks_like_url(s: &str) -> bool {
    let lower = s.get(..8).unwrap_or(s).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// `^data:`, case-insensitive
pub fn looks_like_data_url(s: &str) -> bool {
    s.get(..5)
        .map(|prefix| prefix.eq_ignore_ascii_case("data:"))
        .unwrap_or(false)
}

/// Canonical, fetchable image input for the vision model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReference {
    /// http(s) URL, already durable
    Remote(String),
    /// `data:<mime>;base64,<payload>`
    Data(String),
}

impl ImageReference {
    /// Recognize a string that is already a URL or data URL
    pub fn recognize(s: &str) -> Option<Self> {
        if looks_like_url(s) {
            Some(ImageReference::Remote(s.to_string()))
        } else if looks_like_data_url(s) {
            Some(ImageReference::Data(s.to_string()))
        } else {
            None
        }
    }

    /// Wrap a raw base64 payload as a data URL
    pub fn from_base64(payload: &str, mime_type: &str) -> Self {
        ImageReference::Data(format!("data:{};base64,{}", mime_type, payload))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ImageReference::Remote(s) | ImageReference::Data(s) => s,
        }
    }

    pub fn is_data_url(&self) -> bool {
        matches!(self, ImageReference::Data(_))
    }

    /// `(mime, base64 payload)` of a data URL in `data:<mime>;base64,<payload>` form
    pub fn data_parts(&self) -> Option<(&str, &str)> {
        let ImageReference::Data(s) = self else {
            return None;
        };
        let rest = s.get(5..)?;
        let (mime, payload) = rest.split_once(";base64,")?;
        if mime.is_empty() || mime.contains(';') {
            return None;
        }
        Some((mime, payload))
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Wire DTOs
// ============================================================================

/// POST body of the analysis endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Caller-supplied analysis path hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<AnalysisPath>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub used: Vec<String>,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub items: Vec<AnalysisObservation>,
    pub meta: ResponseMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

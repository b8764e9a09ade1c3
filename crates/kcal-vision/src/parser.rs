//! Model response parsing and sanitization
//!
//! `parse_response` is total: whatever text comes back, the caller gets an
//! `AnalysisObservation`. Decoding runs an ordered chain of decoders, each
//! of which either produces something or passes, and ends in per-path
//! defaults tagged `Fallback`.

use kcal_types::{
    AnalysisObservation, AnalysisPath, Error, FoodPriors, MacronutrientProfile, MenuItem,
    NutritionLabel, PriorStats,
};
use log::{debug, warn};
use serde_json::{Map, Value};

pub const UNKNOWN_FOOD: &str = "Unknown Food";
pub const UNKNOWN_PRODUCT: &str = "Unknown Product";
pub const RESTAURANT_ITEM: &str = "Restaurant Item";
pub const UNKNOWN_RESTAURANT: &str = "Unknown Restaurant";
pub const UNKNOWN_ITEM: &str = "Unknown Item";
pub const DEFAULT_SERVING_SIZE: &str = "1 serving";

pub const TAG_ANALYZER: &str = "Analyzer";
pub const TAG_API_FAILED: &str = "API_Failed";
pub const TAG_FALLBACK: &str = "Fallback";
/// JSON object found inside surrounding prose
pub const TAG_EMBEDDED: &str = "Embedded";

/// Labels that carry no identification; compared lowercase
const PLACEHOLDER_LABELS: &[&str] = &[
    "unknown food",
    "food",
    "meal",
    "dish",
    "geometry",
    "home-cooked food",
];

// ============================================================================
// Per-path defaults
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct PathDefaults {
    calories: f64,
    sigma_fraction: f64,
    confidence: f64,
    /// Flat values when decoding failed
    fallback_calories: f64,
    fallback_sigma: f64,
    fallback_confidence: f64,
    /// Flat values when the upstream call failed
    failed_calories: f64,
    failed_sigma: f64,
    failed_confidence: f64,
}

fn defaults_for(path: AnalysisPath) -> PathDefaults {
    match path {
        AnalysisPath::Label => PathDefaults {
            calories: 200.0,
            sigma_fraction: 0.10,
            confidence: 0.8,
            fallback_calories: 200.0,
            fallback_sigma: 20.0,
            fallback_confidence: 0.6,
            failed_calories: 200.0,
            failed_sigma: 20.0,
            failed_confidence: 0.6,
        },
        AnalysisPath::Menu => PathDefaults {
            calories: 500.0,
            sigma_fraction: 0.15,
            confidence: 0.7,
            fallback_calories: 500.0,
            fallback_sigma: 75.0,
            fallback_confidence: 0.6,
            failed_calories: 500.0,
            failed_sigma: 75.0,
            failed_confidence: 0.6,
        },
        AnalysisPath::Geometry => PathDefaults {
            calories: 300.0,
            sigma_fraction: 0.20,
            confidence: 0.6,
            fallback_calories: 300.0,
            fallback_sigma: 60.0,
            fallback_confidence: 0.5,
            failed_calories: 200.0,
            failed_sigma: 100.0,
            failed_confidence: 0.3,
        },
    }
}

/// Key holding the human-readable name on each path
fn label_key(path: AnalysisPath) -> &'static str {
    match path {
        AnalysisPath::Menu => "itemName",
        AnalysisPath::Label | AnalysisPath::Geometry => "label",
    }
}

fn base_evidence(path: AnalysisPath, source: &str) -> Vec<String> {
    vec![
        TAG_ANALYZER.to_string(),
        source.to_string(),
        path.evidence_tag().to_string(),
    ]
}

// ============================================================================
// Label sanitization
// ============================================================================

pub fn is_placeholder_label(label: &str) -> bool {
    let lower = label.trim().to_lowercase();
    PLACEHOLDER_LABELS.contains(&lower.as_str())
}

/// Trim, reject placeholders, title-case all-lowercase labels.
///
/// Mixed-case input is returned as is.
pub fn sanitize_label(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_placeholder_label(trimmed) {
        return UNKNOWN_FOOD.to_string();
    }
    if trimmed == trimmed.to_lowercase() {
        title_case(trimmed)
    } else {
        trimmed.to_string()
    }
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some('(') => match chars.next() {
                    Some(c) => format!("({}{}", c.to_uppercase(), chars.as_str()),
                    None => "(".to_string(),
                },
                Some(c) => format!("{}{}", c.to_uppercase(), chars.as_str()),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Text cleanup
// ============================================================================

/// Remove a surrounding ```json / ``` fence, if any
pub fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
    else {
        return trimmed;
    };
    let rest = rest.trim();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Outermost `{ ... }` span of the text, if any
pub fn extract_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (start < end).then(|| &response[start..=end])
}

/// Value following `key` in text that failed to parse as JSON.
///
/// Accepts `"key": "value"`, `key: "value"` and `key: value words`.
/// The key match is ASCII case-insensitive.
pub fn find_label_fragment<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let haystack = text.to_ascii_lowercase();
    let needle = key.to_ascii_lowercase();
    if needle.is_empty() {
        return None;
    }

    let mut from = 0;
    while let Some(pos) = haystack[from..].find(&needle) {
        let after_key = from + pos + needle.len();
        from = after_key;
        if let Some(value) = value_after_key(&text[after_key..]) {
            return Some(value);
        }
    }
    None
}

fn value_after_key(rest: &str) -> Option<&str> {
    let separator_len: usize = rest
        .chars()
        .take_while(|c| *c == '"' || *c == ':' || c.is_whitespace())
        .map(char::len_utf8)
        .sum();
    if separator_len == 0 {
        return None;
    }
    let separator = &rest[..separator_len];
    let value = &rest[separator_len..];

    if separator.ends_with('"') {
        let end = value.find('"')?;
        let quoted = value[..end].trim();
        return (!quoted.is_empty()).then_some(quoted);
    }

    let end = value
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphabetic() || c.is_whitespace() || "()-,".contains(*c)))
        .map(|(i, _)| i)
        .unwrap_or(value.len());
    let bare = value[..end].trim().trim_end_matches(',').trim();
    (!bare.is_empty()).then_some(bare)
}

// ============================================================================
// Decoder chain
// ============================================================================

#[derive(Debug)]
enum Decoded {
    Object(Map<String, Value>),
    Label(String),
}

type Decoder = fn(&str, AnalysisPath) -> Option<Decoded>;

const EMBEDDED_DECODER: &str = "embedded";

const DECODERS: &[(&str, Decoder)] = &[
    ("strict", decode_strict as Decoder),
    (EMBEDDED_DECODER, decode_embedded as Decoder),
    ("label_fragment", decode_label_fragment as Decoder),
];

fn decode_object(text: &str) -> Option<Decoded> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(Decoded::Object(map)),
        _ => None,
    }
}

fn decode_strict(text: &str, _path: AnalysisPath) -> Option<Decoded> {
    decode_object(strip_code_fences(text))
}

fn decode_embedded(text: &str, _path: AnalysisPath) -> Option<Decoded> {
    extract_json_object(text).and_then(decode_object)
}

fn decode_label_fragment(text: &str, path: AnalysisPath) -> Option<Decoded> {
    let label = sanitize_label(find_label_fragment(text, label_key(path))?);
    (label != UNKNOWN_FOOD).then_some(Decoded::Label(label))
}

/// First decoder that accepts the text, with its name
fn decode(text: &str, path: AnalysisPath) -> Option<(&'static str, Decoded)> {
    DECODERS.iter().find_map(|(name, decoder)| {
        let decoded = decoder(text, path)?;
        debug!("Response decoded by {name} decoder");
        Some((*name, decoded))
    })
}

// ============================================================================
// Field access
// ============================================================================

/// Number or numeric string, finite only
fn number(map: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = match map.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => numeric_text(s),
        _ => None,
    }?;
    value.is_finite().then_some(value)
}

/// Number written as text, e.g. `"650"`, `"1,200"` or `"150 kcal"`.
///
/// `,` and `_` are read as thousands separators. Anything after the number
/// other than a unit word makes the whole value unusable.
fn numeric_text(s: &str) -> Option<f64> {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',' && *c != '_').collect();
    let end = cleaned
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*i == 0 && *c == '-')))
        .map(|(i, _)| i)
        .unwrap_or(cleaned.len());
    let (number, unit) = cleaned.split_at(end);
    if !unit.chars().all(|c| c.is_alphabetic() || c.is_whitespace()) {
        return None;
    }
    number.parse().ok()
}

fn calories_field(map: &Map<String, Value>, key: &str) -> Option<f64> {
    number(map, key).filter(|c| *c >= 0.0)
}

fn text(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn prior(map: &Map<String, Value>, key: &str) -> Option<PriorStats> {
    let stats = map.get(key)?.as_object()?;
    Some(PriorStats::new(number(stats, "mu")?, number(stats, "sigma")?))
}

fn macros(map: &Map<String, Value>) -> MacronutrientProfile {
    match map.get("macros").and_then(Value::as_object) {
        Some(m) => MacronutrientProfile::new(
            number(m, "proteinG").unwrap_or(0.0),
            number(m, "carbsG").unwrap_or(0.0),
            number(m, "fatG").unwrap_or(0.0),
        ),
        None => MacronutrientProfile::default(),
    }
}

// ============================================================================
// Observation builders
// ============================================================================

fn from_object(map: &Map<String, Value>, path: AnalysisPath, source: &str) -> AnalysisObservation {
    let d = defaults_for(path);

    let mut observation = AnalysisObservation {
        label: String::new(),
        confidence: number(map, "confidence").unwrap_or(d.confidence),
        calories: d.calories,
        sigma_calories: 0.0,
        path,
        evidence: base_evidence(path, source),
        macros: Some(macros(map)),
        nutrition_label: None,
        menu_item: None,
        priors: None,
    };

    match path {
        AnalysisPath::Label => {
            let calories = calories_field(map, "caloriesPerServing")
                .or_else(|| calories_field(map, "calories"))
                .unwrap_or(d.calories);
            observation.label = text(map, "label").unwrap_or_else(|| UNKNOWN_PRODUCT.to_string());
            observation.calories = calories;
            observation.nutrition_label = Some(NutritionLabel {
                serving_size: text(map, "servingSize")
                    .unwrap_or_else(|| DEFAULT_SERVING_SIZE.to_string()),
                calories_per_serving: calories,
                total_servings: number(map, "totalServings")
                    .filter(|n| *n > 0.0)
                    .unwrap_or(1.0),
            });
        }
        AnalysisPath::Menu => {
            let item_name = text(map, "itemName");
            let calories = calories_field(map, "calories").unwrap_or(d.calories);
            observation.label = item_name
                .clone()
                .unwrap_or_else(|| RESTAURANT_ITEM.to_string());
            observation.calories = calories;
            observation.menu_item = Some(MenuItem {
                restaurant: text(map, "restaurant")
                    .unwrap_or_else(|| UNKNOWN_RESTAURANT.to_string()),
                item_name: item_name.unwrap_or_else(|| UNKNOWN_ITEM.to_string()),
                calories,
            });
        }
        AnalysisPath::Geometry => {
            observation.label = text(map, "label").unwrap_or_else(|| UNKNOWN_FOOD.to_string());
            observation.calories = calories_field(map, "estimatedCalories")
                .or_else(|| calories_field(map, "calories"))
                .unwrap_or(d.calories);
            observation.priors = Some(FoodPriors {
                density: prior(map, "density").unwrap_or(FoodPriors::DEFAULT_DENSITY),
                kcal_per_g: prior(map, "kcalPerG").unwrap_or(FoodPriors::DEFAULT_KCAL_PER_G),
            });
        }
    }

    observation.label = sanitize_label(&observation.label);
    observation.sigma_calories = number(map, "sigmaCalories")
        .filter(|s| *s >= 0.0)
        .unwrap_or(observation.calories * d.sigma_fraction);

    observation.clamped()
}

fn degraded(
    path: AnalysisPath,
    source: &str,
    label: String,
    calories: f64,
    sigma: f64,
    confidence: f64,
    tag: &str,
) -> AnalysisObservation {
    let mut evidence = base_evidence(path, source);
    evidence.push(tag.to_string());

    AnalysisObservation {
        label,
        confidence,
        calories,
        sigma_calories: sigma,
        path,
        evidence,
        macros: Some(MacronutrientProfile::default()),
        nutrition_label: (path == AnalysisPath::Label).then(|| NutritionLabel {
            serving_size: DEFAULT_SERVING_SIZE.to_string(),
            calories_per_serving: calories,
            total_servings: 1.0,
        }),
        menu_item: (path == AnalysisPath::Menu).then(|| MenuItem {
            restaurant: UNKNOWN_RESTAURANT.to_string(),
            item_name: UNKNOWN_ITEM.to_string(),
            calories,
        }),
        priors: (path == AnalysisPath::Geometry).then(FoodPriors::default),
    }
    .clamped()
}

/// Observation for text no decoder could turn into an object
pub fn decode_failure(path: AnalysisPath, source: &str, label: Option<String>) -> AnalysisObservation {
    let d = defaults_for(path);
    degraded(
        path,
        source,
        label.unwrap_or_else(|| UNKNOWN_FOOD.to_string()),
        d.fallback_calories,
        d.fallback_sigma,
        d.fallback_confidence,
        TAG_FALLBACK,
    )
}

/// Observation for a model call that failed or timed out
pub fn upstream_failure(path: AnalysisPath, source: &str) -> AnalysisObservation {
    let d = defaults_for(path);
    degraded(
        path,
        source,
        UNKNOWN_FOOD.to_string(),
        d.failed_calories,
        d.failed_sigma,
        d.failed_confidence,
        TAG_API_FAILED,
    )
}

/// Turn raw model text into an observation for `path`
pub fn parse_response(response: &str, path: AnalysisPath, source: &str) -> AnalysisObservation {
    match decode(response, path) {
        Some((decoder, Decoded::Object(map))) => {
            let mut observation = from_object(&map, path, source);
            if decoder == EMBEDDED_DECODER {
                observation.evidence.push(TAG_EMBEDDED.to_string());
            }
            observation
        }
        Some((_, Decoded::Label(label))) => {
            let err = Error::Decode(format!("response is not JSON, recovered label {label:?}"));
            warn!("{err}");
            decode_failure(path, source, Some(label))
        }
        None => {
            let err = Error::Decode(format!("no usable content in {} chars", response.len()));
            warn!("{err}; using {path} defaults");
            decode_failure(path, source, None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "OpenAI";

    #[test]
    fn test_sanitize_label() {
        assert_eq!(sanitize_label("food"), "Unknown Food");
        assert_eq!(sanitize_label("  FOOD "), "Unknown Food");
        assert_eq!(sanitize_label("Home-Cooked Food"), "Unknown Food");
        assert_eq!(sanitize_label(""), "Unknown Food");
        assert_eq!(sanitize_label("mixed fruit plate"), "Mixed Fruit Plate");
        assert_eq!(
            sanitize_label("Mixed Fruit Plate (Apple)"),
            "Mixed Fruit Plate (Apple)"
        );
        assert_eq!(sanitize_label("fruit plate (apple, kiwi)"), "Fruit Plate (Apple, Kiwi)");
        assert_eq!(sanitize_label("iPhone salad"), "iPhone salad");
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_json_object() {
        assert_eq!(
            extract_json_object("Here is the result: {\"test\": 123} end"),
            Some("{\"test\": 123}")
        );
        assert_eq!(extract_json_object("no braces"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn test_find_label_fragment_forms() {
        assert_eq!(
            find_label_fragment(r#"{"label": "Grilled Salmon", "estimatedCalories": "#, "label"),
            Some("Grilled Salmon")
        );
        assert_eq!(
            find_label_fragment("Label: \"Pad Thai\"", "label"),
            Some("Pad Thai")
        );
        assert_eq!(
            find_label_fragment("label: beef stew (small), 400 kcal", "label"),
            Some("beef stew (small)")
        );
        assert_eq!(find_label_fragment("nothing here", "label"), None);
    }

    #[test]
    fn test_geometry_success() {
        let response = r#"```json
{
  "label": "grilled chicken with rice",
  "estimatedCalories": 650,
  "density": {"mu": 0.9, "sigma": 0.1},
  "confidence": 1.4,
  "macros": {"proteinG": 18, "carbsG": 22, "fatG": -3}
}
```"#;
        let obs = parse_response(response, AnalysisPath::Geometry, SOURCE);
        assert_eq!(obs.label, "Grilled Chicken With Rice");
        assert_eq!(obs.calories, 650.0);
        assert!((obs.sigma_calories - 130.0).abs() < 1e-9);
        assert_eq!(obs.confidence, 1.0);
        assert_eq!(obs.evidence, vec!["Analyzer", "OpenAI", "Geometry"]);

        let priors = obs.priors.unwrap();
        assert_eq!(priors.density, PriorStats::new(0.9, 0.1));
        assert_eq!(priors.kcal_per_g, FoodPriors::DEFAULT_KCAL_PER_G);

        let macros = obs.macros.unwrap();
        assert_eq!(macros.protein_g, 18.0);
        assert_eq!(macros.fat_g, 0.0);
    }

    #[test]
    fn test_geometry_defaults_when_fields_missing() {
        let obs = parse_response("{}", AnalysisPath::Geometry, SOURCE);
        assert_eq!(obs.label, "Unknown Food");
        assert_eq!(obs.calories, 300.0);
        assert!((obs.sigma_calories - 60.0).abs() < 1e-9);
        assert_eq!(obs.confidence, 0.6);
        assert_eq!(obs.priors, Some(FoodPriors::default()));
        assert_eq!(obs.macros, Some(MacronutrientProfile::default()));
    }

    #[test]
    fn test_model_sigma_wins_over_fraction() {
        let obs = parse_response(
            r#"{"label": "Apple", "estimatedCalories": 95, "sigmaCalories": 12}"#,
            AnalysisPath::Geometry,
            SOURCE,
        );
        assert_eq!(obs.sigma_calories, 12.0);
    }

    #[test]
    fn test_label_path() {
        let obs = parse_response(
            r#"{"label": "Oat Crunch", "servingSize": "40 g", "caloriesPerServing": "150 kcal", "totalServings": 8}"#,
            AnalysisPath::Label,
            SOURCE,
        );
        assert_eq!(obs.label, "Oat Crunch");
        assert_eq!(obs.calories, 150.0);
        assert!((obs.sigma_calories - 15.0).abs() < 1e-9);
        assert_eq!(obs.confidence, 0.8);
        let label = obs.nutrition_label.unwrap();
        assert_eq!(label.serving_size, "40 g");
        assert_eq!(label.total_servings, 8.0);
        assert!(obs.priors.is_none());
    }

    #[test]
    fn test_menu_path() {
        let obs = parse_response(
            r#"{"restaurant": "Noodle Bar", "itemName": "Spicy Ramen", "calories": 820}"#,
            AnalysisPath::Menu,
            SOURCE,
        );
        assert_eq!(obs.label, "Spicy Ramen");
        assert_eq!(obs.calories, 820.0);
        assert!((obs.sigma_calories - 123.0).abs() < 1e-9);
        assert_eq!(obs.confidence, 0.7);
        assert_eq!(obs.evidence[2], "Menu");
        assert_eq!(obs.menu_item.unwrap().restaurant, "Noodle Bar");
    }

    #[test]
    fn test_thousands_separators_in_numeric_strings() {
        let geometry = parse_response(
            r#"{"label": "Pizza", "estimatedCalories": "1,200"}"#,
            AnalysisPath::Geometry,
            SOURCE,
        );
        assert_eq!(geometry.calories, 1200.0);
        assert!((geometry.sigma_calories - 240.0).abs() < 1e-9);

        let label = parse_response(
            r#"{"label": "Family Lasagna", "caloriesPerServing": "1,050 kcal"}"#,
            AnalysisPath::Label,
            SOURCE,
        );
        assert_eq!(label.calories, 1050.0);
        assert_eq!(label.nutrition_label.unwrap().calories_per_serving, 1050.0);
    }

    #[test]
    fn test_unreadable_numeric_strings_use_default() {
        for value in ["1.2.3", "5e2x", "about 400", "400-500"] {
            let response = format!(r#"{{"label": "Stew", "estimatedCalories": "{value}"}}"#);
            let obs = parse_response(&response, AnalysisPath::Geometry, SOURCE);
            assert_eq!(obs.calories, 300.0, "value {value:?}");
        }
        assert_eq!(numeric_text("1_000"), Some(1000.0));
        assert_eq!(numeric_text(" 95 "), Some(95.0));
    }

    #[test]
    fn test_negative_calories_use_default() {
        let obs = parse_response(r#"{"calories": -50}"#, AnalysisPath::Menu, SOURCE);
        assert_eq!(obs.calories, 500.0);
        assert_eq!(obs.label, "Restaurant Item");
    }

    #[test]
    fn test_embedded_json_recovered() {
        let obs = parse_response(
            "Sure! Here you go: {\"label\": \"Caesar Salad\", \"estimatedCalories\": 350} Enjoy.",
            AnalysisPath::Geometry,
            SOURCE,
        );
        assert_eq!(obs.label, "Caesar Salad");
        assert_eq!(obs.calories, 350.0);
        assert!(obs.has_evidence(TAG_EMBEDDED));
        assert!(!obs.has_evidence(TAG_FALLBACK));

        let strict = parse_response(r#"{"label": "Apple"}"#, AnalysisPath::Geometry, SOURCE);
        assert!(!strict.has_evidence(TAG_EMBEDDED));
    }

    #[test]
    fn test_malformed_json_recovers_label() {
        let obs = parse_response(
            r#"{"label": "Grilled Salmon", "estimatedCalories": 4"#,
            AnalysisPath::Geometry,
            SOURCE,
        );
        assert_eq!(obs.label, "Grilled Salmon");
        assert_eq!(obs.calories, 300.0);
        assert_eq!(obs.sigma_calories, 60.0);
        assert_eq!(obs.confidence, 0.5);
        assert!(obs.has_evidence(TAG_FALLBACK));
    }

    #[test]
    fn test_placeholder_fragment_is_rejected() {
        let obs = parse_response(r#"{"label": "food", "#, AnalysisPath::Geometry, SOURCE);
        assert_eq!(obs.label, "Unknown Food");
        assert!(obs.has_evidence(TAG_FALLBACK));
    }

    #[test]
    fn test_garbage_decode_failure_per_path() {
        let label = parse_response("I cannot help with that.", AnalysisPath::Label, SOURCE);
        assert_eq!((label.calories, label.sigma_calories, label.confidence), (200.0, 20.0, 0.6));

        let menu = parse_response("", AnalysisPath::Menu, SOURCE);
        assert_eq!((menu.calories, menu.sigma_calories, menu.confidence), (500.0, 75.0, 0.6));
        assert_eq!(menu.evidence.last().map(String::as_str), Some(TAG_FALLBACK));
    }

    #[test]
    fn test_upstream_failure_geometry() {
        let obs = upstream_failure(AnalysisPath::Geometry, SOURCE);
        assert_eq!(obs.calories, 200.0);
        assert_eq!(obs.sigma_calories, 100.0);
        assert_eq!(obs.confidence, 0.3);
        assert_eq!(obs.label, "Unknown Food");
        assert!(obs.has_evidence(TAG_API_FAILED));
        assert_eq!(obs.priors, Some(FoodPriors::default()));
    }

    #[test]
    fn test_upstream_failure_label_and_menu() {
        let cases = [
            (AnalysisPath::Label, 200.0, 20.0, 0.6),
            (AnalysisPath::Menu, 500.0, 75.0, 0.6),
        ];
        for (path, calories, sigma, confidence) in cases {
            let obs = upstream_failure(path, SOURCE);
            assert_eq!(
                (obs.calories, obs.sigma_calories, obs.confidence),
                (calories, sigma, confidence),
                "{path}"
            );
            assert_eq!(obs.evidence.last().map(String::as_str), Some(TAG_API_FAILED));
            assert!(!obs.has_evidence(TAG_FALLBACK));
            assert!(obs.priors.is_none());
        }
    }

    #[test]
    fn test_degraded_results_keep_path_details() {
        let label = decode_failure(AnalysisPath::Label, SOURCE, None);
        let serving = label.nutrition_label.unwrap();
        assert_eq!(serving.serving_size, "1 serving");
        assert_eq!(serving.calories_per_serving, 200.0);
        assert_eq!(serving.total_servings, 1.0);
        assert!(label.menu_item.is_none());

        let menu = upstream_failure(AnalysisPath::Menu, SOURCE);
        let item = menu.menu_item.unwrap();
        assert_eq!(item.restaurant, "Unknown Restaurant");
        assert_eq!(item.item_name, "Unknown Item");
        assert_eq!(item.calories, 500.0);
        assert!(menu.nutrition_label.is_none());

        let geometry = decode_failure(AnalysisPath::Geometry, SOURCE, None);
        assert!(geometry.nutrition_label.is_none() && geometry.menu_item.is_none());
    }

    #[test]
    fn test_non_object_json_falls_through() {
        let obs = parse_response("[1, 2, 3]", AnalysisPath::Geometry, SOURCE);
        assert!(obs.has_evidence(TAG_FALLBACK));
    }
}

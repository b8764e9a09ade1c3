//! Vision-model prompts, one per analysis path
//!
//! Every prompt asks for a single JSON object. Macronutrients are always
//! requested per 100 g of edible portion so downstream code never has to
//! guess the reference mass.

use kcal_types::AnalysisPath;

// ============================================================================
// Shared prompt fragments
// ============================================================================

const MACROS_FIELD: &str = r#"  "macros": {
    "proteinG": number (grams of protein per 100 g),
    "carbsG": number (grams of carbohydrate per 100 g),
    "fatG": number (grams of fat per 100 g)
  }"#;

const JSON_ONLY: &str = "Respond with the JSON object only. No prose, no markdown.";

// ============================================================================
// Path prompts
// ============================================================================

/// Nutrition facts panel reading
pub fn build_label_prompt() -> String {
    format!(
        r#"The image shows a packaged-food nutrition facts panel. Read it and return:
{{
  "label": "product name as printed",
  "servingSize": "serving size text as printed",
  "caloriesPerServing": number,
  "totalServings": number,
  "confidence": number between 0 and 1,
{macros}
}}

Copy numbers exactly as printed; do not estimate values that are legible.
{json_only}"#,
        macros = MACROS_FIELD,
        json_only = JSON_ONLY,
    )
}

/// Restaurant menu item identification
pub fn build_menu_prompt() -> String {
    format!(
        r#"The image shows a dish served at a restaurant. Identify the menu item and return:
{{
  "restaurant": "restaurant name, or the kind of restaurant if unknown",
  "itemName": "menu item name",
  "calories": number (calories for the whole item as served),
  "confidence": number between 0 and 1,
{macros}
}}

{json_only}"#,
        macros = MACROS_FIELD,
        json_only = JSON_ONLY,
    )
}

/// Visual / volumetric estimation for home-prepared or unidentified plates
pub fn build_geometry_prompt() -> String {
    format!(
        r#"You identify foods in photos and estimate their nutrition.

Naming rules for "label":
- Name every food that is visible. For a plate of several foods, build one
  descriptive name such as "Chicken Rice Bowl with Vegetables" or
  "Mixed Fruit Plate (Apple, Kiwi, and Pears)".
- For a single food use its specific name ("Apple", "Chicken Breast").
- Mention preparation or sauce when visible ("Grilled Salmon with Roasted Vegetables").
- Never answer with a generic word such as "food", "meal", "dish" or "home-cooked food".
- Use title case.

Return:
{{
  "label": "descriptive food name",
  "estimatedCalories": number (total calories of the visible portion),
  "density": {{ "mu": number (g/mL, usually 0.7-1.2), "sigma": number (usually 0.1-0.2) }},
  "kcalPerG": {{ "mu": number (kcal per gram, usually 1.0-4.0), "sigma": number (usually 0.1-0.5) }},
  "confidence": number between 0 and 1 (confidence in the identification),
{macros}
}}

{json_only}"#,
        macros = MACROS_FIELD,
        json_only = JSON_ONLY,
    )
}

pub fn build_prompt(path: AnalysisPath) -> String {
    match path {
        AnalysisPath::Label => build_label_prompt(),
        AnalysisPath::Menu => build_menu_prompt(),
        AnalysisPath::Geometry => build_geometry_prompt(),
    }
}

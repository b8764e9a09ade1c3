//! Output formatting module

use std::fmt::Write;

use kcal_domain::{CaptureQualityParameters, CaptureQualityStatus};
use kcal_types::{
    AnalysisObservation, AnalyzeResponse, FusedResult, GeometryEstimate, OutputFormat, Result,
};
use serde_json::json;

pub fn output_analysis(
    output_format: OutputFormat,
    response: &AnalyzeResponse,
    fusion: Option<&(GeometryEstimate, FusedResult)>,
) -> Result<()> {
    if output_format == OutputFormat::Json {
        let content = match fusion {
            Some((geometry, fused)) => serde_json::to_string_pretty(&json!({
                "items": response.items,
                "meta": response.meta,
                "geometry": geometry,
                "fused": fused,
            }))?,
            None => serde_json::to_string_pretty(response)?,
        };
        println!("{}", content);
    } else {
        print!("{}", render_analysis_table(response, fusion));
    }
    Ok(())
}

pub fn render_analysis_table(
    response: &AnalyzeResponse,
    fusion: Option<&(GeometryEstimate, FusedResult)>,
) -> String {
    let mut out = String::new();
    for item in &response.items {
        render_observation(&mut out, item);
    }

    if let Some((geometry, fused)) = fusion {
        let (low, high) = fused.confidence_interval();
        let _ = writeln!(out, "\n--- Fusion ---");
        let _ = writeln!(
            out,
            "Geometry:        {:.0} ± {:.0} kcal ({:.0} mL)",
            geometry.calories, geometry.sigma, geometry.volume_ml
        );
        let _ = writeln!(out, "Fused:           {:.0} ± {:.0} kcal", fused.calories, fused.sigma);
        let _ = writeln!(out, "95% interval:    {:.0} - {:.0} kcal", low.max(0.0), high);
        let _ = writeln!(out, "Evidence:        {}", fused.evidence.join(", "));
    }

    let _ = writeln!(
        out,
        "\nUsed: {} ({} ms)",
        if response.meta.used.is_empty() {
            "-".to_string()
        } else {
            response.meta.used.join(", ")
        },
        response.meta.latency_ms
    );
    out
}

fn render_observation(out: &mut String, item: &AnalysisObservation) {
    let (low, high) = item.confidence_interval();
    let _ = writeln!(out, "\nAnalysis Result");
    let _ = writeln!(out, "===============");
    let _ = writeln!(out, "Food:            {}", item.label);
    let _ = writeln!(out, "Path:            {}", item.path);
    let _ = writeln!(
        out,
        "Calories:        {:.0} ± {:.0} kcal",
        item.calories, item.sigma_calories
    );
    let _ = writeln!(out, "95% interval:    {:.0} - {:.0} kcal", low.max(0.0), high);
    let _ = writeln!(out, "Confidence:      {:.0}%", item.confidence * 100.0);

    if let Some(ref label) = item.nutrition_label {
        let _ = writeln!(
            out,
            "Serving:         {} x {} ({:.0} kcal each)",
            label.serving_size, label.total_servings, label.calories_per_serving
        );
    }
    if let Some(ref menu) = item.menu_item {
        let _ = writeln!(out, "Restaurant:      {}", menu.restaurant);
    }
    if let Some(ref macros) = item.macros {
        let _ = writeln!(
            out,
            "Per 100 g:       P {:.1} g / C {:.1} g / F {:.1} g",
            macros.protein_g, macros.carbs_g, macros.fat_g
        );
    }
    if let Some(ref priors) = item.priors {
        let _ = writeln!(
            out,
            "Priors:          density {:.2}±{:.2} g/mL, {:.2}±{:.2} kcal/g",
            priors.density.mu, priors.density.sigma, priors.kcal_per_g.mu, priors.kcal_per_g.sigma
        );
    }
    let _ = writeln!(out, "Evidence:        {}", item.evidence.join(", "));
}

pub fn output_quality(
    output_format: OutputFormat,
    parameters: &CaptureQualityParameters,
    statuses: &[CaptureQualityStatus],
) -> Result<()> {
    if output_format == OutputFormat::Json {
        let content = serde_json::to_string_pretty(&json!({
            "parameters": parameters,
            "statuses": statuses,
        }))?;
        println!("{}", content);
    } else {
        print!("{}", render_quality_table(statuses));
    }
    Ok(())
}

pub fn render_quality_table(statuses: &[CaptureQualityStatus]) -> String {
    let flag = |b: bool| if b { "yes" } else { "-" };
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:>6}  {:>8}  {:>8}  {:>6}  {:>8}  {:>4}",
        "#", "score", "progress", "parallax", "depth", "tracking", "stop"
    );
    for (i, status) in statuses.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>4}  {:>6.3}  {:>7.0}%  {:>8}  {:>6}  {:>8}  {:>4}",
            i + 1,
            status.score,
            status.progress * 100.0,
            flag(status.meets_parallax),
            flag(status.meets_depth),
            flag(status.meets_tracking),
            flag(status.should_stop)
        );
    }
    match statuses.iter().position(|s| s.should_stop) {
        Some(i) => {
            let _ = writeln!(out, "\nReady to stop at sample {}", i + 1);
        }
        None => {
            let _ = writeln!(out, "\nStop condition not reached");
        }
    }
    out
}

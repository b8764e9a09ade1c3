//! Command handlers

use std::path::{Path, PathBuf};

use kcal_app::config::Config;
use kcal_app::{fuse_with_volume, serve, AnalysisService};
use kcal_domain::{
    CaptureQualityEstimator, CaptureQualityParameters, CaptureQualitySample,
    CaptureQualityStatus, FrameCaptureService,
};
use kcal_infra::{frame_to_image_reference, StillImageCaptureService};
use kcal_types::{AnalysisPath, Error, OutputFormat, Result, VolumeEstimate};
use log::{debug, info};

use crate::cli::{Cli, Commands};
use crate::output::{output_analysis, output_quality};

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let Cli {
        command,
        model,
        format,
        ..
    } = cli;

    match command {
        Commands::Serve { bind } => {
            let mut config = load_config(model)?;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            serve(&config).await
        }

        Commands::Analyze {
            image,
            path,
            volume_ml,
            volume_sigma_ml,
        } => {
            let config = load_config(model)?;
            let volume = match (volume_ml, volume_sigma_ml) {
                (Some(mu), Some(sigma)) => Some(VolumeEstimate::new(mu, sigma)),
                _ => None,
            };
            cmd_analyze(&config, image, path, volume, format).await
        }

        Commands::Quality {
            samples,
            development,
        } => {
            let parameters = if development {
                CaptureQualityParameters::development()
            } else {
                load_config(model)?.capture_quality
            };
            cmd_quality(&samples, parameters, format)
        }

        Commands::Config {
            show,
            init,
            set_model,
            set_bind,
            set_storage,
        } => cmd_config(show, init, set_model, set_bind, set_storage),
    }
}

/// Load config and apply CLI overrides
fn load_config(model: Option<String>) -> Result<Config> {
    let mut config = Config::load()?;
    if let Some(model) = model {
        config.vision.model = model;
    }
    Ok(config)
}

async fn cmd_analyze(
    config: &Config,
    image: PathBuf,
    path: Option<AnalysisPath>,
    volume: Option<VolumeEstimate>,
    output_format: OutputFormat,
) -> Result<()> {
    if let Some(v) = volume {
        if !(v.mu_ml.is_finite() && v.mu_ml > 0.0) {
            return Err(Error::InvalidRequest(format!(
                "volume must be a positive number of mL, got {}",
                v.mu_ml
            )));
        }
    }

    let capture = StillImageCaptureService::new(&image);
    capture.request_permission().await?;
    capture.start_session().await?;
    let frame = capture.capture_frame().await;
    capture.stop_session();
    let frame = frame?;
    debug!(
        "Frame {} captured at {} ({} bytes)",
        frame.id,
        frame.timestamp,
        frame.rgb_image.len()
    );

    let service = AnalysisService::from_config(config)?;
    let response = service
        .analyze_reference(frame_to_image_reference(&frame), path)
        .await?;

    let fusion = match (volume, response.items.first()) {
        (Some(volume), Some(observation)) => Some(fuse_with_volume(observation, volume)),
        _ => None,
    };

    output_analysis(output_format, &response, fusion.as_ref())
}

/// Run samples through a fresh estimator, one status per sample
pub fn replay_samples(
    samples: Vec<CaptureQualitySample>,
    parameters: CaptureQualityParameters,
) -> Vec<CaptureQualityStatus> {
    let mut estimator = CaptureQualityEstimator::new(parameters);
    samples
        .into_iter()
        .map(|sample| estimator.evaluate(sample))
        .collect()
}

fn load_samples(path: &Path) -> Result<Vec<CaptureQualitySample>> {
    let content = std::fs::read_to_string(path)?;
    let samples = serde_json::from_str(&content)?;
    Ok(samples)
}

fn cmd_quality(
    samples_path: &Path,
    parameters: CaptureQualityParameters,
    output_format: OutputFormat,
) -> Result<()> {
    let samples = load_samples(samples_path)?;
    info!(
        "Replaying {} sample(s) from {}",
        samples.len(),
        samples_path.display()
    );
    let statuses = replay_samples(samples, parameters);
    output_quality(output_format, &parameters, &statuses)
}

fn cmd_config(
    show: bool,
    init: bool,
    set_model: Option<String>,
    set_bind: Option<String>,
    set_storage: Option<bool>,
) -> Result<()> {
    if init {
        let path = Config::config_path()?;
        if path.exists() {
            println!("Configuration already exists: {}", path.display());
        } else {
            let path = Config::default().save()?;
            println!("Wrote default configuration to {}", path.display());
        }
    }

    let mut config = Config::load_file()?;
    let mut modified = false;

    if let Some(model) = set_model {
        config.vision.model = model;
        modified = true;
    }

    if let Some(bind) = set_bind {
        config.server.bind = bind;
        modified = true;
    }

    if let Some(enabled) = set_storage {
        config.storage.enabled = enabled;
        modified = true;
    }

    if modified {
        config.save()?;
        println!("Configuration updated");
    }

    if show || (!modified && !init) {
        println!("{}", Config::load()?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kcal_domain::TrackingState;
    use std::io::Write;

    #[test]
    fn test_replay_samples_stops_on_third() {
        let samples = vec![CaptureQualitySample::new(0.30, TrackingState::Normal, 0.70); 3];
        let statuses = replay_samples(samples, CaptureQualityParameters::default());
        let stops: Vec<bool> = statuses.iter().map(|s| s.should_stop).collect();
        assert_eq!(stops, vec![false, false, true]);
        assert!(!statuses[0].meets_tracking);
    }

    #[test]
    fn test_load_samples_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"parallax": 0.1, "trackingState": "limited", "depthCoverage": 0.2}},
                {{"parallax": 0.3, "trackingState": "normal", "depthCoverage": 0.7}}
            ]"#
        )
        .unwrap();

        let samples = load_samples(file.path()).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].tracking_state, TrackingState::Limited);
    }

    #[test]
    fn test_load_samples_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(load_samples(file.path()), Err(Error::Json(_))));
    }
}

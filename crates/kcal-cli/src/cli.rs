//! CLI definition using clap

use clap::{Parser, Subcommand};
use kcal_types::{AnalysisPath, OutputFormat};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kcal-estimator")]
#[command(author = "yuuji")]
#[command(version)]
#[command(about = "Food photo calorie estimation with a vision model")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Model name override
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Output format (json, table)
    #[arg(long, short = 'f', global = true, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP analysis service
    Serve {
        /// Listen address. Uses config value if not specified.
        #[arg(long, short = 'b')]
        bind: Option<String>,
    },

    /// Analyze a single food photo
    Analyze {
        /// Path to image file
        image: PathBuf,

        /// Analysis path (defaults to geometry)
        #[arg(long, short = 'p', value_enum)]
        path: Option<AnalysisPath>,

        /// Measured food volume in mL; enables fusion with geometry
        #[arg(long, requires = "volume_sigma_ml")]
        volume_ml: Option<f64>,

        /// Standard deviation of the measured volume in mL
        #[arg(long, requires = "volume_ml")]
        volume_sigma_ml: Option<f64>,
    },

    /// Replay capture quality samples (JSON array) through the stop gate
    Quality {
        /// Path to samples JSON
        samples: PathBuf,

        /// Use the development tuning preset instead of config values
        #[arg(long)]
        development: bool,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,

        /// Set default model
        #[arg(long)]
        set_model: Option<String>,

        /// Set listen address
        #[arg(long)]
        set_bind: Option<String>,

        /// Enable or disable durable image storage
        #[arg(long)]
        set_storage: Option<bool>,
    },
}

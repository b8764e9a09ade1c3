//! Application service layer - config, request normalization, analysis pipeline, HTTP

pub mod app;
pub mod config;
pub mod normalizer;
pub mod repository;
pub mod server;

pub use app::{fuse_with_volume, AnalysisService};
pub use config::Config;
pub use normalizer::normalize;
pub use server::{router, serve};

//! Configuration management for kcal-estimator
//!
//! Config stored at: ~/.config/kcal-estimator/config.toml
//! Environment variables override the file (see [`Config::apply_env_with`]).

use kcal_domain::CaptureQualityParameters;
use kcal_infra::SupabaseStorageOptions;
use kcal_types::{ConfigError, Result};
use kcal_vision::AnalyzerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub vision: VisionConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub capture_quality: CaptureQualityParameters,
}

/// Multimodal model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f64,
    /// `low`, `high` or `auto`
    pub image_detail: String,
}

impl Default for VisionConfig {
    fn default() -> Self {
        let analyzer = AnalyzerConfig::default();
        Self {
            api_key: None,
            endpoint: analyzer.endpoint,
            model: analyzer.model,
            timeout_secs: analyzer.timeout.as_secs(),
            max_tokens: analyzer.max_tokens,
            temperature: analyzer.temperature,
            image_detail: analyzer.image_detail,
        }
    }
}

/// Durable image store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub enabled: bool,
    /// Supabase project URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_key: Option<String>,
    pub bucket: String,
    pub prefix: String,
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: None,
            service_key: None,
            bucket: kcal_infra::persistence::DEFAULT_BUCKET.to_string(),
            prefix: kcal_infra::persistence::DEFAULT_PREFIX.to_string(),
            timeout_secs: kcal_infra::persistence::DEFAULT_STORAGE_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8787".to_string(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NotFound)?
            .join("kcal-estimator");
        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config file (or defaults) and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env_with(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load the config file only. Use this before `save` so environment
    /// secrets are not written to disk.
    pub fn load_file() -> Result<Self> {
        match Self::config_path() {
            Ok(path) => Self::load_from(&path),
            Err(_) => Ok(Config::default()),
        }
    }

    /// Load from an explicit path; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup. Empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.vision.api_key = Some(key);
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.vision.model = model;
        }
        if let Some(url) = get("SUPABASE_URL") {
            self.storage.url = Some(url);
        }
        if let Some(key) = get("SUPABASE_SERVICE_ROLE_KEY") {
            self.storage.service_key = Some(key);
        }
        if let Some(bucket) = get("KCAL_STORAGE_BUCKET") {
            self.storage.bucket = bucket;
        }
        if let Some(bind) = get("KCAL_BIND") {
            self.server.bind = bind;
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            api_key: self.vision.api_key.clone(),
            endpoint: self.vision.endpoint.clone(),
            model: self.vision.model.clone(),
            timeout: Duration::from_secs(self.vision.timeout_secs.max(1)),
            max_tokens: self.vision.max_tokens,
            temperature: self.vision.temperature,
            image_detail: self.vision.image_detail.clone(),
        }
    }

    /// Storage options, or `None` when storage is disabled or has no URL
    pub fn storage_options(&self) -> Option<SupabaseStorageOptions> {
        if !self.storage.enabled {
            return None;
        }
        let url = self.storage.url.as_deref().filter(|u| !u.trim().is_empty())?;
        Some(SupabaseStorageOptions {
            base_url: url.to_string(),
            service_key: self.storage.service_key.clone(),
            bucket: self.storage.bucket.clone(),
            prefix: self.storage.prefix.clone(),
            timeout: Duration::from_secs(self.storage.timeout_secs.max(1)),
        })
    }
}

fn mask(secret: &Option<String>) -> String {
    match secret {
        Some(s) if !s.is_empty() => {
            let head: String = s.chars().take(4).collect();
            format!("{head}****")
        }
        _ => "(not set)".to_string(),
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Kcal Estimator Configuration")?;
        writeln!(f, "============================")?;
        writeln!(f)?;
        writeln!(f, "Vision endpoint: {}", self.vision.endpoint)?;
        writeln!(f, "Model:           {}", self.vision.model)?;
        writeln!(f, "API key:         {}", mask(&self.vision.api_key))?;
        writeln!(f, "Timeout:         {}s", self.vision.timeout_secs)?;
        writeln!(f, "Image detail:    {}", self.vision.image_detail)?;
        writeln!(f)?;
        writeln!(f, "Storage enabled: {}", self.storage.enabled)?;
        writeln!(
            f,
            "Storage URL:     {}",
            self.storage.url.as_deref().unwrap_or("(not set)")
        )?;
        writeln!(f, "Service key:     {}", mask(&self.storage.service_key))?;
        writeln!(
            f,
            "Bucket/prefix:   {}/{}",
            self.storage.bucket, self.storage.prefix
        )?;
        writeln!(f)?;
        writeln!(f, "Bind address:    {}", self.server.bind)?;
        writeln!(
            f,
            "Capture stop:    score >= {} after {} stable frames",
            self.capture_quality.stop_threshold, self.capture_quality.minimum_stable_frames
        )?;

        if let Ok(path) = Self::config_path() {
            writeln!(f)?;
            writeln!(f, "Config file:     {}", path.display())?;
        }

        Ok(())
    }
}

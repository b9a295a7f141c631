//! Configuration for model management and prediction caching.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration for the model manager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelsConfig {
    /// Maximum number of predictions kept in memory across all models (default: 1,000,000).
    #[serde(default = "default_infer_cache_size")]
    pub infer_cache_size: usize,

    /// Concurrent jobs on regular workers (default: 10).
    #[serde(default = "default_cpu_workers")]
    pub cpu_workers: usize,

    /// Concurrent jobs on accelerated workers (default: 1).
    #[serde(default = "default_gpu_workers")]
    pub gpu_workers: usize,

    /// Overrides the base directory for model artifacts.
    #[serde(default)]
    pub models_dir: Option<PathBuf>,
}

fn default_infer_cache_size() -> usize {
    1_000_000
}

fn default_cpu_workers() -> usize {
    10
}

fn default_gpu_workers() -> usize {
    1
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            infer_cache_size: default_infer_cache_size(),
            cpu_workers: default_cpu_workers(),
            gpu_workers: default_gpu_workers(),
            models_dir: None,
        }
    }
}

/// Errors that can occur while loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid infer cache size: must be greater than 0")]
    InvalidInferCacheSize,

    #[error("Invalid cpu worker count: must be greater than 0")]
    InvalidCpuWorkers,

    #[error("Invalid gpu worker count: must be greater than 0")]
    InvalidGpuWorkers,
}

impl ModelsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.infer_cache_size == 0 {
            return Err(ConfigError::InvalidInferCacheSize);
        }
        if self.cpu_workers == 0 {
            return Err(ConfigError::InvalidCpuWorkers);
        }
        if self.gpu_workers == 0 {
            return Err(ConfigError::InvalidGpuWorkers);
        }
        Ok(())
    }

    pub fn infer_cache_capacity(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.infer_cache_size).ok_or(ConfigError::InvalidInferCacheSize)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    models: Option<ModelsConfig>,
}

/// Load the `[models]` section of `<workspace>/.verdict/config.toml`.
///
/// A missing file or a missing section yields the defaults. A relative
/// `models_dir` is resolved against the workspace root.
pub fn load_models_config(workspace_root: &Path) -> Result<ModelsConfig, ConfigError> {
    let config_path = workspace_root.join(".verdict").join("config.toml");
    if !config_path.exists() {
        return Ok(ModelsConfig::default());
    }

    let content = std::fs::read_to_string(&config_path)?;
    let file: ConfigFile = toml::from_str(&content)?;
    let mut config = file.models.unwrap_or_default();
    config.validate()?;

    if let Some(dir) = config.models_dir.as_mut() {
        if dir.is_relative() {
            *dir = workspace_root.join(&*dir);
        }
    }
    Ok(config)
}

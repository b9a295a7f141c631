//! Command implementations.

pub mod infer;
pub mod models;
pub mod train;

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use verdict_abstraction::Item;
use verdict_models::{ModelLayout, ModelManager, RandomModel, TokioJobRunner, load_models_config};

pub type Manager = ModelManager<RandomModel, TokioJobRunner>;

/// Workspace precedence: `--workspace`, then `VERDICT_WORKSPACE`, then the
/// current directory.
pub fn resolve_workspace(arg: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = arg {
        return Ok(path);
    }
    if let Ok(path) = std::env::var("VERDICT_WORKSPACE") {
        return Ok(PathBuf::from(path));
    }
    std::env::current_dir().context("Failed to determine current directory")
}

pub fn open_manager(workspace: &Path) -> Result<Manager> {
    let config = load_models_config(workspace)
        .with_context(|| format!("Failed to load configuration from {}", workspace.display()))?;
    let models_dir = config
        .models_dir
        .clone()
        .unwrap_or_else(|| ModelLayout::for_workspace_root(workspace).root().to_path_buf());

    let runner = TokioJobRunner::current(&config)?;
    Ok(ModelManager::from_config(RandomModel::new(models_dir), runner, &config)?)
}

/// Parses `key=value`; the value is read as JSON when it parses, else as a string.
pub fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Reads one item per non-empty line of a JSONL file.
pub fn read_items(path: &Path) -> Result<Vec<Item>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut items = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let item: Item = serde_json::from_str(line)
            .with_context(|| format!("Failed to parse {} line {}", path.display(), idx + 1))?;
        items.push(item);
    }
    Ok(items)
}

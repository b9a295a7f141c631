//! Model management commands: status, metadata, list, predictions, export, delete.

use super::Manager;
use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;
use verdict_abstraction::{ModelId, ModelStatus, Prediction};
use verdict_models::cache::load_prediction_store;

fn colored_status(status: ModelStatus) -> colored::ColoredString {
    match status {
        ModelStatus::Ready => status.to_string().green(),
        ModelStatus::Training => status.to_string().yellow(),
        ModelStatus::Error | ModelStatus::Deleted => status.to_string().red(),
    }
}

pub fn status(manager: &Manager, model_id: &str, json_output: bool) -> Result<()> {
    let model_id = ModelId::from(model_id);
    let status = manager.status(&model_id);

    if json_output {
        let out = json!({ "model_id": model_id, "status": status });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}: {}", model_id.to_string().cyan(), colored_status(status));
    }
    Ok(())
}

pub fn metadata(manager: &Manager, model_id: &str) -> Result<()> {
    let model_id = ModelId::from(model_id);
    let metadata = manager
        .metadata(&model_id)
        .with_context(|| format!("Failed to read metadata for model {model_id}"))?;
    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}

pub fn list(manager: &Manager, json_output: bool) -> Result<()> {
    let models = manager.list_models().context("Failed to list models")?;

    if json_output {
        let out: Vec<_> = models
            .iter()
            .map(|(id, status)| json!({ "model_id": id, "status": status }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if models.is_empty() {
        println!("{}", "No models found".dimmed());
        return Ok(());
    }

    println!();
    println!("{}", "Models".bold());
    for (id, status) in &models {
        println!("  {}  {}", id.to_string().cyan(), colored_status(*status));
    }
    println!();
    Ok(())
}

/// Reports the size of the on-disk prediction store for one model.
pub fn predictions(manager: &Manager, model_id: &str) -> Result<()> {
    let model_id = ModelId::from(model_id);
    let path = manager.lifecycle().layout().prediction_store_path(&model_id);
    let store = load_prediction_store::<Prediction>(&path)
        .with_context(|| format!("Failed to read prediction store for model {model_id}"))?;

    println!("{}: {} stored predictions", model_id.to_string().cyan(), store.len());
    Ok(())
}

pub fn export(manager: &Manager, model_id: &str) -> Result<()> {
    let model_id = ModelId::from(model_id);
    let path = manager.export_model(&model_id)?;
    println!("{} {}", "Exported to".green(), path.display());
    Ok(())
}

pub fn delete(manager: &Manager, model_id: &str) -> Result<()> {
    let model_id = ModelId::from(model_id);
    manager
        .delete_model(&model_id)
        .with_context(|| format!("Failed to delete model {model_id}"))?;
    println!("{} {}", "Deleted".green(), model_id.to_string().cyan());
    Ok(())
}

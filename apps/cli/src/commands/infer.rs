//! Inference command implementation.

use super::{Manager, read_items};
use anyhow::{Context, Result, bail};
use colored::Colorize;
use serde_json::json;
use std::path::Path;
use verdict_abstraction::{ModelId, ModelStatus, PredictionRecord};

pub async fn execute(
    manager: &Manager,
    model_id: &str,
    input: &Path,
    use_cache: bool,
    json_output: bool,
) -> Result<()> {
    let model_id = ModelId::from(model_id);
    let status = manager.status(&model_id);
    if status != ModelStatus::Ready {
        bail!("Model {model_id} is not ready (status: {status})");
    }

    let items = read_items(input)?;
    tracing::debug!(model_id = %model_id, items = items.len(), use_cache, "Running inference");

    let predictions = if use_cache {
        manager.infer_async(&model_id, items.clone(), None).wait().await
    } else {
        tokio::task::block_in_place(|| manager.infer(&model_id, &items, false))
    }
    .with_context(|| format!("Inference failed for model {model_id}"))?;

    if json_output {
        let out: Vec<_> = items
            .iter()
            .zip(&predictions)
            .map(|(item, prediction)| {
                json!({
                    "text": item.text(),
                    "label": prediction.label(),
                    "score": prediction.score(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("{} {}", "Predictions for".bold(), model_id.to_string().cyan());
    for (item, prediction) in items.iter().zip(&predictions) {
        let label = if prediction.label() { "positive".green() } else { "negative".red() };
        let text = item.text().unwrap_or("<no text>");
        println!("  {}  {:.4}  {}", label, prediction.score(), text.dimmed());
    }
    println!();
    Ok(())
}

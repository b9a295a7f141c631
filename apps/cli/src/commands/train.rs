//! Training command implementation.

use super::{Manager, read_items};
use anyhow::{Context, Result, bail};
use colored::Colorize;
use serde_json::{Value, json};
use std::path::Path;
use verdict_abstraction::{Language, ModelParams};

pub async fn execute(
    manager: &Manager,
    input: &Path,
    language: &str,
    params: Vec<(String, Value)>,
    json_output: bool,
) -> Result<()> {
    let items = read_items(input)?;
    if items.is_empty() {
        bail!("No training items found in {}", input.display());
    }

    let params: ModelParams = params.into_iter().collect();
    let (model_id, handle) = manager
        .train(items, Language::new(language), params, None)
        .context("Failed to start training")?;

    handle
        .wait()
        .await
        .with_context(|| format!("Training failed for model {model_id}"))?;

    if json_output {
        let out = json!({
            "model_id": model_id,
            "status": manager.status(&model_id),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("{}", "Training complete".bold().green());
    println!("  Model: {}", model_id.to_string().cyan());
    println!("  Use: {}", format!("verdict infer {model_id} --input <items.jsonl>").dimmed());
    println!();
    Ok(())
}

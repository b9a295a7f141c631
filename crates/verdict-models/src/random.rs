//! A deterministic stand-in classifier.
//!
//! `RandomModel` learns nothing: its scores are derived from a hash of the
//! model id and the item text. It is useful for exercising the training and
//! caching machinery end to end without a real learning algorithm.

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::debug;
use verdict_abstraction::{ClassificationModel, Item, ModelId, ModelParams, Prediction};

const MODEL_FILE_NAME: &str = "random_model.json";

#[derive(Debug, Clone)]
pub struct RandomModel {
    models_dir: PathBuf,
}

/// What training persists for a random model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomModelState {
    pub train_size: usize,
    pub positive_ratio: f64,
}

impl RandomModel {
    #[must_use]
    pub fn new(models_dir: PathBuf) -> Self {
        Self { models_dir }
    }

    pub fn model_file(&self, model_id: &ModelId) -> PathBuf {
        self.models_dir.join(model_id.as_str()).join(MODEL_FILE_NAME)
    }

    pub fn load_state(&self, model_id: &ModelId) -> anyhow::Result<RandomModelState> {
        let path = self.model_file(model_id);
        let bytes = std::fs::read(&path).with_context(|| {
            format!("model '{model_id}' has no trained state at {}", path.display())
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Score in `[0, 1]` from the first eight bytes of `sha256(model_id || text)`.
fn hashed_score(model_id: &ModelId, text: &str) -> f64 {
    let mut hasher = Sha256::new();
    hasher.update(model_id.as_str().as_bytes());
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix) as f64 / u64::MAX as f64
}

impl ClassificationModel for RandomModel {
    type Prediction = Prediction;

    fn family(&self) -> &str {
        "RandomModel"
    }

    fn models_dir(&self) -> PathBuf {
        self.models_dir.clone()
    }

    fn train(
        &self,
        model_id: &ModelId,
        train_data: &[Item],
        _params: &ModelParams,
    ) -> anyhow::Result<()> {
        if train_data.is_empty() {
            bail!("training data must not be empty");
        }

        let mut positives = 0usize;
        for (idx, item) in train_data.iter().enumerate() {
            if item.text().is_none() {
                bail!("train item[{idx}] has no text field");
            }
            match item.label() {
                Some(true) => positives += 1,
                Some(false) => {}
                None => bail!("train item[{idx}] has no boolean label field"),
            }
        }

        let state = RandomModelState {
            train_size: train_data.len(),
            positive_ratio: positives as f64 / train_data.len() as f64,
        };
        let path = self.model_file(model_id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_string_pretty(&state)?)?;

        debug!(model_id = %model_id, positive_ratio = state.positive_ratio, "Random model trained");
        Ok(())
    }

    fn infer(&self, model_id: &ModelId, items: &[Item]) -> anyhow::Result<Vec<Prediction>> {
        items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                let text = item
                    .text()
                    .with_context(|| format!("item[{idx}] has no text field"))?;
                let score = hashed_score(model_id, text);
                Ok(Prediction::new(score > 0.5, score))
            })
            .collect()
    }
}

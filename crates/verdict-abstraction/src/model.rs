//! The classification model contract and model-level data types.

use crate::error::{ModelError, ModelResult};
use crate::item::Item;
use crate::prediction::PredictionRecord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Free-form training parameters, persisted with the model metadata.
pub type ModelParams = Map<String, Value>;

/// Unique identifier of one trained model instance.
///
/// Made of the model family tag and a random suffix; it namespaces every
/// on-disk artifact of the model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    #[must_use]
    pub fn generate(family: &str) -> Self {
        Self(format!("{family}_{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ModelId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ModelId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Lifecycle status of a model, derived from marker files on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Training,
    Ready,
    Error,
    /// Never derived from disk; recorded by layers that track deletions.
    Deleted,
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Training => "training",
            Self::Ready => "ready",
            Self::Error => "error",
            Self::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// Language a model was trained for. Names are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Language(String);

impl Language {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_lowercase())
    }

    #[must_use]
    pub fn english() -> Self {
        Self::new("english")
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<String> for Language {
    fn from(name: String) -> Self {
        Self::new(&name)
    }
}

impl From<Language> for String {
    fn from(language: Language) -> Self {
        language.0
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata written once when training starts and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub language: Language,
    #[serde(flatten)]
    pub params: ModelParams,
}

impl ModelMetadata {
    /// A `language` entry in `params` is dropped; the explicit language wins.
    #[must_use]
    pub fn new(language: Language, mut params: ModelParams) -> Self {
        params.remove("language");
        Self { language, params }
    }
}

/// Contract every classifier family implements.
///
/// `train` and `infer` are synchronous; running them off the caller's thread
/// and caching predictions is handled by the model manager.
pub trait ClassificationModel: Send + Sync + 'static {
    /// Prediction record produced by this family.
    type Prediction: PredictionRecord;

    /// Family tag, used as the prefix of generated model ids.
    fn family(&self) -> &str;

    /// Base directory for all artifacts of this model family.
    fn models_dir(&self) -> PathBuf;

    /// Trains `model_id` on items carrying at least `text` and a boolean `label`.
    fn train(
        &self,
        model_id: &ModelId,
        train_data: &[Item],
        params: &ModelParams,
    ) -> anyhow::Result<()>;

    /// Returns exactly one prediction per item, in input order.
    fn infer(&self, model_id: &ModelId, items: &[Item]) -> anyhow::Result<Vec<Self::Prediction>>;

    /// Whether jobs for this family should run on accelerated (GPU) workers.
    fn use_accelerated_worker(&self) -> bool {
        false
    }

    /// Exports a trained model, returning the exported artifact's path.
    fn export(&self, model_id: &ModelId) -> ModelResult<PathBuf> {
        Err(ModelError::NotImplemented {
            model_id: model_id.clone(),
            capability: "export",
            family: self.family().to_string(),
        })
    }
}

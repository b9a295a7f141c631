use crate::model::ModelId;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed error produced by a model family's own train/infer routines.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type ModelResult<T> = std::result::Result<T, ModelError>;

/// Errors surfaced by model lifecycle management and prediction caching.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The model's train routine failed. The model has been marked as failed.
    #[error("model '{model_id}' failed to train: {source}")]
    TrainingFailed {
        model_id: ModelId,
        #[source]
        source: BoxedSource,
    },

    /// The model's infer routine failed. Nothing from the batch was cached.
    #[error("inference with model '{model_id}' failed: {source}")]
    Inference {
        model_id: ModelId,
        #[source]
        source: BoxedSource,
    },

    /// The model's infer routine broke the one-prediction-per-item contract.
    #[error("model '{model_id}' returned {actual} predictions for {expected} items")]
    PredictionCountMismatch {
        model_id: ModelId,
        expected: usize,
        actual: usize,
    },

    /// A prediction store exists on disk but cannot be decoded. It is left in place.
    #[error("prediction store {} is corrupted: {source}", path.display())]
    StoreCorrupted {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The model family does not provide the requested capability.
    #[error("model '{model_id}' does not support {capability}: not implemented for {family}")]
    NotImplemented {
        model_id: ModelId,
        capability: &'static str,
        family: String,
    },

    #[error("no metadata found for model '{model_id}'")]
    MetadataMissing { model_id: ModelId },

    /// Failure reported by the background job runner itself (panic, dropped job).
    #[error("job error: {0}")]
    Job(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    /// Wraps a failure raised inside a model's train routine.
    pub fn training_failed(model_id: &ModelId, source: anyhow::Error) -> Self {
        Self::TrainingFailed {
            model_id: model_id.clone(),
            source: source.into(),
        }
    }

    /// Wraps a failure raised inside a model's infer routine.
    pub fn inference(model_id: &ModelId, source: anyhow::Error) -> Self {
        Self::Inference {
            model_id: model_id.clone(),
            source: source.into(),
        }
    }
}

use std::path::{Path, PathBuf};
use verdict_abstraction::{ModelId, ModelResult};

/// Name of the directory holding one prediction store per model.
pub const PREDICTIONS_DIR_NAME: &str = "predictions";

const METADATA_FILE_NAME: &str = "model_metadata.json";

/// Filesystem layout for model artifacts.
///
/// ```text
/// <models_dir>/<model_id>/train_in_progress_for_<model_id>
/// <models_dir>/<model_id>/train_complete_for_<model_id>
/// <models_dir>/<model_id>/model_metadata.json
/// <models_dir>/predictions/<model_id>.json
/// ```
#[derive(Debug, Clone)]
pub struct ModelLayout {
    root: PathBuf,
}

impl ModelLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create a layout rooted in a Verdict workspace root.
    #[must_use]
    pub fn for_workspace_root(workspace_root: &Path) -> Self {
        Self::new(workspace_root.join(".verdict").join("models"))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn model_dir(&self, model_id: &ModelId) -> PathBuf {
        self.root.join(model_id.as_str())
    }

    #[must_use]
    pub fn in_progress_marker(&self, model_id: &ModelId) -> PathBuf {
        self.model_dir(model_id).join(format!("train_in_progress_for_{model_id}"))
    }

    #[must_use]
    pub fn completed_marker(&self, model_id: &ModelId) -> PathBuf {
        self.model_dir(model_id).join(format!("train_complete_for_{model_id}"))
    }

    #[must_use]
    pub fn metadata_path(&self, model_id: &ModelId) -> PathBuf {
        self.model_dir(model_id).join(METADATA_FILE_NAME)
    }

    #[must_use]
    pub fn predictions_dir(&self) -> PathBuf {
        self.root.join(PREDICTIONS_DIR_NAME)
    }

    #[must_use]
    pub fn prediction_store_path(&self, model_id: &ModelId) -> PathBuf {
        self.predictions_dir().join(format!("{model_id}.json"))
    }

    pub fn ensure_model_dir(&self, model_id: &ModelId) -> ModelResult<()> {
        std::fs::create_dir_all(self.model_dir(model_id))?;
        Ok(())
    }
}

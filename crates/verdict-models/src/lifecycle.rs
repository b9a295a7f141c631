//! Model lifecycle tracking through marker files.
//!
//! A model's status is never stored as a field. It is derived from which of
//! the two marker files exists in the model directory:
//!
//! | `train_complete_for_*` | `train_in_progress_for_*` | status     |
//! |------------------------|---------------------------|------------|
//! | present                | any                       | `Ready`    |
//! | absent                 | present                   | `Training` |
//! | absent                 | absent                    | `Error`    |

use crate::layout::{ModelLayout, PREDICTIONS_DIR_NAME};
use std::fs::File;
use std::io::ErrorKind;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::{debug, error, info, warn};
use verdict_abstraction::{
    ClassificationModel, Item, Language, ModelError, ModelId, ModelMetadata, ModelParams,
    ModelResult, ModelStatus,
};

#[derive(Debug, Clone)]
pub struct ModelLifecycle {
    layout: ModelLayout,
}

impl ModelLifecycle {
    #[must_use]
    pub fn new(layout: ModelLayout) -> Self {
        Self { layout }
    }

    #[must_use]
    pub fn layout(&self) -> &ModelLayout {
        &self.layout
    }

    /// Creates the model directory and writes the in-progress marker.
    pub fn start_training(&self, model_id: &ModelId) -> ModelResult<()> {
        self.layout.ensure_model_dir(model_id)?;
        File::create(self.layout.in_progress_marker(model_id))?;
        debug!(model_id = %model_id, "Marked training as started");
        Ok(())
    }

    /// Starts training and persists the model's metadata.
    ///
    /// If the metadata cannot be written the in-progress marker is removed
    /// again, so the model resolves to `Error` instead of training forever.
    pub fn begin_training(&self, model_id: &ModelId, metadata: &ModelMetadata) -> ModelResult<()> {
        self.start_training(model_id)?;
        if let Err(e) = self.save_metadata(model_id, metadata) {
            warn!(model_id = %model_id, error = %e, "Failed to save metadata, abandoning training");
            self.fail_training(model_id)?;
            return Err(e);
        }
        Ok(())
    }

    /// Writes the completed marker, then removes the in-progress marker.
    pub fn complete_training(&self, model_id: &ModelId) -> ModelResult<()> {
        File::create(self.layout.completed_marker(model_id))?;
        remove_if_present(&self.layout.in_progress_marker(model_id))?;
        debug!(model_id = %model_id, "Marked training as completed");
        Ok(())
    }

    /// Removes the in-progress marker only, leaving the model in `Error`.
    pub fn fail_training(&self, model_id: &ModelId) -> ModelResult<()> {
        remove_if_present(&self.layout.in_progress_marker(model_id))?;
        debug!(model_id = %model_id, "Marked training as failed");
        Ok(())
    }

    /// Derives the status from the markers.
    ///
    /// `complete_training` writes `completed` before removing `in_progress`,
    /// so the markers are sampled in the opposite order: `in_progress` first,
    /// then `completed`. If `completed` is still absent at the second read,
    /// `in_progress` was present at the first one, and a completing model is
    /// never reported as `Error`. `completed` still takes precedence.
    pub fn status(&self, model_id: &ModelId) -> ModelStatus {
        let in_progress = self.layout.in_progress_marker(model_id).is_file();
        let completed = self.layout.completed_marker(model_id).is_file();
        if completed {
            ModelStatus::Ready
        } else if in_progress {
            ModelStatus::Training
        } else {
            ModelStatus::Error
        }
    }

    pub fn save_metadata(&self, model_id: &ModelId, metadata: &ModelMetadata) -> ModelResult<()> {
        let json = serde_json::to_string_pretty(metadata)?;
        std::fs::write(self.layout.metadata_path(model_id), json)?;
        Ok(())
    }

    pub fn metadata(&self, model_id: &ModelId) -> ModelResult<ModelMetadata> {
        let bytes = match std::fs::read(self.layout.metadata_path(model_id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ModelError::MetadataMissing {
                    model_id: model_id.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn language(&self, model_id: &ModelId) -> ModelResult<Language> {
        Ok(self.metadata(model_id)?.language)
    }

    /// Removes the model directory, then its prediction store.
    ///
    /// The two removals are not atomic. A prediction store left behind by an
    /// interrupted delete is never read again unless the same id reappears,
    /// which generated ids rule out.
    pub fn delete(&self, model_id: &ModelId) -> ModelResult<()> {
        info!(model_id = %model_id, "Deleting model");
        let model_dir = self.layout.model_dir(model_id);
        if model_dir.is_dir() {
            std::fs::remove_dir_all(&model_dir)?;
        }

        let store_path = self.layout.prediction_store_path(model_id);
        if store_path.exists() {
            info!(path = %store_path.display(), "Deleting prediction store");
            std::fs::remove_file(&store_path)?;
        }
        Ok(())
    }

    /// Lists every model directory under the layout root with its status.
    pub fn list(&self) -> ModelResult<Vec<(ModelId, ModelStatus)>> {
        let mut out = Vec::new();

        let dir = match std::fs::read_dir(self.layout.root()) {
            Ok(d) => d,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };

        for entry in dir {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name == PREDICTIONS_DIR_NAME {
                continue;
            }
            let model_id = ModelId::from(name);
            let status = self.status(&model_id);
            out.push((model_id, status));
        }

        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }
}

/// Training job body: runs the model's train routine and updates the markers.
///
/// A failure (including a panic) inside `train` or while writing the
/// completed marker marks the model as failed and is returned to the caller.
pub fn train_and_update_status<M: ClassificationModel>(
    model: &M,
    lifecycle: &ModelLifecycle,
    model_id: &ModelId,
    train_data: &[Item],
    params: &ModelParams,
) -> ModelResult<ModelId> {
    info!(model_id = %model_id, train_size = train_data.len(), "Training started");

    let trained = panic::catch_unwind(AssertUnwindSafe(|| {
        model.train(model_id, train_data, params)
    }))
    .unwrap_or_else(|payload| {
        Err(anyhow::anyhow!(
            "train panicked: {}",
            panic_message(payload.as_ref())
        ))
    });

    let outcome = trained
        .map_err(|e| ModelError::training_failed(model_id, e))
        .and_then(|()| lifecycle.complete_training(model_id));

    match outcome {
        Ok(()) => {
            info!(model_id = %model_id, "Training finished");
            Ok(model_id.clone())
        }
        Err(err) => {
            error!(model_id = %model_id, error = %err, "Training failed");
            if let Err(mark_err) = lifecycle.fail_training(model_id) {
                warn!(model_id = %model_id, error = %mark_err, "Failed to mark training as failed");
            }
            Err(err)
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn remove_if_present(path: &Path) -> ModelResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

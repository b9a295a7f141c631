//! Model manager: the entry point for training, inference and lifecycle
//! queries over one classifier family.

use crate::cache::{BoundedCache, CacheStats};
use crate::config::{ConfigError, ModelsConfig};
use crate::coordinator::PredictionCoordinator;
use crate::jobs::{DoneCallback, JobHandle, JobKind, JobRunner, JobSpec};
use crate::layout::ModelLayout;
use crate::lifecycle::{ModelLifecycle, train_and_update_status};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use verdict_abstraction::{
    ClassificationModel, Item, Language, ModelId, ModelMetadata, ModelParams, ModelResult,
    ModelStatus,
};

pub struct ModelManager<M: ClassificationModel, R: JobRunner> {
    model: Arc<M>,
    lifecycle: ModelLifecycle,
    coordinator: Arc<PredictionCoordinator<M>>,
    runner: R,
}

impl<M: ClassificationModel, R: JobRunner> ModelManager<M, R> {
    /// Creates a manager with its own memory cache of `cache_capacity` predictions.
    pub fn new(model: M, runner: R, cache_capacity: NonZeroUsize) -> Self {
        let model = Arc::new(model);
        let layout = ModelLayout::new(model.models_dir());
        let coordinator = PredictionCoordinator::new(
            Arc::clone(&model),
            layout.clone(),
            BoundedCache::new(cache_capacity),
        );
        Self {
            model,
            lifecycle: ModelLifecycle::new(layout),
            coordinator: Arc::new(coordinator),
            runner,
        }
    }

    pub fn from_config(model: M, runner: R, config: &ModelsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(model, runner, config.infer_cache_capacity()?))
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn lifecycle(&self) -> &ModelLifecycle {
        &self.lifecycle
    }

    /// Allocates a model id, marks it as training, persists its metadata and
    /// submits the training job.
    ///
    /// The markers are updated by the job itself when training finishes or
    /// fails; a training failure is also delivered through the returned handle.
    pub fn train(
        &self,
        train_data: Vec<Item>,
        language: Language,
        params: ModelParams,
        on_done: Option<DoneCallback<ModelId>>,
    ) -> ModelResult<(ModelId, JobHandle<ModelId>)> {
        let model_id = ModelId::generate(self.model.family());
        self.lifecycle.begin_training(&model_id, &ModelMetadata::new(language, params.clone()))?;

        info!(
            model_id = %model_id,
            train_size = train_data.len(),
            family = self.model.family(),
            "Submitting training job"
        );

        let model = Arc::clone(&self.model);
        let lifecycle = self.lifecycle.clone();
        let job_model_id = model_id.clone();
        let handle = self.runner.submit(
            JobSpec::new(model_id.as_str(), JobKind::Training, self.model.use_accelerated_worker()),
            Box::new(move || {
                train_and_update_status(&*model, &lifecycle, &job_model_id, &train_data, &params)
            }),
            on_done,
        );

        Ok((model_id, handle))
    }

    /// Cached inference; see [`PredictionCoordinator::infer`].
    pub fn infer(
        &self,
        model_id: &ModelId,
        items: &[Item],
        use_cache: bool,
    ) -> ModelResult<Vec<M::Prediction>> {
        self.coordinator.infer(model_id, items, use_cache)
    }

    /// Runs a cached inference in the background.
    ///
    /// Once the job completes, a regular [`infer`](Self::infer) call for the
    /// same items is served from the cache.
    pub fn infer_async(
        &self,
        model_id: &ModelId,
        items: Vec<Item>,
        on_done: Option<DoneCallback<Vec<M::Prediction>>>,
    ) -> JobHandle<Vec<M::Prediction>> {
        let coordinator = Arc::clone(&self.coordinator);
        let job_model_id = model_id.clone();
        let spec = JobSpec::new(
            model_id.as_str(),
            JobKind::Inference,
            self.model.use_accelerated_worker(),
        );
        self.runner.submit(
            spec,
            Box::new(move || coordinator.infer(&job_model_id, &items, true)),
            on_done,
        )
    }

    pub fn status(&self, model_id: &ModelId) -> ModelStatus {
        self.lifecycle.status(model_id)
    }

    pub fn delete_model(&self, model_id: &ModelId) -> ModelResult<()> {
        self.lifecycle.delete(model_id)
    }

    pub fn language(&self, model_id: &ModelId) -> ModelResult<Language> {
        self.lifecycle.language(model_id)
    }

    pub fn metadata(&self, model_id: &ModelId) -> ModelResult<ModelMetadata> {
        self.lifecycle.metadata(model_id)
    }

    pub fn export_model(&self, model_id: &ModelId) -> ModelResult<PathBuf> {
        self.model.export(model_id)
    }

    pub fn list_models(&self) -> ModelResult<Vec<(ModelId, ModelStatus)>> {
        self.lifecycle.list()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.coordinator.cache_stats()
    }
}

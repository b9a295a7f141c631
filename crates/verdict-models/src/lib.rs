//! Model lifecycle management and prediction caching for Verdict.
//!
//! - Training runs in the background; status is derived from marker files
//!   (`lifecycle`).
//! - Inference is cached in a bounded memory cache and a per-model prediction
//!   store on disk, with at most one computation per item (`coordinator`).
//! - `ModelManager` ties both together over a `ClassificationModel` family
//!   and a `JobRunner`.

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod jobs;
pub mod layout;
pub mod lifecycle;
pub mod manager;
pub mod random;

pub use cache::{BoundedCache, CacheStats, MemoryKey, PredictionStore};
pub use config::{ConfigError, ModelsConfig, load_models_config};
pub use coordinator::PredictionCoordinator;
pub use jobs::{
    DoneCallback, JobCompletion, JobHandle, JobKind, JobRunner, JobSpec, JobWork, TokioJobRunner,
};
pub use layout::ModelLayout;
pub use lifecycle::{ModelLifecycle, train_and_update_status};
pub use manager::ModelManager;
pub use random::{RandomModel, RandomModelState};

//! Classification model abstraction layer for Verdict.
//!
//! This crate defines the contract every classifier family implements
//! (`ClassificationModel`) and the data types that flow through model
//! lifecycle management and prediction caching.

pub mod error;
pub mod item;
pub mod model;
pub mod prediction;

pub use error::{ModelError, ModelResult};
pub use item::{CacheKey, Item, LABEL_FIELD, TEXT_FIELD};
pub use model::{ClassificationModel, Language, ModelId, ModelMetadata, ModelParams, ModelStatus};
pub use prediction::{Prediction, PredictionRecord};

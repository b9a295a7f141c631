//! Two-tier prediction caching.
//!
//! The memory tier is a bounded LRU cache shared by every model of one
//! coordinator; the disk tier is an unbounded prediction store per model.

pub mod bounded;
pub mod store;
pub mod types;

pub use bounded::BoundedCache;
pub use store::{load_prediction_store, save_prediction_store, PredictionStore};
pub use types::{CacheStats, MemoryKey};

//! Prediction cache coordinator.
//!
//! Wraps a model's infer routine with a two-tier cache so that a prediction
//! for a given (model, item) pair is computed at most once:
//!
//! 1. the shared memory cache, probed under the cache lock;
//! 2. the model's prediction store on disk, loaded wholesale on any miss;
//! 3. the model's infer routine, run once per distinct remaining item.
//!
//! Calls for the same model are serialized by a per-model lock held for the
//! whole cached path. The cache lock is only held for cache reads and writes,
//! never across disk I/O or the model's infer routine, so calls for different
//! models run fully in parallel.
//!
//! Loading a store into the memory cache may evict entries of other models
//! once the cache is full. Capacity should be planned for the largest stores
//! expected to be hot at the same time.

use crate::cache::{
    BoundedCache, CacheStats, MemoryKey, load_prediction_store, save_prediction_store,
};
use crate::layout::ModelLayout;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};
use verdict_abstraction::{CacheKey, ClassificationModel, Item, ModelError, ModelId, ModelResult};

type PredictionCache<P> = BoundedCache<MemoryKey, P>;

pub struct PredictionCoordinator<M: ClassificationModel> {
    model: Arc<M>,
    layout: ModelLayout,
    cache: Mutex<PredictionCache<M::Prediction>>,
    /// One lock per model id, created on first use and kept for the
    /// coordinator's lifetime.
    model_locks: Mutex<HashMap<ModelId, Arc<Mutex<()>>>>,
}

impl<M: ClassificationModel> PredictionCoordinator<M> {
    #[must_use]
    pub fn new(model: Arc<M>, layout: ModelLayout, cache: PredictionCache<M::Prediction>) -> Self {
        Self {
            model,
            layout,
            cache: Mutex::new(cache),
            model_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn model(&self) -> &Arc<M> {
        &self.model
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.lock_cache().stats()
    }

    /// Predictions for `items`, one per item and in input order.
    ///
    /// With `use_cache` off the model's infer routine is called directly and
    /// no tier is read or written.
    pub fn infer(
        &self,
        model_id: &ModelId,
        items: &[Item],
        use_cache: bool,
    ) -> ModelResult<Vec<M::Prediction>> {
        if !use_cache {
            info!(
                model_id = %model_id,
                items = items.len(),
                family = self.model.family(),
                "Running inference without cache"
            );
            return self.run_model(model_id, items);
        }

        let keys: Vec<CacheKey> = items.iter().map(Item::cache_key).collect();

        let model_lock = self.model_lock(model_id);
        let _model_guard = model_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut results: Vec<Option<M::Prediction>> = {
            let mut cache = self.lock_cache();
            keys.iter().map(|key| cache.get(&MemoryKey::new(model_id, key))).collect()
        };

        let mut missing = missing_indices(&results);
        if missing.is_empty() {
            debug!(
                model_id = %model_id,
                items = items.len(),
                "All predictions found in memory cache"
            );
            return collect_results(model_id, results);
        }

        info!(
            model_id = %model_id,
            missing = missing.len(),
            "Predictions not in memory cache, loading prediction store from disk"
        );
        let store_path = self.layout.prediction_store_path(model_id);
        let mut store = load_prediction_store::<M::Prediction>(&store_path)?;
        {
            let mut cache = self.lock_cache();
            for (key, prediction) in &store {
                cache.set(MemoryKey::new(model_id, key), prediction.clone());
            }
            // Fall back to the store itself in case loading it evicted its own
            // entries from a full cache.
            for &idx in &missing {
                results[idx] = cache
                    .get(&MemoryKey::new(model_id, &keys[idx]))
                    .or_else(|| store.get(&keys[idx]).cloned());
            }
        }

        missing = missing_indices(&results);
        if missing.is_empty() {
            return collect_results(model_id, results);
        }

        // Distinct items among the misses, in first-seen order.
        let mut unique_slot: HashMap<&CacheKey, usize> = HashMap::new();
        let mut unique_items: Vec<Item> = Vec::new();
        for &idx in &missing {
            unique_slot.entry(&keys[idx]).or_insert_with(|| {
                unique_items.push(items[idx].clone());
                unique_items.len() - 1
            });
        }

        info!(
            model_id = %model_id,
            cached = items.len() - missing.len(),
            to_infer = unique_items.len(),
            duplicates = missing.len() - unique_items.len(),
            cache_size = self.lock_cache().current_size(),
            family = self.model.family(),
            "Running inference for items missing from cache"
        );
        let predictions = self.run_model(model_id, &unique_items)?;
        info!(model_id = %model_id, inferred = predictions.len(), "Finished running inference");

        {
            let mut cache = self.lock_cache();
            for &idx in &missing {
                let prediction = predictions[unique_slot[&keys[idx]]].clone();
                cache.set(MemoryKey::new(model_id, &keys[idx]), prediction.clone());
                store.insert(keys[idx].clone(), prediction.clone());
                results[idx] = Some(prediction);
            }
        }
        save_prediction_store(&store_path, &store)?;

        collect_results(model_id, results)
    }

    /// Calls the model's infer routine and checks the output length.
    fn run_model(&self, model_id: &ModelId, items: &[Item]) -> ModelResult<Vec<M::Prediction>> {
        let predictions =
            self.model.infer(model_id, items).map_err(|e| ModelError::inference(model_id, e))?;
        if predictions.len() != items.len() {
            return Err(ModelError::PredictionCountMismatch {
                model_id: model_id.clone(),
                expected: items.len(),
                actual: predictions.len(),
            });
        }
        Ok(predictions)
    }

    /// Returns the lock for `model_id`, creating it on first use.
    fn model_lock(&self, model_id: &ModelId) -> Arc<Mutex<()>> {
        let mut locks = self.model_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(model_id.clone()).or_default())
    }

    fn lock_cache(&self) -> MutexGuard<'_, PredictionCache<M::Prediction>> {
        // Every write leaves the cache consistent, so a poisoned lock is still usable.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn missing_indices<P>(results: &[Option<P>]) -> Vec<usize> {
    results.iter().enumerate().filter(|(_, p)| p.is_none()).map(|(idx, _)| idx).collect()
}

fn collect_results<P>(model_id: &ModelId, results: Vec<Option<P>>) -> ModelResult<Vec<P>> {
    results
        .into_iter()
        .map(|p| {
            p.ok_or_else(|| {
                ModelError::inference(
                    model_id,
                    anyhow::anyhow!("prediction unresolved after inference"),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use verdict_abstraction::{ModelParams, Prediction};

    struct LengthModel {
        dir: PathBuf,
        calls: AtomicUsize,
        short: bool,
    }

    impl ClassificationModel for LengthModel {
        type Prediction = Prediction;

        fn family(&self) -> &str {
            "LengthModel"
        }

        fn models_dir(&self) -> PathBuf {
            self.dir.clone()
        }

        fn train(&self, _: &ModelId, _: &[Item], _: &ModelParams) -> anyhow::Result<()> {
            Ok(())
        }

        fn infer(&self, _: &ModelId, items: &[Item]) -> anyhow::Result<Vec<Prediction>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut out: Vec<Prediction> = items
                .iter()
                .map(|item| {
                    let len = item.text().map_or(0, str::len) as f64;
                    Prediction::new(len > 3.0, len / 10.0)
                })
                .collect();
            if self.short {
                out.pop();
            }
            Ok(out)
        }
    }

    fn coordinator(
        temp: &TempDir,
        capacity: usize,
        short: bool,
    ) -> PredictionCoordinator<LengthModel> {
        let model = LengthModel {
            dir: temp.path().to_path_buf(),
            calls: AtomicUsize::new(0),
            short,
        };
        PredictionCoordinator::new(
            Arc::new(model),
            ModelLayout::new(temp.path().to_path_buf()),
            BoundedCache::new(NonZeroUsize::new(capacity).unwrap()),
        )
    }

    #[test]
    fn test_model_lock_is_shared_per_model() {
        let temp = TempDir::new().unwrap();
        let coordinator = coordinator(&temp, 8, false);
        let a1 = coordinator.model_lock(&ModelId::from("A"));
        let a2 = coordinator.model_lock(&ModelId::from("A"));
        let b = coordinator.model_lock(&ModelId::from("B"));

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
    }

    #[test]
    fn test_mixed_hits_and_misses_keep_order() {
        let temp = TempDir::new().unwrap();
        let coordinator = coordinator(&temp, 8, false);
        let id = ModelId::from("LengthModel_1");

        coordinator.infer(&id, &[Item::from_text("abcdef")], true).unwrap();
        let items = [Item::from_text("ab"), Item::from_text("abcdef"), Item::from_text("abcd")];
        let preds = coordinator.infer(&id, &items, true).unwrap();

        let scores: Vec<f64> = preds.iter().map(|p| p.score).collect();
        assert_eq!(scores, vec![0.2, 0.6, 0.4]);
        assert_eq!(coordinator.model().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_store_survives_cache_smaller_than_store() {
        let temp = TempDir::new().unwrap();
        let id = ModelId::from("LengthModel_2");
        let items: Vec<Item> = (0..5).map(|i| Item::from_text("x".repeat(i + 1))).collect();

        coordinator(&temp, 16, false).infer(&id, &items, true).unwrap();

        // Fresh coordinator whose cache cannot hold the whole store.
        let small = coordinator(&temp, 2, false);
        let preds = small.infer(&id, &items, true).unwrap();

        assert_eq!(preds.len(), 5);
        assert_eq!(small.model().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_short_model_output_is_rejected() {
        let temp = TempDir::new().unwrap();
        let coordinator = coordinator(&temp, 8, true);
        let id = ModelId::from("LengthModel_3");

        let items = [Item::from_text("a"), Item::from_text("b")];
        let err = coordinator.infer(&id, &items, true).unwrap_err();
        assert!(matches!(err, ModelError::PredictionCountMismatch { expected: 2, actual: 1, .. }));
        assert!(!coordinator.layout.prediction_store_path(&id).exists());
    }

    #[test]
    fn test_empty_batch() {
        let temp = TempDir::new().unwrap();
        let coordinator = coordinator(&temp, 8, false);
        let preds = coordinator.infer(&ModelId::from("LengthModel_4"), &[], true).unwrap();

        assert!(preds.is_empty());
        assert_eq!(coordinator.model().calls.load(Ordering::SeqCst), 0);
    }
}

//! Shared test fixtures: an instrumented stub classifier.

#![allow(dead_code)]

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use verdict_abstraction::{ClassificationModel, Item, ModelId, ModelParams, Prediction};
use verdict_models::{BoundedCache, ModelLayout, PredictionCoordinator};

/// Classifier that counts its calls and can be slowed down or made to fail.
#[derive(Default)]
pub struct StubModel {
    pub dir: PathBuf,
    pub infer_delay: Duration,
    pub infer_calls: AtomicUsize,
    pub inferred_items: AtomicUsize,
    pub fail_infer: AtomicBool,
    pub fail_train: bool,
    pub panic_train: bool,
    /// When set, `train` blocks until a message arrives.
    pub train_gate: Mutex<Option<Receiver<()>>>,
}

impl StubModel {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            ..Default::default()
        }
    }

    pub fn with_delay(dir: &Path, delay: Duration) -> Self {
        Self {
            infer_delay: delay,
            ..Self::new(dir)
        }
    }

    pub fn calls(&self) -> usize {
        self.infer_calls.load(Ordering::SeqCst)
    }

    pub fn items(&self) -> usize {
        self.inferred_items.load(Ordering::SeqCst)
    }
}

/// The prediction the stub produces for `text`.
pub fn expected(text: &str) -> Prediction {
    Prediction::new(text.contains("good"), (text.len() % 10) as f64 / 10.0)
}

impl ClassificationModel for StubModel {
    type Prediction = Prediction;

    fn family(&self) -> &str {
        "StubModel"
    }

    fn models_dir(&self) -> PathBuf {
        self.dir.clone()
    }

    fn train(
        &self,
        _model_id: &ModelId,
        train_data: &[Item],
        _params: &ModelParams,
    ) -> anyhow::Result<()> {
        let gate = self.train_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        if self.panic_train {
            panic!("stub trainer crashed");
        }
        if self.fail_train {
            anyhow::bail!("stub trainer rejected {} items", train_data.len());
        }
        Ok(())
    }

    fn infer(&self, _model_id: &ModelId, items: &[Item]) -> anyhow::Result<Vec<Prediction>> {
        std::thread::sleep(self.infer_delay);
        self.infer_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_infer.load(Ordering::SeqCst) {
            anyhow::bail!("stub back-end unavailable");
        }
        self.inferred_items.fetch_add(items.len(), Ordering::SeqCst);
        Ok(items.iter().map(|item| expected(item.text().unwrap_or_default())).collect())
    }
}

pub fn coordinator(model: StubModel, capacity: usize) -> PredictionCoordinator<StubModel> {
    let layout = ModelLayout::new(model.dir.clone());
    PredictionCoordinator::new(
        Arc::new(model),
        layout,
        BoundedCache::new(NonZeroUsize::new(capacity).unwrap()),
    )
}

pub fn texts(values: &[&str]) -> Vec<Item> {
    values.iter().map(|t| Item::from_text(*t)).collect()
}

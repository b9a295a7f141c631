//! Integration tests for the model manager over the tokio job runner.

mod common;

use common::{StubModel, texts};
use serde_json::json;
use std::num::NonZeroUsize;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use verdict_abstraction::{
    Item, Language, ModelError, ModelId, ModelParams, ModelResult, ModelStatus,
};
use verdict_models::{ModelManager, ModelsConfig, RandomModel, TokioJobRunner};

fn runner() -> TokioJobRunner {
    TokioJobRunner::new(tokio::runtime::Handle::current(), 4, 1)
}

fn capacity() -> NonZeroUsize {
    NonZeroUsize::new(1000).unwrap()
}

fn random_manager(temp: &TempDir) -> ModelManager<RandomModel, TokioJobRunner> {
    ModelManager::new(RandomModel::new(temp.path().to_path_buf()), runner(), capacity())
}

fn train_data() -> Vec<Item> {
    vec![
        Item::labeled("good product", true),
        Item::labeled("bad product", false).with_field("source", "review"),
    ]
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_train_random_model_to_ready() {
    let temp = TempDir::new().unwrap();
    let manager = random_manager(&temp);

    let mut params = ModelParams::new();
    params.insert("epochs".to_string(), json!(2));
    let (model_id, handle) =
        manager.train(train_data(), Language::new("English"), params, None).unwrap();

    assert!(model_id.as_str().starts_with("RandomModel_"));
    assert_eq!(handle.wait().await.unwrap(), model_id);
    assert_eq!(manager.status(&model_id), ModelStatus::Ready);
    assert_eq!(manager.language(&model_id).unwrap(), Language::english());
    assert_eq!(manager.metadata(&model_id).unwrap().params.get("epochs"), Some(&json!(2)));
    assert_eq!(manager.model().load_state(&model_id).unwrap().train_size, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_status_is_training_while_job_runs() {
    let temp = TempDir::new().unwrap();
    let (release, gate) = mpsc::channel();
    let model = StubModel {
        train_gate: Mutex::new(Some(gate)),
        ..StubModel::new(temp.path())
    };
    let manager = ModelManager::new(model, runner(), capacity());

    let (model_id, handle) =
        manager.train(train_data(), Language::english(), ModelParams::new(), None).unwrap();
    assert_eq!(manager.status(&model_id), ModelStatus::Training);

    release.send(()).unwrap();
    handle.wait().await.unwrap();
    assert_eq!(manager.status(&model_id), ModelStatus::Ready);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_training_failure_is_marked_and_reraised() {
    let temp = TempDir::new().unwrap();
    let model = StubModel {
        fail_train: true,
        ..StubModel::new(temp.path())
    };
    let manager = ModelManager::new(model, runner(), capacity());

    let outcome: Arc<Mutex<Option<bool>>> = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&outcome);
    let (model_id, handle) = manager
        .train(
            train_data(),
            Language::english(),
            ModelParams::new(),
            Some(Box::new(move |result: &ModelResult<ModelId>| {
                *seen.lock().unwrap() = Some(result.is_ok());
            })),
        )
        .unwrap();

    let err = handle.wait().await.unwrap_err();
    assert!(matches!(err, ModelError::TrainingFailed { .. }));
    assert!(err.to_string().contains("rejected 2 items"));
    assert_eq!(*outcome.lock().unwrap(), Some(false));
    assert_eq!(manager.status(&model_id), ModelStatus::Error);
    assert!(manager.lifecycle().layout().model_dir(&model_id).is_dir());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_callback_does_not_hide_successful_training() {
    let temp = TempDir::new().unwrap();
    let manager = ModelManager::new(StubModel::new(temp.path()), runner(), capacity());

    let (model_id, handle) = manager
        .train(
            train_data(),
            Language::english(),
            ModelParams::new(),
            Some(Box::new(|_: &ModelResult<ModelId>| panic!("callback bug"))),
        )
        .unwrap();

    assert_eq!(handle.wait().await.unwrap(), model_id);
    assert_eq!(manager.status(&model_id), ModelStatus::Ready);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_training_panic_is_marked_as_failure() {
    let temp = TempDir::new().unwrap();
    let model = StubModel {
        panic_train: true,
        ..StubModel::new(temp.path())
    };
    let manager = ModelManager::new(model, runner(), capacity());

    let (model_id, handle) =
        manager.train(train_data(), Language::english(), ModelParams::new(), None).unwrap();

    let err = handle.wait().await.unwrap_err();
    assert!(err.to_string().contains("stub trainer crashed"));
    assert_eq!(manager.status(&model_id), ModelStatus::Error);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_infer_async_populates_cache() {
    let temp = TempDir::new().unwrap();
    let manager = ModelManager::new(StubModel::new(temp.path()), runner(), capacity());
    let id = ModelId::from("StubModel_async");
    let items = texts(&["good a", "b", "good a"]);

    let background = manager.infer_async(&id, items.clone(), None).wait().await.unwrap();
    assert_eq!(manager.model().calls(), 1);

    let cached = manager.infer(&id, &items, true).unwrap();
    assert_eq!(background, cached);
    assert_eq!(manager.model().calls(), 1);
    assert_eq!(manager.cache_stats().cache_size, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_random_model_end_to_end_inference() {
    let temp = TempDir::new().unwrap();
    let manager = random_manager(&temp);
    let (model_id, handle) =
        manager.train(train_data(), Language::english(), ModelParams::new(), None).unwrap();
    handle.wait().await.unwrap();

    let items = texts(&["first", "second"]);
    let uncached = manager.infer(&model_id, &items, false).unwrap();
    let cached = manager.infer_async(&model_id, items, None).wait().await.unwrap();
    assert_eq!(uncached, cached);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_list_and_delete_models() {
    let temp = TempDir::new().unwrap();
    let manager = random_manager(&temp);
    let (first, h1) =
        manager.train(train_data(), Language::english(), ModelParams::new(), None).unwrap();
    let (second, h2) =
        manager.train(train_data(), Language::english(), ModelParams::new(), None).unwrap();
    h1.wait().await.unwrap();
    h2.wait().await.unwrap();
    manager.infer(&first, &texts(&["x"]), true).unwrap();

    let listed = manager.list_models().unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|(_, status)| *status == ModelStatus::Ready));

    manager.delete_model(&first).unwrap();

    let listed = manager.list_models().unwrap();
    assert_eq!(listed, vec![(second, ModelStatus::Ready)]);
    assert_eq!(manager.status(&first), ModelStatus::Error);
    assert!(!manager.lifecycle().layout().prediction_store_path(&first).exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_export_not_supported() {
    let temp = TempDir::new().unwrap();
    let manager = random_manager(&temp);

    let err = manager.export_model(&ModelId::from("RandomModel_x")).unwrap_err();
    assert!(matches!(err, ModelError::NotImplemented { capability: "export", .. }));
    assert!(err.to_string().contains("RandomModel_x"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_from_config_rejects_invalid_config() {
    let temp = TempDir::new().unwrap();
    let config = ModelsConfig {
        infer_cache_size: 0,
        ..Default::default()
    };
    let model = RandomModel::new(temp.path().to_path_buf());
    let manager = ModelManager::from_config(model, runner(), &config);
    assert!(manager.is_err());
}

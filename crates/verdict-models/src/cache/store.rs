//! Prediction store codec: one JSON file per model.
//!
//! The file is a JSON object mapping each item's canonical cache key to its
//! prediction record. Saves always rewrite the whole file.

use std::collections::BTreeMap;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;
use verdict_abstraction::{CacheKey, ModelError, ModelResult, PredictionRecord};

/// Every prediction ever computed for one model.
pub type PredictionStore<P> = BTreeMap<CacheKey, P>;

/// Loads a prediction store. A missing file is an empty store.
///
/// A file that exists but cannot be decoded is reported as
/// [`ModelError::StoreCorrupted`] and left untouched on disk.
pub fn load_prediction_store<P: PredictionRecord>(path: &Path) -> ModelResult<PredictionStore<P>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(PredictionStore::new()),
        Err(e) => return Err(e.into()),
    };

    let store: PredictionStore<P> = serde_json::from_slice(&bytes)
        .map_err(|source| ModelError::StoreCorrupted {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), entries = store.len(), "Loaded prediction store");
    Ok(store)
}

/// Writes the whole store, replacing the previous file atomically.
pub fn save_prediction_store<P: PredictionRecord>(
    path: &Path,
    store: &PredictionStore<P>,
) -> ModelResult<()> {
    let dir = path.parent().ok_or_else(|| {
        ModelError::Config(format!("prediction store path has no parent: {}", path.display()))
    })?;
    std::fs::create_dir_all(dir)?;

    let tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer(&mut writer, store)?;
        writer.flush()?;
    }
    tmp.persist(path).map_err(|e| ModelError::Io(e.error))?;

    debug!(path = %path.display(), entries = store.len(), "Saved prediction store");
    Ok(())
}

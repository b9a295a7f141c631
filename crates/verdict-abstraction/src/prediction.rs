use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A prediction produced by a classification model.
///
/// Model families that emit richer predictions define their own record type
/// with extra fields; every field must survive a trip through the prediction
/// store on disk.
pub trait PredictionRecord:
    Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    fn label(&self) -> bool;

    /// Confidence in `[0, 1]`.
    fn score(&self) -> f64;
}

/// The base binary prediction: a label and its score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: bool,
    pub score: f64,
}

impl Prediction {
    /// Creates a prediction, clamping `score` into `[0, 1]`.
    #[must_use]
    pub fn new(label: bool, score: f64) -> Self {
        Self {
            label,
            score: score.clamp(0.0, 1.0),
        }
    }
}

impl PredictionRecord for Prediction {
    fn label(&self) -> bool {
        self.label
    }

    fn score(&self) -> f64 {
        self.score
    }
}

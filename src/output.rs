use std::process::ExitCode;

use ndarray::prelude::*;
use serde::Serialize;

use crate::errors::{ClassifyError, Result};

/// Scores of a single forward pass together with the winning class.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub predictions: Array2<f32>,
    pub predicted_class: usize,
    pub confidence: f32,
}

impl Classification {
    pub fn from_scores(predictions: Array2<f32>) -> Result<Self> {
        let row = predictions
            .rows()
            .into_iter()
            .next()
            .ok_or_else(|| ClassifyError::validation("model output", "has no batch rows"))?;
        let (predicted_class, confidence) = argmax(&row.to_vec())
            .ok_or_else(|| ClassifyError::validation("model output", "has no class scores"))?;

        Ok(Self {
            predictions,
            predicted_class,
            confidence,
        })
    }
}

/// Index and value of the largest score.
///
/// Ties resolve to the first occurrence. A NaN wins at its first position.
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    let mut scores = scores.iter().copied().enumerate();
    let mut best = scores.next()?;
    for (index, score) in scores {
        if best.1.is_nan() {
            break;
        }
        if score.is_nan() || score > best.1 {
            best = (index, score);
        }
    }
    Some(best)
}

/// The JSON document written to standard output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InferenceOutput {
    Success {
        success: bool,
        predictions: Vec<Vec<f32>>,
        predicted_class: usize,
        confidence: f32,
    },
    Error {
        error: String,
    },
}

impl InferenceOutput {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }

    /// Serializes the document as a single line of JSON.
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({ "error": format!("failed to serialize result: {e}") }).to_string()
        })
    }
}

impl From<Classification> for InferenceOutput {
    fn from(classification: Classification) -> Self {
        Self::Success {
            success: true,
            predictions: classification
                .predictions
                .rows()
                .into_iter()
                .map(|row| row.to_vec())
                .collect(),
            predicted_class: classification.predicted_class,
            confidence: classification.confidence,
        }
    }
}

impl From<ClassifyError> for InferenceOutput {
    fn from(err: ClassifyError) -> Self {
        Self::error(err.chain_message())
    }
}

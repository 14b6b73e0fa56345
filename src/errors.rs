use std::error::Error as StdError;

use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Structured error types for the classifier.
///
/// Each variant names the stage that failed. The underlying cause stays
/// reachable through [`std::error::Error::source`], which is how
/// [`ClassifyError::chain_message`] builds the text placed into the error
/// document.
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("Image processing error: {operation} failed (file: {path})")]
    ImageProcessing {
        path: String,
        operation: String,
        #[source]
        source: BoxError,
    },

    #[error("Model error: {operation} failed")]
    Model {
        operation: String,
        #[source]
        source: BoxError,
    },

    #[error("Validation error: {field} {reason}")]
    Validation { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ClassifyError>;

impl ClassifyError {
    pub fn model(operation: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Model {
            operation: operation.into(),
            source: source.into(),
        }
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Renders this error followed by every source, joined with `": "`.
    pub fn chain_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(err) = source {
            message.push_str(": ");
            message.push_str(&err.to_string());
            source = err.source();
        }
        message
    }
}

/// Convert ONNX Runtime errors to model errors.
impl From<ort::Error> for ClassifyError {
    fn from(err: ort::Error) -> Self {
        Self::model("ort operation", err)
    }
}

/// Shape errors come out of tensor reshaping around inference, so they are
/// reported as model errors.
impl From<ndarray::ShapeError> for ClassifyError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::model("tensor shape conversion", err)
    }
}

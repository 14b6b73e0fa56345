use crate::errors::Result;
use crate::model::InputShape;
use ndarray::prelude::*;

/// Abstraction over an image classification model.
///
/// The runner depends only on this trait, so tests can swap in a model that
/// never touches ONNX Runtime.
pub trait ImageClassificationModel {
    /// Spatial size and channel layout the model expects for its input.
    fn input_shape(&self) -> InputShape;

    /// Runs a forward pass and returns one row of class scores per batch item.
    fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array2<f32>>;
}

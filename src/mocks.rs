use crate::errors::{ClassifyError, Result};
use crate::model::{InputShape, TensorLayout};
use crate::traits::ImageClassificationModel;
use ndarray::prelude::*;

/// Model stand-in for tests: checks the tensor it receives and returns fixed
/// scores.
#[derive(Debug, Clone)]
pub struct MockClassificationModel {
    pub input_shape: InputShape,
    pub scores: Vec<f32>,
}

impl MockClassificationModel {
    pub const fn new(input_shape: InputShape, scores: Vec<f32>) -> Self {
        Self {
            input_shape,
            scores,
        }
    }
}

impl ImageClassificationModel for MockClassificationModel {
    fn input_shape(&self) -> InputShape {
        self.input_shape
    }

    fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array2<f32>> {
        let expected = match self.input_shape.layout {
            TensorLayout::Nhwc => [
                1,
                self.input_shape.height as usize,
                self.input_shape.width as usize,
                3,
            ],
            TensorLayout::Nchw => [
                1,
                3,
                self.input_shape.height as usize,
                self.input_shape.width as usize,
            ],
        };
        if tensor.shape() != &expected[..] {
            return Err(ClassifyError::validation(
                "input tensor",
                format!("expected shape {expected:?}, got {:?}", tensor.shape()),
            ));
        }

        Ok(Array2::from_shape_vec((1, self.scores.len()), self.scores.clone())?)
    }
}

/// A 224x224 channels-last model with three classes.
pub fn create_mock_model() -> MockClassificationModel {
    MockClassificationModel::new(InputShape::nhwc(224, 224), vec![0.1, 0.7, 0.2])
}

use std::path::Path;

use crate::{
    errors::{ClassifyError, Result},
    traits::ImageClassificationModel,
};
use image::{imageops, imageops::FilterType, RgbImage};
use ndarray::prelude::*;
use nshare::AsNdarray3;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
    value::TensorRef,
};
use parking_lot::Mutex;
use tracing::debug;

/// Order of the axes of the model's image input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    /// `(batch, height, width, channels)`, the Keras convention.
    Nhwc,
    /// `(batch, channels, height, width)`, the PyTorch export convention.
    Nchw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputShape {
    pub height: u32,
    pub width: u32,
    pub layout: TensorLayout,
}

impl InputShape {
    pub const fn nhwc(height: u32, width: u32) -> Self {
        Self {
            height,
            width,
            layout: TensorLayout::Nhwc,
        }
    }

    pub const fn nchw(height: u32, width: u32) -> Self {
        Self {
            height,
            width,
            layout: TensorLayout::Nchw,
        }
    }

    /// Reads the expected spatial size from a rank-4 input declaration.
    ///
    /// Channels-last is assumed unless only axis 1 holds the 3 color channels.
    pub fn from_dims(dims: &[i64]) -> Result<Self> {
        let [_, d1, d2, d3] = dims else {
            return Err(ClassifyError::validation(
                "model input",
                format!("must have rank 4, got shape {dims:?}"),
            ));
        };

        let (height, width, layout) = if *d3 != 3 && *d1 == 3 {
            (*d2, *d3, TensorLayout::Nchw)
        } else {
            (*d1, *d2, TensorLayout::Nhwc)
        };

        let dim = |value: i64, name: &str| {
            u32::try_from(value)
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| {
                    ClassifyError::validation(
                        format!("model input {name}"),
                        format!("must be a fixed positive size, got {value} in shape {dims:?}"),
                    )
                })
        };

        Ok(Self {
            height: dim(height, "height")?,
            width: dim(width, "width")?,
            layout,
        })
    }
}

pub struct Model {
    input_shape: InputShape,
    input_name: String,
    output_name: String,
    session: Mutex<Session>,
}

impl Model {
    pub fn new(model_path: &Path, num_threads: Option<u16>) -> Result<Self> {
        let mut builder = SessionBuilder::new()
            .map_err(|e| ClassifyError::model("session builder initialization", e))?
            .with_execution_providers([
                TensorRTExecutionProvider::default().build(),
                CUDAExecutionProvider::default().build(),
            ])
            .map_err(|e| ClassifyError::model("execution provider setup", e))?;

        if let Some(threads) = num_threads {
            builder = builder
                .with_intra_threads(usize::from(threads))
                .map_err(|e| ClassifyError::model("intra-op thread setup", e))?;
        }

        let session = builder.commit_from_file(model_path).map_err(|e| {
            ClassifyError::model(format!("load model file {}", model_path.display()), e)
        })?;

        let input = session.inputs.first().ok_or_else(|| {
            ClassifyError::validation("model", "declares no inputs")
        })?;
        let dims = input.input_type.tensor_shape().ok_or_else(|| {
            ClassifyError::validation(
                format!("model input `{}`", input.name),
                "is not a tensor",
            )
        })?;
        let input_shape = InputShape::from_dims(dims)?;
        let input_name = input.name.clone();

        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| ClassifyError::validation("model", "declares no outputs"))?;

        debug!(
            path = %model_path.display(),
            input = %input_name,
            output = %output_name,
            ?input_shape,
            "model loaded"
        );

        Ok(Self {
            input_shape,
            input_name,
            output_name,
            session: Mutex::new(session),
        })
    }
}

impl ImageClassificationModel for Model {
    fn input_shape(&self) -> InputShape {
        self.input_shape
    }

    fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array2<f32>> {
        let mut session = self.session.lock();
        let outputs = session.run(ort::inputs![
            self.input_name.as_str() => TensorRef::from_array_view(&tensor.as_standard_layout())?
        ])?;
        let scores = outputs[self.output_name.as_str()].try_extract_array::<f32>()?;
        debug!(shape = ?scores.shape(), "prediction finished");

        score_row(scores)
    }
}

/// Flattens a model output into a single row of class scores.
///
/// Only one image is ever fed, so every axis (batch included, if the model
/// declares one) collapses into that row.
pub fn score_row(scores: ArrayViewD<f32>) -> Result<Array2<f32>> {
    let len = scores.len();
    Ok(scores
        .as_standard_layout()
        .into_owned()
        .into_shape_with_order((1, len))?)
}

/// Turns an RGB image into the `[0, 1]`-scaled input tensor with a leading
/// batch axis of size 1.
pub fn preprocess(image: &RgbImage, shape: InputShape) -> Array4<f32> {
    let image = imageops::resize(image, shape.width, shape.height, FilterType::CatmullRom);
    let chw = image.as_ndarray3();
    let view = match shape.layout {
        TensorLayout::Nchw => chw,
        TensorLayout::Nhwc => chw.permuted_axes([1, 2, 0]),
    };
    view.insert_axis(Axis(0))
        .mapv(|v| f32::from(v) / 255.0)
        .as_standard_layout()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_input_shape_channels_last() {
        let shape = InputShape::from_dims(&[-1, 224, 192, 3]).unwrap();
        assert_eq!(shape, InputShape::nhwc(224, 192));
    }

    #[test]
    fn test_input_shape_channels_first() {
        let shape = InputShape::from_dims(&[1, 3, 32, 48]).unwrap();
        assert_eq!(shape, InputShape::nchw(32, 48));
    }

    #[test]
    fn test_input_shape_ambiguous_defaults_to_channels_last() {
        let shape = InputShape::from_dims(&[1, 3, 3, 3]).unwrap();
        assert_eq!(shape, InputShape::nhwc(3, 3));

        let shape = InputShape::from_dims(&[1, 28, 28, 1]).unwrap();
        assert_eq!(shape, InputShape::nhwc(28, 28));
    }

    #[test]
    fn test_input_shape_rejects_dynamic_dims() {
        let err = InputShape::from_dims(&[-1, -1, -1, 3]).unwrap_err();
        assert!(matches!(err, ClassifyError::Validation { .. }));
        assert!(err.to_string().contains("height"));
    }

    #[test]
    fn test_input_shape_rejects_wrong_rank() {
        let err = InputShape::from_dims(&[1, 1000]).unwrap_err();
        assert!(err.to_string().contains("rank 4"));
    }

    #[test]
    fn test_score_row_without_batch_axis() -> Result<()> {
        let scores = array![0.1f32, 0.6, 0.3].into_dyn();
        let row = score_row(scores.view())?;

        assert_eq!(row, array![[0.1f32, 0.6, 0.3]]);
        Ok(())
    }

    #[test]
    fn test_score_row_flattens_trailing_axes() -> Result<()> {
        let scores = Array4::<f32>::from_shape_vec((1, 1, 1, 4), vec![0.4, 0.1, 0.2, 0.3])?;
        let row = score_row(scores.view().into_dyn())?;
        assert_eq!(row, array![[0.4f32, 0.1, 0.2, 0.3]]);

        let scores = array![[0.2f32, 0.8]].into_dyn();
        assert_eq!(score_row(scores.view())?, array![[0.2f32, 0.8]]);
        Ok(())
    }

    #[test]
    fn test_score_row_from_permuted_output() -> Result<()> {
        let scores = array![[1.0f32], [2.0], [3.0]].reversed_axes().into_dyn();
        assert_eq!(score_row(scores.view())?, array![[1.0f32, 2.0, 3.0]]);
        Ok(())
    }

    #[test]
    fn test_preprocess_channels_last() {
        let image = RgbImage::from_pixel(10, 20, Rgb([255, 0, 51]));
        let tensor = preprocess(&image, InputShape::nhwc(4, 6));

        assert_eq!(tensor.shape(), &[1, 4, 6, 3]);
        for pixel in tensor.lanes(Axis(3)) {
            assert_eq!(pixel.to_vec(), vec![1.0f32, 0.0, 0.2]);
        }
    }

    #[test]
    fn test_preprocess_channels_first() {
        let image = RgbImage::from_pixel(8, 8, Rgb([0, 255, 0]));
        let tensor = preprocess(&image, InputShape::nchw(5, 7));

        assert_eq!(tensor.shape(), &[1, 3, 5, 7]);
        assert!(tensor.slice(s![0, 0, .., ..]).iter().all(|v| *v == 0.0));
        assert!(tensor.slice(s![0, 1, .., ..]).iter().all(|v| *v == 1.0));
        assert!(tensor.slice(s![0, 2, .., ..]).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_preprocess_values_in_unit_range() {
        let image = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 255]));
        let tensor = preprocess(&image, InputShape::nhwc(9, 9));

        assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
    }
}

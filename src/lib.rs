pub mod config;
pub mod errors;
pub mod model;
pub mod output;
pub mod traits;

pub mod mocks;

use std::path::Path;

use tracing::debug;

pub use config::Config;
pub use errors::{ClassifyError, Result};
pub use model::{InputShape, Model, TensorLayout};
pub use output::{Classification, InferenceOutput};
pub use traits::*;

#[cfg(test)]
pub use mocks::*;

pub struct InferenceRunner<M: ImageClassificationModel> {
    model: M,
}

impl<M: ImageClassificationModel> InferenceRunner<M> {
    pub const fn new(model: M) -> Self {
        Self { model }
    }

    /// Loads `image_path`, runs it through the model and picks the top class.
    pub fn classify(&self, image_path: &Path) -> Result<Classification> {
        let image = image::open(image_path)
            .map_err(|e| ClassifyError::ImageProcessing {
                path: image_path.display().to_string(),
                operation: "image loading".to_string(),
                source: Box::new(e),
            })?
            .into_rgb8();

        let shape = self.model.input_shape();
        debug!(
            width = image.width(),
            height = image.height(),
            ?shape,
            "preprocessing image"
        );
        let tensor = model::preprocess(&image, shape);

        let scores = self.model.predict(tensor.view())?;
        Classification::from_scores(scores)
    }
}

impl InferenceRunner<Model> {
    pub fn with_onnx_model(config: &Config) -> Result<Self> {
        let model = Model::new(&config.model_path, config.num_threads)?;
        Ok(Self::new(model))
    }
}

/// Runs the whole pipeline; every failure becomes an error document.
pub fn run(config: &Config) -> InferenceOutput {
    let result = InferenceRunner::with_onnx_model(config)
        .and_then(|runner| runner.classify(&config.image_path));

    match result {
        Ok(classification) => {
            debug!(
                predicted_class = classification.predicted_class,
                confidence = classification.confidence,
                "classification finished"
            );
            classification.into()
        }
        Err(err) => {
            debug!(error = %err.chain_message(), "classification failed");
            err.into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, RgbaImage};
    use tempfile::TempDir;

    #[test]
    fn test_classify_with_mock() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let image_path = temp_dir.path().join("cat.png");
        RgbImage::from_pixel(64, 48, Rgb([10, 20, 30])).save(&image_path)?;

        let runner = InferenceRunner::new(create_mock_model());
        let classification = runner.classify(&image_path)?;

        assert_eq!(classification.predicted_class, 1);
        assert_eq!(classification.confidence, 0.7);
        assert_eq!(classification.predictions.shape(), &[1, 3]);
        Ok(())
    }

    #[test]
    fn test_classify_converts_rgba_to_rgb() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let temp_dir = TempDir::new()?;
        let image_path = temp_dir.path().join("icon.png");
        RgbaImage::new(16, 16).save(&image_path)?;

        let mock = MockClassificationModel::new(InputShape::nchw(8, 8), vec![0.9, 0.1]);
        let classification = InferenceRunner::new(mock).classify(&image_path)?;

        assert_eq!(classification.predicted_class, 0);
        Ok(())
    }

    #[test]
    fn test_classify_missing_image() {
        let runner = InferenceRunner::new(create_mock_model());
        let err = runner
            .classify(Path::new("does/not/exist.jpg"))
            .unwrap_err();

        assert!(matches!(err, ClassifyError::ImageProcessing { .. }));
        assert!(err.chain_message().contains("does/not/exist.jpg"));
    }

    #[test]
    fn test_run_with_missing_model() {
        let config = Config::new("does/not/exist.onnx", "does/not/exist.jpg");
        let output = run(&config);

        match output {
            InferenceOutput::Error { error } => assert!(!error.is_empty()),
            other => panic!("expected an error document, got {other:?}"),
        }
    }
}

use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
};

use clap::Parser;

/// Command line of the classifier.
///
/// Help and version flags are disabled: anything short of two paths has to
/// answer with the usage document. `--num-threads` is only recognized before
/// the paths; after the model path every argument is taken verbatim.
#[derive(Parser, Clone, Debug)]
#[command(
    version,
    about,
    long_about = None,
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Config {
    /// ONNX model to load
    #[arg(allow_hyphen_values = true)]
    pub model_path: PathBuf,

    /// Image to classify
    #[arg(allow_hyphen_values = true)]
    pub image_path: PathBuf,

    /// Number of intra-op threads used by ONNX Runtime
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    pub num_threads: Option<u16>,

    /// Arguments after the image path are ignored
    #[arg(hide = true, allow_hyphen_values = true)]
    pub ignored: Vec<OsString>,
}

impl Config {
    pub fn new(model_path: impl Into<PathBuf>, image_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            image_path: image_path.into(),
            num_threads: None,
            ignored: Vec::new(),
        }
    }
}

/// The message carried by the usage error document.
pub fn usage(program: &str) -> String {
    format!("Usage: {program} <model_path> <image_path>")
}

/// Derives the program name shown in [`usage`] from `argv[0]`.
pub fn program_name(argv0: Option<&OsStr>) -> String {
    argv0
        .and_then(|arg| Path::new(arg).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading a raw image from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode TIFF '{path}': {source}")]
    Tiff {
        path: PathBuf,
        #[source]
        source: tiff::TiffError,
    },

    #[error("Failed to decode image '{path}': {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Unsupported file extension: '{extension}'")]
    UnsupportedFormat { extension: String },

    #[error("Unsupported color type {color_type} in '{path}'")]
    UnsupportedColorType { path: PathBuf, color_type: String },

    #[error("Image has no pixels (shape {shape:?})")]
    Empty { shape: Vec<usize> },

    #[error("Sample count {samples} does not match shape {shape:?}")]
    ShapeMismatch { shape: Vec<usize>, samples: usize },
}

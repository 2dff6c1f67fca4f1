//! Custom error types for cellseg.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the cellseg library.
#[derive(Error, Debug)]
pub enum Error {
    /// The requested application name is not registered.
    #[error("{name} is not a valid application name. Valid applications: {valid:?}")]
    InvalidApplication {
        name: String,
        valid: Vec<&'static str>,
    },

    /// An image path was empty or missing where one is required.
    #[error("invalid image path: {path:?}")]
    InvalidPath { path: PathBuf },

    /// A requested channel index exceeds the channel axis of the image.
    #[error("channel {channel} was passed but channel axis is only size {size}")]
    ChannelOutOfRange { channel: usize, size: usize },

    /// A loaded image did not end up with the expected rank.
    #[error("expected image with rank {expected} but found rank {actual} and shape {shape:?}")]
    UnexpectedRank {
        expected: usize,
        actual: usize,
        shape: Vec<usize>,
    },

    /// The assembled input tensor does not satisfy the model contract.
    #[error(
        "invalid image shape. An image of shape {shape:?} was provided, but \
         {app} expects images of shape [height, width, {channels}]"
    )]
    IncompatibleInput {
        shape: Vec<usize>,
        app: &'static str,
        channels: usize,
    },

    /// A predict-time option required by the application was not supplied.
    #[error("{option} is required for {app} jobs, but was not supplied")]
    MissingOption {
        option: &'static str,
        app: &'static str,
    },

    /// Failed to decode a TIFF image file.
    #[error("failed to read TIFF image {path}: {source}")]
    TiffRead {
        path: PathBuf,
        #[source]
        source: tiff::TiffError,
    },

    /// Failed to load a non-TIFF image file.
    #[error("failed to read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The image file decoded but its layout is not one we can interpret.
    #[error("unreadable image {path}: {reason}")]
    UnreadableImage { path: PathBuf, reason: String },

    /// Failed to write the output mask.
    #[error("failed to write mask to {path}: {source}")]
    MaskWrite {
        path: PathBuf,
        #[source]
        source: tiff::TiffError,
    },

    /// The output tensor has a rank the mask writer cannot serialize.
    #[error("cannot write mask with shape {shape:?}; expected rank 2, 3 or 4")]
    MaskShape { shape: Vec<usize> },

    /// Failed to download a model.
    #[error("failed to download model {name}: {source}")]
    ModelDownload {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    /// Failed to load an ONNX model.
    #[error("failed to load ONNX model {name}: {source}")]
    ModelLoad {
        name: String,
        #[source]
        source: ort::Error,
    },

    /// Model inference failed.
    #[error("model inference failed: {source}")]
    Inference {
        #[source]
        source: ort::Error,
    },

    /// The model graph did not produce the requested output.
    #[error("model produced no output named {name}")]
    MissingModelOutput { name: String },

    /// Failed to create cache directory.
    #[error("failed to create cache directory {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Shape mismatch in tensor operations.
    #[error("tensor shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for cellseg operations.
pub type Result<T> = std::result::Result<T, Error>;

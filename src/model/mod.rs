//! Model loading, caching, and inference.

mod cache;
mod onnx;

pub use cache::ModelCache;
pub use onnx::OnnxModel;

use crate::app::PredictOptions;
use crate::error::Result;
use crate::image::ImageTensor;

/// The capabilities a segmentation model exposes to the pipeline.
pub trait SegmentationModel {
    /// The image shape the model was trained on. The last element is the
    /// number of input channels.
    fn model_image_shape(&self) -> &[usize];

    /// Run prediction over a batched input tensor and return the mask for
    /// the requested compartment.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    fn predict(&mut self, batch: &ImageTensor, options: &PredictOptions) -> Result<ImageTensor>;
}

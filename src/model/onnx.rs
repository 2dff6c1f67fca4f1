//! ONNX Runtime adapter for segmentation models.

use ndarray::{concatenate, ArrayD, Axis, IxDyn};
use ort::session::Session;
use ort::value::Tensor;

use crate::app::{Application, PredictOptions};
use crate::error::{Error, Result};
use crate::image::ImageTensor;

use super::SegmentationModel;

/// A pretrained segmentation model backed by an ONNX Runtime session.
pub struct OnnxModel {
    app: Application,
    session: Session,
}

impl OnnxModel {
    /// Wrap a committed session for the given application.
    #[must_use]
    pub fn new(app: Application, session: Session) -> Self {
        Self { app, session }
    }

    /// Run the session over one batch chunk and extract the mask for the
    /// requested compartment.
    ///
    /// The graph output matching the compartment name is preferred; a graph
    /// with a single unnamed head falls back to its first output.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    fn run_chunk(&mut self, chunk: ImageTensor, options: &PredictOptions) -> Result<ImageTensor> {
        let input = Tensor::from_array(chunk).map_err(|source| Error::Inference { source })?;

        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(|source| Error::Inference { source })?;

        let name = options.compartment.output_name();
        let index = outputs.keys().position(|key| key == name).unwrap_or(0);
        let output = outputs
            .values()
            .nth(index)
            .ok_or_else(|| Error::MissingModelOutput {
                name: name.to_string(),
            })?;

        let (shape_info, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|source| Error::Inference { source })?;

        // Safe: tensor dimensions are always non-negative and within bounds
        let dims: Vec<usize> = shape_info.iter().map(|&x| x as usize).collect();

        Ok(ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec())?)
    }
}

impl SegmentationModel for OnnxModel {
    fn model_image_shape(&self) -> &[usize] {
        self.app.model_image_shape()
    }

    fn predict(&mut self, batch: &ImageTensor, options: &PredictOptions) -> Result<ImageTensor> {
        // image_mpp is forwarded metadata; the graph is resolution-agnostic.
        tracing::debug!(
            "Predicting {} items at {} microns per pixel",
            batch.shape().first().copied().unwrap_or(0),
            options.image_mpp
        );

        let batch_size = options.batch_size.max(1);

        let mut masks = Vec::new();
        for chunk in batch.axis_chunks_iter(Axis(0), batch_size) {
            masks.push(self.run_chunk(chunk.to_owned(), options)?);
        }

        let views: Vec<_> = masks.iter().map(|mask| mask.view()).collect();
        Ok(concatenate(Axis(0), &views)?)
    }
}

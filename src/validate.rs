//! Input validation against a model contract.

use crate::app::{Application, ModelContract};
use crate::error::{Error, Result};
use crate::image::ImageTensor;

/// Check that an assembled input tensor satisfies a model contract.
///
/// The tensor's rank must equal the contract's expected rank and its trailing
/// axis must hold exactly the required number of channels. Spatial extents
/// are unconstrained. Either check failing rejects the tensor with a message
/// reporting both the actual shape and the expected
/// `[height, width, channels]` layout.
///
/// # Errors
///
/// Returns an error if the tensor is incompatible with the contract.
pub fn validate_input(
    app: Application,
    contract: &ModelContract,
    img: &ImageTensor,
) -> Result<()> {
    let incompatible = || Error::IncompatibleInput {
        shape: img.shape().to_vec(),
        app: app.display_name(),
        channels: contract.required_channels,
    };

    if img.ndim() != contract.expected_rank {
        return Err(incompatible());
    }

    if img.shape().last() != Some(&contract.required_channels) {
        return Err(incompatible());
    }

    Ok(())
}

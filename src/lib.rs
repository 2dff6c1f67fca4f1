//! # cellseg
//!
//! A library for running pretrained cell segmentation models on multiplexed
//! microscopy images.
//!
//! Input images are single-channel (or multi-channel, with a channel selector)
//! TIFF files. The selected channels of each input role are summed into a
//! single plane, the roles are concatenated into the channel order the model
//! expects, and the assembled tensor is validated against the model's declared
//! input shape before prediction.
//!
//! ## Example
//!
//! ```no_run
//! use cellseg::app::{Application, ModelContract};
//! use cellseg::prepare::{prepare_input, MesmerInput, RoleSpec};
//! use cellseg::validate::validate_input;
//!
//! # fn main() -> cellseg::Result<()> {
//! let app = Application::from_name("mesmer")?;
//! let model = app.load_model()?;
//! let contract = ModelContract::from_image_shape(model.model_image_shape());
//!
//! let input = MesmerInput {
//!     nuclear: RoleSpec::new(Some("nuclear.tif"), 0),
//!     membrane: RoleSpec::absent(),
//!     ..MesmerInput::default()
//! };
//!
//! let img = prepare_input(app.name(), &input, contract.expected_rank)?;
//! validate_input(app, &contract, &img)?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod error;
pub mod image;
pub mod model;
pub mod prepare;
pub mod validate;

pub use error::{Error, Result};
pub use image::ImageTensor;

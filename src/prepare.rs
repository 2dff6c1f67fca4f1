//! Input assembly for the applications.
//!
//! Each application has an assembly routine that loads its named input roles,
//! substitutes a blank channel for absent optional roles, and concatenates
//! the roles on the channel axis in the order the model expects.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ndarray::{concatenate, ArrayD, Axis};

use crate::app::Application;
use crate::error::{Error, Result};
use crate::image::{load_image, ChannelSelector, ImageTensor};

/// A named logical input slot: an optional file path plus the channels to
/// select from it.
#[derive(Debug, Clone, Default)]
pub struct RoleSpec {
    pub path: Option<PathBuf>,
    pub channels: ChannelSelector,
}

impl RoleSpec {
    /// Create a role from a path and channel selection.
    pub fn new(path: Option<impl Into<PathBuf>>, channels: impl Into<ChannelSelector>) -> Self {
        Self {
            path: path.map(Into::into),
            channels: channels.into(),
        }
    }

    /// A role with no input file.
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }

    /// The role's path, if usable. An empty path counts as absent.
    fn present_path(&self) -> Option<&Path> {
        self.path
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }
}

/// Input configuration for the Mesmer application.
#[derive(Debug, Clone, Default)]
pub struct MesmerInput {
    /// The nuclear image. Required.
    pub nuclear: RoleSpec,
    /// The membrane image. Optional; a blank channel is substituted when
    /// absent.
    pub membrane: RoleSpec,
    /// Unrecognized configuration keys, ignored.
    pub extra: BTreeMap<String, String>,
}

/// Load and reshape the input files for the named application.
///
/// # Errors
///
/// Returns an error if the name is not a registered application or the
/// application's assembly fails.
pub fn prepare_input(name: &str, input: &MesmerInput, ndim: usize) -> Result<ImageTensor> {
    match Application::from_name(name)? {
        Application::Mesmer => prepare_mesmer_input(input, ndim),
    }
}

/// Load and reshape the input files for the Mesmer application.
///
/// The nuclear image is required. The membrane image is optional; when it is
/// absent an all-zero tensor with the nuclear tensor's exact shape stands in,
/// so concatenation cannot fail on the synthesized branch. The output channel
/// order is always nuclear then membrane.
///
/// # Errors
///
/// Returns an error if the nuclear path is absent or either image fails to
/// load.
pub fn prepare_mesmer_input(input: &MesmerInput, ndim: usize) -> Result<ImageTensor> {
    let nuclear_path = input.nuclear.present_path().ok_or_else(|| Error::InvalidPath {
        path: input.nuclear.path.clone().unwrap_or_default(),
    })?;
    let nuclear = load_image(nuclear_path, &input.nuclear.channels, ndim)?;

    // The membrane image is optional.
    let membrane = match input.membrane.present_path() {
        Some(path) => load_image(path, &input.membrane.channels, ndim)?,
        None => ArrayD::zeros(nuclear.raw_dim()),
    };

    // Join the inputs in the correct order.
    let last = Axis(nuclear.ndim() - 1);
    Ok(concatenate(last, &[nuclear.view(), membrane.view()])?)
}

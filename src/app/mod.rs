//! The registry of supported segmentation applications.
//!
//! Each application is a variant of [`Application`], carrying its model
//! contract, its predict-time options, and the location of its pretrained
//! weights. Adding an application means adding a variant, so an unhandled
//! application is a compile error rather than a missing dictionary entry.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::model::{ModelCache, OnnxModel, SegmentationModel};

/// A supported segmentation application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Application {
    /// Mesmer whole-cell segmentation on nuclear + membrane data.
    Mesmer,
}

impl Application {
    /// Every registered application.
    pub const ALL: [Self; 1] = [Self::Mesmer];

    /// Look up an application by name, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns an error naming the invalid application and listing the valid
    /// names.
    pub fn from_name(name: &str) -> Result<Self> {
        let lowered = name.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|app| app.name() == lowered)
            .ok_or_else(|| Error::InvalidApplication {
                name: name.to_string(),
                valid: Self::ALL.iter().map(|app| app.name()).collect(),
            })
    }

    /// The canonical (lowercase) application name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Mesmer => "mesmer",
        }
    }

    /// The capitalized name used in user-facing messages.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Mesmer => "Mesmer",
        }
    }

    /// The image shape the model was trained on. The last element is the
    /// number of input channels.
    #[must_use]
    pub const fn model_image_shape(&self) -> &'static [usize] {
        match self {
            Self::Mesmer => &[256, 256, 2],
        }
    }

    /// The input contract derived from [`Self::model_image_shape`].
    #[must_use]
    pub fn contract(&self) -> ModelContract {
        ModelContract::from_image_shape(self.model_image_shape())
    }

    /// The predict-time options this application requires.
    #[must_use]
    pub const fn predict_option_names(&self) -> &'static [&'static str] {
        match self {
            Self::Mesmer => &["image_mpp", "batch_size", "compartment"],
        }
    }

    /// The filename of the pretrained weights in the model cache.
    #[must_use]
    pub const fn model_filename(&self) -> &'static str {
        match self {
            Self::Mesmer => "mesmer.onnx",
        }
    }

    /// The download URL for the pretrained weights.
    #[must_use]
    pub const fn model_url(&self) -> &'static str {
        match self {
            Self::Mesmer => {
                "https://huggingface.co/cellseg/mesmer-onnx/resolve/main/mesmer.onnx"
            }
        }
    }

    /// Approximate size of the weights in bytes, for progress indication.
    #[must_use]
    pub const fn model_approx_size(&self) -> u64 {
        match self {
            Self::Mesmer => 100_000_000, // ~100 MB
        }
    }

    /// Collect the options this application's predict routine requires.
    ///
    /// Unrecognized extras in `supplied` are silently ignored.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first required option that is absent.
    pub fn predict_options(&self, supplied: &SuppliedOptions) -> Result<PredictOptions> {
        let missing = |option: &'static str| Error::MissingOption {
            option,
            app: self.name(),
        };

        match self {
            Self::Mesmer => Ok(PredictOptions {
                image_mpp: supplied.image_mpp.ok_or_else(|| missing("image_mpp"))?,
                batch_size: supplied.batch_size.ok_or_else(|| missing("batch_size"))?,
                compartment: supplied.compartment.ok_or_else(|| missing("compartment"))?,
            }),
        }
    }

    /// Load the application's pretrained model, downloading the weights on
    /// first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the weights cannot be downloaded or the session
    /// cannot be created.
    pub fn load_model(&self) -> Result<Box<dyn SegmentationModel>> {
        let cache = ModelCache::new()?;
        let session = cache.load_session(*self)?;
        Ok(Box::new(OnnxModel::new(*self, session)))
    }
}

/// The rank and channel count a model requires of its input tensor.
///
/// Supplied by the application registry; read-only to the preparation
/// pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelContract {
    /// Number of dimensions after channel concatenation, before batching.
    pub expected_rank: usize,
    /// Required extent of the trailing channel axis.
    pub required_channels: usize,
}

impl ModelContract {
    /// Derive a contract from a model's declared image shape: the rank is the
    /// shape's length and the channel count its last element.
    #[must_use]
    pub fn from_image_shape(shape: &[usize]) -> Self {
        Self {
            expected_rank: shape.len(),
            required_channels: shape.last().copied().unwrap_or(0),
        }
    }
}

/// The cellular compartment a segmentation returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Compartment {
    Nuclear,
    Membrane,
    WholeCell,
}

impl Compartment {
    /// The name of the model graph output holding this compartment's mask.
    #[must_use]
    pub const fn output_name(&self) -> &'static str {
        match self {
            Self::Nuclear => "nuclear_mask",
            Self::Membrane => "membrane_mask",
            Self::WholeCell => "whole_cell_mask",
        }
    }
}

impl fmt::Display for Compartment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nuclear => "nuclear",
            Self::Membrane => "membrane",
            Self::WholeCell => "whole-cell",
        };
        f.write_str(name)
    }
}

/// Predict-time options as supplied by the caller, before filtering.
///
/// Applications pick the fields they require; anything in `extra` is carried
/// for forward compatibility and always ignored.
#[derive(Debug, Clone, Default)]
pub struct SuppliedOptions {
    /// Image resolution in microns per pixel.
    pub image_mpp: Option<f32>,
    /// Batch size for prediction.
    pub batch_size: Option<usize>,
    /// The compartment to segment.
    pub compartment: Option<Compartment>,
    /// Unrecognized options, ignored.
    pub extra: BTreeMap<String, String>,
}

/// The validated, fully-populated options handed to the model's predict
/// routine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictOptions {
    pub image_mpp: f32,
    pub batch_size: usize,
    pub compartment: Compartment,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supplied() -> SuppliedOptions {
        SuppliedOptions {
            image_mpp: Some(0.5),
            batch_size: Some(4),
            compartment: Some(Compartment::WholeCell),
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn test_from_name_is_case_insensitive() {
        for name in ["mesmer", "Mesmer", "MESMER"] {
            assert_eq!(Application::from_name(name).unwrap(), Application::Mesmer);
        }
    }

    #[test]
    fn test_from_name_rejects_unknown() {
        let err = Application::from_name("cytoplasm").unwrap_err();
        match err {
            Error::InvalidApplication { name, valid } => {
                assert_eq!(name, "cytoplasm");
                assert_eq!(valid, vec!["mesmer"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_contract_from_image_shape() {
        let contract = ModelContract::from_image_shape(&[256, 256, 2]);
        assert_eq!(contract.expected_rank, 3);
        assert_eq!(contract.required_channels, 2);
        assert_eq!(Application::Mesmer.contract(), contract);
    }

    #[test]
    fn test_mesmer_predict_option_names() {
        assert_eq!(
            Application::Mesmer.predict_option_names(),
            &["image_mpp", "batch_size", "compartment"]
        );
    }

    #[test]
    fn test_predict_options_collects_required_fields() {
        let options = Application::Mesmer.predict_options(&supplied()).unwrap();
        assert_eq!(
            options,
            PredictOptions {
                image_mpp: 0.5,
                batch_size: 4,
                compartment: Compartment::WholeCell,
            }
        );
    }

    #[test]
    fn test_predict_options_reports_missing_field() {
        let mut incomplete = supplied();
        incomplete.image_mpp = None;

        let err = Application::Mesmer.predict_options(&incomplete).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingOption {
                option: "image_mpp",
                app: "mesmer",
            }
        ));
    }

    #[test]
    fn test_predict_options_ignores_extras() {
        let mut with_extras = supplied();
        with_extras
            .extra
            .insert("postprocess".to_string(), "watershed".to_string());

        assert!(Application::Mesmer.predict_options(&with_extras).is_ok());
    }
}

//! Image loading, channel selection, and mask saving utilities.

mod load;
mod save;

pub use load::{load_image, read_image};
pub use save::save_mask;

use ndarray::{ArrayD, Axis};

/// Image tensor with dynamic rank and f32 samples.
///
/// The canonical layout after loading is channels-last: `(height, width,
/// channels)`, with a batch axis prepended just before prediction.
pub type ImageTensor = ArrayD<f32>;

/// One or more channel indices to slice out of an image and sum into a
/// single plane.
///
/// An empty selection falls back to channel 0, so a selector is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSelector(Vec<usize>);

impl ChannelSelector {
    /// Create a selector from a list of channel indices.
    #[must_use]
    pub fn new(indices: Vec<usize>) -> Self {
        if indices.is_empty() {
            Self::default()
        } else {
            Self(indices)
        }
    }

    /// The selected channel indices. Never empty.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// The largest selected index.
    #[must_use]
    pub fn max(&self) -> usize {
        self.0.iter().copied().max().unwrap_or(0)
    }
}

impl Default for ChannelSelector {
    fn default() -> Self {
        Self(vec![0])
    }
}

impl From<usize> for ChannelSelector {
    fn from(channel: usize) -> Self {
        Self(vec![channel])
    }
}

impl From<Vec<usize>> for ChannelSelector {
    fn from(channels: Vec<usize>) -> Self {
        Self::new(channels)
    }
}

/// Drop every axis of extent 1 from a tensor.
///
/// Mirrors the optional `--squeeze` flag applied to model output before
/// saving. A tensor whose axes are all extent 1 squeezes down to rank 0.
#[must_use]
pub fn squeeze(mut tensor: ImageTensor) -> ImageTensor {
    while let Some(axis) = tensor.shape().iter().position(|&extent| extent == 1) {
        tensor = tensor.index_axis_move(Axis(axis), 0);
    }
    tensor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_empty_falls_back_to_zero() {
        let selector = ChannelSelector::new(vec![]);
        assert_eq!(selector.indices(), &[0]);
        assert_eq!(selector, ChannelSelector::default());
    }

    #[test]
    fn test_selector_from_scalar_and_list() {
        assert_eq!(ChannelSelector::from(2).indices(), &[2]);
        assert_eq!(ChannelSelector::from(vec![0, 3]).indices(), &[0, 3]);
        assert_eq!(ChannelSelector::from(vec![0, 3]).max(), 3);
    }

    #[test]
    fn test_squeeze_drops_unit_axes() {
        let tensor = ArrayD::<f32>::zeros(vec![1, 32, 32, 1]);
        let squeezed = squeeze(tensor);
        assert_eq!(squeezed.shape(), &[32, 32]);
    }

    #[test]
    fn test_squeeze_without_unit_axes_is_identity() {
        let tensor = ArrayD::<f32>::zeros(vec![2, 32, 32]);
        let squeezed = squeeze(tensor);
        assert_eq!(squeezed.shape(), &[2, 32, 32]);
    }
}

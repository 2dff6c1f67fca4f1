//! Image loading and channel selection.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::{ArrayD, Axis, IxDyn};
use tiff::decoder::{Decoder, DecodingResult};

use crate::error::{Error, Result};

use super::{ChannelSelector, ImageTensor};

/// Load an image file as a single-channel tensor.
///
/// The image is:
/// 1. Read from disk into an array of its native rank
/// 2. Reduced to a single plane by summing the selected channels, when the
///    native rank matches `expected_rank` (i.e. the file carries an explicit
///    channel axis)
/// 3. Given a new trailing channel axis of extent 1
///
/// The channel axis of a multi-channel file is inferred as the smallest
/// dimension, taking the first axis on ties. This is a heuristic: it misreads
/// images whose true channel axis is not the smallest dimension.
///
/// # Errors
///
/// Returns an error if `path` is empty, the file cannot be read, a selected
/// channel index is out of range, or the result does not have rank
/// `expected_rank`.
pub fn load_image<P: AsRef<Path>>(
    path: P,
    channels: &ChannelSelector,
    expected_rank: usize,
) -> Result<ImageTensor> {
    let path = path.as_ref();

    if path.as_os_str().is_empty() {
        return Err(Error::InvalidPath {
            path: path.to_path_buf(),
        });
    }

    let raw = read_image(path)?;
    select_channels(raw, channels, expected_rank)
}

/// Collapse the selected channels of a raw image into a single trailing
/// channel plane.
fn select_channels(
    raw: ImageTensor,
    channels: &ChannelSelector,
    expected_rank: usize,
) -> Result<ImageTensor> {
    let img = if raw.ndim() == expected_rank {
        // The file includes a channel axis; assume it is the smallest
        // dimension, first axis on ties.
        let shape = raw.shape();
        let mut axis = 0;
        for (i, &extent) in shape.iter().enumerate() {
            if extent < shape[axis] {
                axis = i;
            }
        }

        let size = shape[axis];
        let max = channels.max();
        if max >= size {
            return Err(Error::ChannelOutOfRange { channel: max, size });
        }

        // Slice out the requested channels and sum them on the channel axis.
        let indices = channels.indices();
        let mut summed = raw.index_axis(Axis(axis), indices[0]).to_owned();
        for &channel in &indices[1..] {
            summed += &raw.index_axis(Axis(axis), channel);
        }
        summed
    } else {
        // No explicit channel axis; use the raw array as-is.
        raw
    };

    // Expand the (proper) channel axis.
    let trailing = Axis(img.ndim());
    let img = img.insert_axis(trailing);

    if img.ndim() != expected_rank {
        return Err(Error::UnexpectedRank {
            expected: expected_rank,
            actual: img.ndim(),
            shape: img.shape().to_vec(),
        });
    }

    Ok(img)
}

/// Read a raw image file into an array of its native rank.
///
/// `.tif`/`.tiff` files are decoded with the TIFF decoder: a single page
/// becomes `(height, width)` with one sample per pixel or `(height, width,
/// samples)` otherwise, and multiple single-sample pages stack channel-first
/// to `(pages, height, width)`. Any other extension goes through the generic
/// image decoder; grayscale becomes `(height, width)`, everything else RGB
/// `(height, width, 3)`. Sample values are widened to f32 without scaling.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or decoded, or if its pages
/// have mixed sizes or sample counts.
pub fn read_image<P: AsRef<Path>>(path: P) -> Result<ImageTensor> {
    let path = path.as_ref();

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    match extension.as_deref() {
        Some("tif" | "tiff") => read_tiff(path),
        _ => read_generic(path),
    }
}

fn read_tiff(path: &Path) -> Result<ImageTensor> {
    let tiff_err = |source: tiff::TiffError| Error::TiffRead {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file)).map_err(tiff_err)?;

    // (height, width, samples per pixel, data)
    let mut pages: Vec<(usize, usize, usize, Vec<f32>)> = Vec::new();

    loop {
        let (width, height) = decoder.dimensions().map_err(tiff_err)?;
        let (width, height) = (width as usize, height as usize);

        let data = samples_to_f32(decoder.read_image().map_err(tiff_err)?);
        let samples = if width * height == 0 {
            1
        } else {
            data.len() / (width * height)
        };
        pages.push((height, width, samples, data));

        if !decoder.more_images() {
            break;
        }
        decoder.next_image().map_err(tiff_err)?;
    }

    if pages.len() == 1 {
        let (height, width, samples, data) = pages.remove(0);
        let tensor = if samples == 1 {
            ArrayD::from_shape_vec(IxDyn(&[height, width]), data)?
        } else {
            ArrayD::from_shape_vec(IxDyn(&[height, width, samples]), data)?
        };
        return Ok(tensor);
    }

    // Multi-page files stack channel-first, one channel per page.
    let (height, width) = (pages[0].0, pages[0].1);
    if pages.iter().any(|&(h, w, s, _)| (h, w, s) != (height, width, 1)) {
        return Err(Error::UnreadableImage {
            path: path.to_path_buf(),
            reason: format!(
                "{} pages with mixed sizes or multiple samples per pixel",
                pages.len()
            ),
        });
    }

    let count = pages.len();
    let mut data = Vec::with_capacity(count * height * width);
    for (_, _, _, page) in pages {
        data.extend(page);
    }

    Ok(ArrayD::from_shape_vec(IxDyn(&[count, height, width]), data)?)
}

fn read_generic(path: &Path) -> Result<ImageTensor> {
    use image::GenericImageView;

    let img = image::open(path).map_err(|source| Error::ImageRead {
        path: path.to_path_buf(),
        source,
    })?;

    let (width, height) = img.dimensions();
    let (height, width) = (height as usize, width as usize);

    let tensor = match img {
        image::DynamicImage::ImageLuma8(gray) => {
            let data = gray.into_raw().into_iter().map(f32::from).collect();
            ArrayD::from_shape_vec(IxDyn(&[height, width]), data)?
        }
        image::DynamicImage::ImageLuma16(gray) => {
            let data = gray.into_raw().into_iter().map(f32::from).collect();
            ArrayD::from_shape_vec(IxDyn(&[height, width]), data)?
        }
        other => {
            let data = other.to_rgb8().into_raw().into_iter().map(f32::from).collect();
            ArrayD::from_shape_vec(IxDyn(&[height, width, 3]), data)?
        }
    };

    Ok(tensor)
}

/// Widen decoded TIFF samples to f32 without scaling.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn samples_to_f32(result: DecodingResult) -> Vec<f32> {
    match result {
        DecodingResult::U8(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::U16(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::U32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::I16(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::I32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.into_iter().map(|v| v as f32).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::image::save_mask;

    #[allow(clippy::cast_precision_loss)]
    fn test_array(shape: &[usize]) -> ImageTensor {
        let mut counter = 0;
        ArrayD::from_shape_fn(IxDyn(shape), |_| {
            counter += 1;
            counter as f32
        })
    }

    #[test]
    fn test_2d_image_gains_trailing_channel_axis() {
        let raw = test_array(&[32, 32]);
        let img = select_channels(raw, &ChannelSelector::default(), 3).unwrap();
        assert_eq!(img.shape(), &[32, 32, 1]);
    }

    #[test]
    fn test_channels_last_selection() {
        let raw = test_array(&[32, 32, 3]);

        for c in 0..3 {
            let img = select_channels(raw.clone(), &ChannelSelector::from(c), 3).unwrap();
            assert_eq!(img.shape(), &[32, 32, 1]);

            let trailing = Axis(2);
            let expected = raw.index_axis(trailing, c).to_owned().insert_axis(trailing);
            assert_eq!(img, expected);
        }
    }

    #[test]
    fn test_channels_first_selection() {
        let raw = test_array(&[3, 32, 32]);

        for c in 0..3 {
            let img = select_channels(raw.clone(), &ChannelSelector::from(c), 3).unwrap();
            assert_eq!(img.shape(), &[32, 32, 1]);

            let expected = raw.index_axis(Axis(0), c).to_owned().insert_axis(Axis(2));
            assert_eq!(img, expected);
        }
    }

    #[test]
    fn test_multiple_channels_are_summed() {
        for shape in [&[32, 32, 3], &[3, 32, 32]] {
            let raw = test_array(shape);
            let axis = if shape[0] == 3 { Axis(0) } else { Axis(2) };

            let selector = ChannelSelector::from(vec![0, 1, 2]);
            let img = select_channels(raw.clone(), &selector, 3).unwrap();
            assert_eq!(img.shape(), &[32, 32, 1]);

            let expected = raw.sum_axis(axis).insert_axis(Axis(2));
            assert_eq!(img, expected);
        }
    }

    #[test]
    fn test_list_selection_matches_summed_singles() {
        let raw = test_array(&[32, 32, 3]);

        let both = select_channels(raw.clone(), &ChannelSelector::from(vec![0, 2]), 3).unwrap();
        let first = select_channels(raw.clone(), &ChannelSelector::from(0), 3).unwrap();
        let second = select_channels(raw, &ChannelSelector::from(2), 3).unwrap();

        assert_eq!(both, first + second);
    }

    #[test]
    fn test_rank_above_expected_fails() {
        let raw = test_array(&[30, 32, 32, 1]);
        let err = select_channels(raw, &ChannelSelector::default(), 3).unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedRank {
                expected: 3,
                actual: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_channel_out_of_range() {
        let raw = test_array(&[32, 32, 2]);
        let selector = ChannelSelector::from(vec![0, 4]);
        let err = select_channels(raw, &selector, 3).unwrap_err();
        assert!(matches!(err, Error::ChannelOutOfRange { channel: 4, size: 2 }));
    }

    #[test]
    fn test_empty_path_is_io_error() {
        let err = load_image("", &ChannelSelector::default(), 3).unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
    }

    #[test]
    fn test_load_single_page_tiff() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nuclear.tif");

        let source = test_array(&[32, 32]);
        save_mask(&source, &path).unwrap();

        let img = load_image(&path, &ChannelSelector::default(), 3).unwrap();
        assert_eq!(img.shape(), &[32, 32, 1]);
        assert_eq!(img, source.insert_axis(Axis(2)));
    }

    #[test]
    fn test_load_multi_page_tiff_sums_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.tif");

        // Rank-3 masks save one page per leading index, i.e. channel-first.
        let source = test_array(&[3, 32, 32]);
        save_mask(&source, &path).unwrap();

        let raw = read_image(&path).unwrap();
        assert_eq!(raw.shape(), &[3, 32, 32]);

        let selector = ChannelSelector::from(vec![0, 1, 2]);
        let img = load_image(&path, &selector, 3).unwrap();
        assert_eq!(img.shape(), &[32, 32, 1]);
        assert_eq!(img, source.sum_axis(Axis(0)).insert_axis(Axis(2)));
    }

    #[test]
    fn test_load_rgb_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("membrane.png");

        let rgb = image::RgbImage::from_fn(4, 4, |x, y| {
            image::Rgb([x as u8, y as u8, (x + y) as u8])
        });
        rgb.save(&path).unwrap();

        let raw = read_image(&path).unwrap();
        assert_eq!(raw.shape(), &[4, 4, 3]);

        // Channel axis is the last (smallest) dimension.
        let img = load_image(&path, &ChannelSelector::from(1), 3).unwrap();
        assert_eq!(img.shape(), &[4, 4, 1]);
        assert_eq!(img[[2, 0, 0]], 2.0);
    }
}

//! Mask saving utilities.

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use ndarray::Axis;
use tiff::encoder::{colortype, TiffEncoder};

use crate::error::{Error, Result};

use super::ImageTensor;

/// Save a mask tensor as a 32-bit float grayscale TIFF.
///
/// A rank-2 tensor is written as a single page. A rank-3 tensor writes one
/// page per leading index. A rank-4 `(batch, height, width, channels)` tensor
/// writes one page per batch/channel pair.
///
/// # Errors
///
/// Returns an error if the file cannot be written or the tensor rank is not
/// 2, 3 or 4.
#[allow(clippy::cast_possible_truncation)]
pub fn save_mask<P: AsRef<Path>>(tensor: &ImageTensor, path: P) -> Result<()> {
    let path = path.as_ref();
    let tiff_err = |source: tiff::TiffError| Error::MaskWrite {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file)).map_err(tiff_err)?;

    match tensor.shape() {
        &[height, width] => {
            let data: Vec<f32> = tensor.iter().copied().collect();
            write_page(&mut encoder, height, width, &data).map_err(tiff_err)?;
        }
        &[pages, height, width] => {
            for i in 0..pages {
                let page = tensor.index_axis(Axis(0), i);
                let data: Vec<f32> = page.iter().copied().collect();
                write_page(&mut encoder, height, width, &data).map_err(tiff_err)?;
            }
        }
        &[batches, height, width, channels] => {
            for b in 0..batches {
                let batch = tensor.index_axis(Axis(0), b);
                for c in 0..channels {
                    let page = batch.index_axis(Axis(2), c);
                    let data: Vec<f32> = page.iter().copied().collect();
                    write_page(&mut encoder, height, width, &data).map_err(tiff_err)?;
                }
            }
        }
        shape => {
            return Err(Error::MaskShape {
                shape: shape.to_vec(),
            });
        }
    }

    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn write_page<W: Write + Seek>(
    encoder: &mut TiffEncoder<W>,
    height: usize,
    width: usize,
    data: &[f32],
) -> tiff::TiffResult<()> {
    encoder.write_image::<colortype::Gray32Float>(width as u32, height as u32, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::{ArrayD, IxDyn};

    use crate::image::read_image;

    #[test]
    fn test_round_trip_single_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.tif");

        let mask = ArrayD::from_shape_fn(IxDyn(&[8, 16]), |ix| (ix[0] * 16 + ix[1]) as f32);
        save_mask(&mask, &path).unwrap();

        let loaded = read_image(&path).unwrap();
        assert_eq!(loaded, mask);
    }

    #[test]
    fn test_round_trip_multi_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.tif");

        let mask = ArrayD::from_shape_fn(IxDyn(&[3, 8, 8]), |ix| (ix[0] * 64 + ix[1]) as f32);
        save_mask(&mask, &path).unwrap();

        let loaded = read_image(&path).unwrap();
        assert_eq!(loaded, mask);
    }

    #[test]
    fn test_batched_output_writes_page_per_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.tif");

        let mask = ArrayD::from_shape_fn(IxDyn(&[2, 4, 4, 2]), |ix| {
            (ix[0] * 100 + ix[3] * 10 + ix[1]) as f32
        });
        save_mask(&mask, &path).unwrap();

        // Pages stack in batch-major, channel-minor order.
        let loaded = read_image(&path).unwrap();
        assert_eq!(loaded.shape(), &[4, 4, 4]);
        assert_eq!(loaded[[0, 0, 0]], 0.0);
        assert_eq!(loaded[[1, 0, 0]], 10.0);
        assert_eq!(loaded[[2, 0, 0]], 100.0);
        assert_eq!(loaded[[3, 0, 0]], 110.0);
    }

    #[test]
    fn test_unsupported_rank_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.tif");

        let mask = ArrayD::<f32>::zeros(IxDyn(&[2, 2, 2, 2, 2]));
        let err = save_mask(&mask, &path).unwrap_err();
        assert!(matches!(err, Error::MaskShape { .. }));
    }
}

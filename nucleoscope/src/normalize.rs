//! Reduction of raw sample buffers to calibrated 8-bit intensity planes.


use common::Buffer2;

use crate::image_io::{LoadError, RawImage};

/// Single-channel 8-bit intensity plane, min-max stretched to [0, 255].
pub type NormalizedImage = Buffer2<u8>;

/// Reduce `raw` to one 2-D plane and stretch it to the full 8-bit range.
pub fn normalize(raw: RawImage) -> Result<NormalizedImage, LoadError> {
    let plane = reduce_to_plane(raw)?;
    Ok(rescale_to_u8(&plane))
}

/// Collapse a raw buffer to a single 2-D plane.
///
/// A 3-D buffer whose trailing axis has size 3 is RGB and becomes the
/// rounded per-pixel channel mean. Any other buffer with more than two axes
/// keeps only its first plane along the leading axis; the remaining planes
/// are dropped. The rules repeat until two axes remain.
pub fn reduce_to_plane(raw: RawImage) -> Result<Buffer2<f32>, LoadError> {
    let (mut shape, mut samples) = raw.into_parts();

    while shape.len() > 2 {
        if shape.len() == 3 && shape[2] == 3 {
            samples = rgb_to_gray(&samples);
            shape.pop();
        } else {
            tracing::warn!(
                "Keeping only the first of {} planes of a {:?} buffer",
                shape[0],
                shape
            );
            let plane_len: usize = shape[1..].iter().product();
            samples.truncate(plane_len);
            shape.remove(0);
        }
    }

    let (height, width) = (shape[0], shape[1]);
    if height == 0 || width == 0 {
        return Err(LoadError::Empty { shape });
    }
    Ok(Buffer2::new(width, height, samples))
}

fn rgb_to_gray(samples: &[f32]) -> Vec<f32> {
    samples
        .chunks_exact(3)
        .map(|rgb| {
            let sum = rgb[0] as f64 + rgb[1] as f64 + rgb[2] as f64;
            (sum / 3.0).round() as f32
        })
        .collect()
}

/// Linear stretch so the minimum maps to 0 and the maximum to 255.
///
/// Constant planes map to all zeros.
pub fn rescale_to_u8(plane: &Buffer2<f32>) -> NormalizedImage {
    let min = plane.iter().copied().fold(f32::INFINITY, f32::min);
    let max = plane.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    if max <= min {
        return Buffer2::new_default(plane.width(), plane.height());
    }

    let range = max - min;
    plane.map(|&v| ((v - min) / range * 255.0) as u8)
}

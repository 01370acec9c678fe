//! Gaussian-weighted local threshold.
//!
//! Each pixel is compared against the Gaussian-weighted mean of its
//! neighbourhood, so dim spots on a dark region and bright spots on a bright
//! region are both found. Borders are extended by half-sample symmetric
//! reflection (`dcb|abcd|cba`).

use common::Buffer2;
use rayon::prelude::*;

/// Pixels must exceed their local threshold by more than this to count as
/// foreground. Keeps flat regions from flickering on accumulated rounding.
const FLAT_TOLERANCE: f64 = 1e-9;

/// Kernel extent in units of sigma.
const TRUNCATE: f64 = 4.0;

/// Normalized 1-D Gaussian kernel truncated at `TRUNCATE * sigma`.
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (TRUNCATE * sigma + 0.5) as isize;
    let two_sigma_sq = 2.0 * sigma * sigma;

    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|i| (-((i * i) as f64) / two_sigma_sq).exp())
        .collect();
    let sum: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= sum);
    kernel
}

/// Half-sample symmetric reflection of `i` into `0..n`.
#[inline]
pub(crate) fn reflect_index(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * n as isize;
    let m = i.rem_euclid(period) as usize;
    if m < n {
        m
    } else {
        2 * n - 1 - m
    }
}

/// Gaussian-weighted local mean of `image` with the given sigma.
pub fn local_threshold(image: &Buffer2<u8>, sigma: f64) -> Buffer2<f64> {
    let width = image.width();
    let height = image.height();
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;

    // Horizontal pass
    let mut horizontal = Buffer2::new_default(width, height);
    horizontal
        .pixels_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, out_row)| {
            let row = image.row(y);
            for (x, out) in out_row.iter_mut().enumerate() {
                let mut acc = 0.0;
                for (k, &w) in kernel.iter().enumerate() {
                    let sx = reflect_index(x as isize + k as isize - radius, width);
                    acc += w * row[sx] as f64;
                }
                *out = acc;
            }
        });

    // Vertical pass, accumulated row by row
    let mut output = Buffer2::new_default(width, height);
    output
        .pixels_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, out_row)| {
            for (k, &w) in kernel.iter().enumerate() {
                let sy = reflect_index(y as isize + k as isize - radius, height);
                let src = horizontal.row(sy);
                for (out, &v) in out_row.iter_mut().zip(src) {
                    *out += w * v;
                }
            }
        });

    output
}

/// Foreground mask: pixels strictly brighter than their local threshold.
pub fn threshold_mask(image: &Buffer2<u8>, threshold: &Buffer2<f64>) -> Buffer2<bool> {
    debug_assert_eq!(image.width(), threshold.width());
    debug_assert_eq!(image.height(), threshold.height());

    let pixels = image
        .iter()
        .zip(threshold.iter())
        .map(|(&v, &t)| v as f64 > t + FLAT_TOLERANCE)
        .collect();
    Buffer2::new(image.width(), image.height(), pixels)
}

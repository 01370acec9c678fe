//! Binary morphology with disk-shaped structuring elements.

use common::Buffer2;
use rayon::prelude::*;

/// Offsets `(dx, dy)` of a digital disk: all points with `dx² + dy² <= r²`.
///
/// Radius 0 yields the single center point, making every operation an identity.
pub fn disk(radius: usize) -> Vec<(isize, isize)> {
    let r = radius as isize;
    let mut offsets = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r * r {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}

/// A pixel is set if any footprint position lands on a set pixel.
/// Pixels outside the image count as unset.
pub fn dilate(mask: &Buffer2<bool>, footprint: &[(isize, isize)]) -> Buffer2<bool> {
    apply(mask, footprint, false)
}

/// A pixel stays set only if every footprint position lands on a set pixel.
/// Pixels outside the image count as set, so objects are not eaten from the
/// border inward.
pub fn erode(mask: &Buffer2<bool>, footprint: &[(isize, isize)]) -> Buffer2<bool> {
    apply(mask, footprint, true)
}

/// Dilation followed by erosion: fills holes and gaps narrower than the disk.
pub fn close(mask: &Buffer2<bool>, radius: usize) -> Buffer2<bool> {
    if radius == 0 {
        return mask.clone();
    }
    let footprint = disk(radius);
    erode(&dilate(mask, &footprint), &footprint)
}

/// Erosion followed by dilation: removes specks and bridges thinner than the disk.
pub fn open(mask: &Buffer2<bool>, radius: usize) -> Buffer2<bool> {
    if radius == 0 {
        return mask.clone();
    }
    let footprint = disk(radius);
    dilate(&erode(mask, &footprint), &footprint)
}

/// Shared kernel of dilation (`erosion == false`) and erosion.
fn apply(mask: &Buffer2<bool>, footprint: &[(isize, isize)], erosion: bool) -> Buffer2<bool> {
    let width = mask.width();
    let height = mask.height();
    let mut output = Buffer2::new_default(width, height);

    output
        .pixels_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, out_row)| {
            for (x, out) in out_row.iter_mut().enumerate() {
                let mut hits = footprint.iter().map(|&(dx, dy)| {
                    let sx = x as isize + dx;
                    let sy = y as isize + dy;
                    if sx < 0 || sy < 0 || sx >= width as isize || sy >= height as isize {
                        erosion
                    } else {
                        mask[(sx as usize, sy as usize)]
                    }
                });
                *out = if erosion {
                    hits.all(|v| v)
                } else {
                    hits.any(|v| v)
                };
            }
        });

    output
}

//! Operator-facing images: segmentation panels and condition bar charts.

mod bar_chart;

pub use bar_chart::{render_bar_chart, render_metric_panel, Metric};

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{GrayImage, Rgb, RgbImage};
use thiserror::Error;

use crate::normalize::NormalizedImage;
use crate::segmentation::{BinaryMask, LabelMap};

/// Empty space between and around panel tiles, in pixels.
const GUTTER: u32 = 16;

/// Overlay opacity of label colors.
const LABEL_ALPHA: f32 = 0.3;

/// Colors used for plots and overlays.
pub mod colors {
    use image::Rgb;

    pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    pub const DARK_GRAY: Rgb<u8> = Rgb([51, 51, 51]);
    pub const GRID: Rgb<u8> = Rgb([220, 220, 220]);
    pub const CONTROL: Rgb<u8> = Rgb([0x8e, 0xca, 0xe6]); // light blue
    pub const MUTANT: Rgb<u8> = Rgb([0xff, 0xb7, 0x03]); // amber
    pub const UNKNOWN: Rgb<u8> = Rgb([160, 160, 160]);

    /// Cycled per label, starting at label 1.
    pub const LABEL_PALETTE: [Rgb<u8>; 10] = [
        Rgb([255, 0, 0]),     // red
        Rgb([0, 0, 255]),     // blue
        Rgb([255, 255, 0]),   // yellow
        Rgb([255, 0, 255]),   // magenta
        Rgb([0, 128, 0]),     // green
        Rgb([75, 0, 130]),    // indigo
        Rgb([255, 140, 0]),   // darkorange
        Rgb([0, 255, 255]),   // cyan
        Rgb([255, 192, 203]), // pink
        Rgb([154, 205, 50]),  // yellowgreen
    ];
}

#[derive(Debug, Error)]
pub enum VisualizeError {
    #[error("Failed to create directory '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to save '{path}': {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Gray image of the normalized intensities.
pub fn to_gray_image(image: &NormalizedImage) -> GrayImage {
    GrayImage::from_fn(image.width() as u32, image.height() as u32, |x, y| {
        image::Luma([image[(x as usize, y as usize)]])
    })
}

/// Mask as dark foreground on white background.
pub fn mask_to_rgb(mask: &BinaryMask) -> RgbImage {
    RgbImage::from_fn(mask.width() as u32, mask.height() as u32, |x, y| {
        if mask[(x as usize, y as usize)] {
            colors::BLACK
        } else {
            colors::WHITE
        }
    })
}

/// Label colors blended over the gray image; background pixels keep the image.
pub fn label_overlay(image: &NormalizedImage, labels: &LabelMap) -> RgbImage {
    let label_buf = labels.labels();
    RgbImage::from_fn(image.width() as u32, image.height() as u32, |x, y| {
        let gray = image[(x as usize, y as usize)] as f32;
        let label = label_buf[(x as usize, y as usize)];
        if label == 0 {
            let g = gray as u8;
            return Rgb([g, g, g]);
        }
        let Rgb(color) = label_color(label);
        Rgb(color.map(|c| (c as f32 * LABEL_ALPHA + gray * (1.0 - LABEL_ALPHA)).round() as u8))
    })
}

/// Palette color of `label` (1-based).
pub fn label_color(label: u32) -> Rgb<u8> {
    let palette = &colors::LABEL_PALETTE;
    palette[(label.saturating_sub(1) as usize) % palette.len()]
}

/// Side-by-side panel: original | mask | optional label overlay.
///
/// Each tile is scaled to fit a `panel_size` square, keeping its aspect
/// ratio, and centered in it.
pub fn render_panel(
    image: &NormalizedImage,
    mask: &BinaryMask,
    labels: Option<&LabelMap>,
    panel_size: u32,
) -> RgbImage {
    assert!(panel_size > 0, "panel_size must be positive");

    let mut tiles: Vec<RgbImage> = vec![
        image::DynamicImage::ImageLuma8(to_gray_image(image)).to_rgb8(),
        mask_to_rgb(mask),
    ];
    if let Some(labels) = labels {
        tiles.push(label_overlay(image, labels));
    }

    let n = tiles.len() as u32;
    let width = n * panel_size + (n + 1) * GUTTER;
    let height = panel_size + 2 * GUTTER;
    let mut canvas = RgbImage::from_pixel(width, height, colors::WHITE);

    for (i, tile) in tiles.iter().enumerate() {
        let fitted = fit_to_square(tile, panel_size);
        let x0 = GUTTER + i as u32 * (panel_size + GUTTER) + (panel_size - fitted.width()) / 2;
        let y0 = GUTTER + (panel_size - fitted.height()) / 2;
        imageops::replace(&mut canvas, &fitted, x0 as i64, y0 as i64);
    }

    canvas
}

/// Nearest-neighbour scale of `tile` to fit a `size` square.
fn fit_to_square(tile: &RgbImage, size: u32) -> RgbImage {
    let (w, h) = tile.dimensions();
    let scale = size as f64 / w.max(h) as f64;
    let new_w = ((w as f64 * scale).round() as u32).clamp(1, size);
    let new_h = ((h as f64 * scale).round() as u32).clamp(1, size);
    imageops::resize(tile, new_w, new_h, FilterType::Nearest)
}

/// Save `image`, creating parent directories as needed.
pub fn save_rgb(image: &RgbImage, path: &Path) -> Result<(), VisualizeError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| VisualizeError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    image.save(path).map_err(|source| VisualizeError::Image {
        path: path.to_path_buf(),
        source,
    })
}

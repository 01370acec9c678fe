//! Decoding of image files into raw multi-dimensional sample buffers.
//!
//! The buffer keeps the shape the file actually has: `[h, w]` for gray
//! planes, `[h, w, c]` for interleaved color, `[pages, h, w]` or
//! `[pages, h, w, c]` for multi-page TIFF stacks. Reducing that to one
//! 2-D plane is the normalizer's job.

mod error;

pub use error::LoadError;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::DynamicImage;
use num_traits::ToPrimitive;
use tiff::decoder::{Decoder, DecodingResult};

/// Extensions decoded with the TIFF decoder (all pages).
pub use common::file_utils::TIFF_EXTENSIONS;

/// Extensions decoded with the `image` crate (single plane).
pub const RASTER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Decoded samples with their N-dimensional shape, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    shape: Vec<usize>,
    samples: Vec<f32>,
}

impl RawImage {
    pub fn new(shape: Vec<usize>, samples: Vec<f32>) -> Result<Self, LoadError> {
        let expected: usize = shape.iter().product();
        if shape.len() < 2 {
            return Err(LoadError::ShapeMismatch {
                shape,
                samples: samples.len(),
            });
        }
        if expected != samples.len() {
            return Err(LoadError::ShapeMismatch {
                shape,
                samples: samples.len(),
            });
        }
        if expected == 0 {
            return Err(LoadError::Empty { shape });
        }
        Ok(Self { shape, samples })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_parts(self) -> (Vec<usize>, Vec<f32>) {
        (self.shape, self.samples)
    }
}

/// Load `path` as a raw sample buffer, choosing the decoder by extension.
pub fn load_raw(path: &Path) -> Result<RawImage, LoadError> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();

    if TIFF_EXTENSIONS.contains(&ext.as_str()) {
        load_tiff(path)
    } else if RASTER_EXTENSIONS.contains(&ext.as_str()) {
        load_raster(path)
    } else {
        Err(LoadError::UnsupportedFormat { extension: ext })
    }
}

fn load_tiff(path: &Path) -> Result<RawImage, LoadError> {
    let tiff_err = |source| LoadError::Tiff {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut decoder = Decoder::new(BufReader::new(file)).map_err(tiff_err)?;

    let mut plane_shape: Option<Vec<usize>> = None;
    let mut pages = 0usize;
    let mut samples = Vec::new();

    loop {
        let (width, height) = decoder.dimensions().map_err(tiff_err)?;
        let channels = match decoder.colortype().map_err(tiff_err)? {
            tiff::ColorType::Gray(_) => 1,
            tiff::ColorType::GrayA(_) => 2,
            tiff::ColorType::RGB(_) => 3,
            tiff::ColorType::RGBA(_) => 4,
            other => {
                return Err(LoadError::UnsupportedColorType {
                    path: path.to_path_buf(),
                    color_type: format!("{other:?}"),
                })
            }
        };

        let mut shape = vec![height as usize, width as usize];
        if channels > 1 {
            shape.push(channels);
        }

        match &plane_shape {
            Some(first) if *first != shape => {
                // Trailing pages of another shape (thumbnails, masks) are not part of the stack.
                tracing::debug!(
                    "Stopping at page {} of '{}': shape {:?} differs from {:?}",
                    pages,
                    path.display(),
                    shape,
                    first
                );
                break;
            }
            Some(_) => {}
            None => plane_shape = Some(shape),
        }

        let page = decoder.read_image().map_err(tiff_err)?;
        samples.extend(decoding_result_to_f32(page));
        pages += 1;

        if !decoder.more_images() {
            break;
        }
        decoder.next_image().map_err(tiff_err)?;
    }

    let plane_shape = plane_shape.unwrap_or_default();
    let shape = if pages > 1 {
        std::iter::once(pages).chain(plane_shape).collect()
    } else {
        plane_shape
    };

    tracing::debug!("Loaded '{}' with shape {:?}", path.display(), shape);
    RawImage::new(shape, samples)
}

#[allow(unreachable_patterns)]
fn decoding_result_to_f32(result: DecodingResult) -> Vec<f32> {
    match result {
        DecodingResult::U8(buf) => to_f32_samples(&buf),
        DecodingResult::U16(buf) => to_f32_samples(&buf),
        DecodingResult::U32(buf) => to_f32_samples(&buf),
        DecodingResult::U64(buf) => to_f32_samples(&buf),
        DecodingResult::I8(buf) => to_f32_samples(&buf),
        DecodingResult::I16(buf) => to_f32_samples(&buf),
        DecodingResult::I32(buf) => to_f32_samples(&buf),
        DecodingResult::I64(buf) => to_f32_samples(&buf),
        DecodingResult::F32(buf) => buf,
        DecodingResult::F64(buf) => to_f32_samples(&buf),
        _ => Vec::new(),
    }
}

fn to_f32_samples<T: ToPrimitive>(buf: &[T]) -> Vec<f32> {
    buf.iter().map(|v| v.to_f32().unwrap_or(0.0)).collect()
}

fn load_raster(path: &Path) -> Result<RawImage, LoadError> {
    let img = image::open(path).map_err(|source| LoadError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let (width, height) = (img.width() as usize, img.height() as usize);
    let channels = img.color().channel_count() as usize;

    let samples: Vec<u16> = match channels {
        1 => DynamicImage::into_luma16(img).into_raw(),
        2 => DynamicImage::into_luma_alpha16(img).into_raw(),
        3 => DynamicImage::into_rgb16(img).into_raw(),
        _ => DynamicImage::into_rgba16(img).into_raw(),
    };

    let mut shape = vec![height, width];
    if channels > 1 {
        shape.push(channels.min(4));
    }
    RawImage::new(shape, to_f32_samples(&samples))
}

use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// How an input raster is conditioned before recognition.
///
/// `Sharpen` is the default. `Threshold` trades detail for cleaner glyph
/// edges and tends to do better on low-contrast card scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreprocessStrategy {
    /// Grayscale conversion, then a 3×3 sharpening convolution.
    #[default]
    Sharpen,
    /// 2× bilinear upscale, grayscale conversion, then a binary threshold
    /// at luminance 150.
    Threshold,
}

impl std::fmt::Display for PreprocessStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreprocessStrategy::Sharpen => write!(f, "sharpen"),
            PreprocessStrategy::Threshold => write!(f, "threshold"),
        }
    }
}

impl std::str::FromStr for PreprocessStrategy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sharpen" => Ok(PreprocessStrategy::Sharpen),
            "threshold" => Ok(PreprocessStrategy::Threshold),
            other => Err(format!("Unknown preprocess strategy: '{other}'")),
        }
    }
}

/// Decode raw image bytes (JPEG / PNG / WEBP / …), condition them for OCR
/// with the chosen strategy, and return PNG bytes.
pub fn prepare_for_ocr(
    data: &[u8],
    strategy: PreprocessStrategy,
) -> Result<Vec<u8>, PreprocessError> {
    let img = image::load_from_memory(data)?;
    encode_as_png(apply(img, strategy))
}

fn apply(img: DynamicImage, strategy: PreprocessStrategy) -> DynamicImage {
    // `to_luma8` flattens any alpha channel as part of the conversion.
    match strategy {
        PreprocessStrategy::Sharpen => sharpen(img.to_luma8()),
        PreprocessStrategy::Threshold => threshold(upscale(img).to_luma8(), 150),
    }
}

const SHARPEN_KERNEL: [[f32; 3]; 3] = [
    [0.0, -0.5, 0.0],
    [-0.5, 3.0, -0.5],
    [0.0, -0.5, 0.0],
];

/// 3×3 sharpening convolution. Edge pixels are copied through unmodified;
/// the kernel is never extrapolated past the image border. Degenerate images
/// (1×1, 1×N) have no interior and pass through unchanged.
fn sharpen(gray: GrayImage) -> DynamicImage {
    let (w, h) = gray.dimensions();
    let mut out = gray.clone();
    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            let mut acc = 0.0f32;
            for (ky, row) in SHARPEN_KERNEL.iter().enumerate() {
                for (kx, k) in row.iter().enumerate() {
                    let px = gray.get_pixel(x + kx as u32 - 1, y + ky as u32 - 1)[0];
                    acc += f32::from(px) * k;
                }
            }
            out.put_pixel(x, y, Luma([acc.clamp(0.0, 255.0) as u8]));
        }
    }
    DynamicImage::ImageLuma8(out)
}

fn upscale(img: DynamicImage) -> DynamicImage {
    img.resize_exact(
        img.width() * 2,
        img.height() * 2,
        image::imageops::FilterType::Triangle,
    )
}

/// Binary threshold: pixels below `cut` go black, the rest go white.
fn threshold(gray: GrayImage, cut: u8) -> DynamicImage {
    let out: GrayImage = ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] < cut {
            Luma([0])
        } else {
            Luma([255])
        }
    });
    DynamicImage::ImageLuma8(out)
}

fn encode_as_png(img: DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}

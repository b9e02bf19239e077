use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use std::io::Cursor;
use thiserror::Error;

/// Pixels brighter than this become white, the rest black.
pub const BINARIZE_THRESHOLD: u8 = 150;

/// Longest side accepted before down-scaling.
const MAX_SIDE: u32 = 2800;

/// Gaussian sigma used to suppress sensor noise before thresholding.
const DENOISE_SIGMA: f32 = 1.0;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to load image: {0}")]
    Load(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// Decode raw image bytes (JPEG / PNG / WEBP / …), clean them up for OCR and
/// return PNG bytes.
pub fn prepare_for_ocr_from_bytes(data: &[u8]) -> Result<Vec<u8>, PreprocessError> {
    let img = image::load_from_memory(data)?;
    encode_as_png(DynamicImage::ImageLuma8(binarize(img)))
}

/// Grayscale → denoise → fixed-threshold binarization.
fn binarize(img: DynamicImage) -> GrayImage {
    let img = if img.width() > MAX_SIDE || img.height() > MAX_SIDE {
        img.resize(MAX_SIDE, MAX_SIDE, image::imageops::FilterType::Lanczos3)
    } else {
        img
    };

    let gray = image::imageops::blur(&img.to_luma8(), DENOISE_SIGMA);

    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] > BINARIZE_THRESHOLD {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

fn encode_as_png(img: DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}

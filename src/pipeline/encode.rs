//! Image normalisation: uploaded image bytes → bounded PNG bytes.
//!
//! Vision APIs accept images as base64 inline data. PNG is chosen over JPEG
//! because it is lossless; text crispness matters far more than file size
//! for text recognition. Phone photos of contracts are often 4000 px or
//! more on the long edge, so the image is first scaled down to
//! `max_image_pixels`, keeping request bodies bounded.

use crate::error::ExtractionError;
use image::imageops::FilterType;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Decode any supported image format, cap its longest edge, re-encode as PNG.
pub fn normalise_image(bytes: &[u8], max_pixels: u32) -> Result<Vec<u8>, ExtractionError> {
    let img = image::load_from_memory(bytes).map_err(|e| ExtractionError::UnreadableImage {
        detail: e.to_string(),
    })?;
    let img = downscale(img, max_pixels);
    encode_png(&img)
}

/// Shrink `img` so neither edge exceeds `max_pixels`. Smaller images pass through.
fn downscale(img: DynamicImage, max_pixels: u32) -> DynamicImage {
    if img.width() <= max_pixels && img.height() <= max_pixels {
        return img;
    }
    let resized = img.resize(max_pixels, max_pixels, FilterType::Lanczos3);
    debug!(
        "Downscaled image {}x{} → {}x{}",
        img.width(),
        img.height(),
        resized.width(),
        resized.height()
    );
    resized
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, ExtractionError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| ExtractionError::UnreadableImage {
            detail: format!("PNG encoding failed: {e}"),
        })?;
    debug!("Encoded image → {} bytes PNG", buf.len());
    Ok(buf)
}

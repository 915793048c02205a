//! Stored album thumbnail encoding
//!
//! Two candidates are encoded at low JPEG quality: the image as-is, and a
//! "blurred-edge" version where the image is clipped to an inscribed circle
//! over a heavily downscaled copy of itself. Whichever is smaller is kept.

use bridge_traits::artwork::DecodedArtwork;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use tracing::debug;

use crate::error::{MetadataError, Result};

pub const THUMBNAIL_JPEG_QUALITY: u8 = 20;

/// Downscale factor of the blurred background, with a floor of 8 pixels.
const BLUR_FACTOR: u32 = 8;
const BLUR_MIN_SIZE: u32 = 8;

/// Encode the bytes stored on an album.
pub fn encode_thumbnail(artwork: &DecodedArtwork) -> Result<Vec<u8>> {
    let source = to_rgb_image(artwork)?;

    let plain = encode_jpeg(&source)?;
    let blurred = encode_jpeg(&blur_edges(&source))?;

    debug!(plain = plain.len(), blurred = blurred.len(), "Encoded thumbnail candidates");
    Ok(if blurred.len() < plain.len() { blurred } else { plain })
}

fn to_rgb_image(artwork: &DecodedArtwork) -> Result<RgbImage> {
    RgbImage::from_raw(artwork.width, artwork.height, artwork.rgb.to_vec()).ok_or_else(|| {
        MetadataError::ImageError(format!(
            "pixel buffer does not match {}x{}",
            artwork.width, artwork.height
        ))
    })
}

fn encode_jpeg(img: &RgbImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, THUMBNAIL_JPEG_QUALITY);
    DynamicImage::ImageRgb8(img.clone()).write_with_encoder(encoder)?;
    Ok(buffer)
}

/// Source clipped to a circle of radius `min(w, h) / 2 - 2` at the centre,
/// over a background upscaled from a 1/8 size copy.
pub fn blur_edges(source: &RgbImage) -> RgbImage {
    let (width, height) = source.dimensions();

    let small = imageops::resize(
        source,
        (width / BLUR_FACTOR).max(BLUR_MIN_SIZE),
        (height / BLUR_FACTOR).max(BLUR_MIN_SIZE),
        FilterType::Triangle,
    );
    let mut output = imageops::resize(&small, width, height, FilterType::Triangle);

    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let radius = width.min(height) as f32 / 2.0 - 2.0;
    if radius <= 0.0 {
        return output;
    }
    let radius_sq = radius * radius;

    for (x, y, pixel) in output.enumerate_pixels_mut() {
        // Sample at pixel centres
        let dx = x as f32 + 0.5 - cx;
        let dy = y as f32 + 0.5 - cy;
        if dx * dx + dy * dy <= radius_sq {
            *pixel = *source.get_pixel(x, y);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn artwork(img: &RgbImage) -> DecodedArtwork {
        DecodedArtwork::new(img.width(), img.height(), img.as_raw().clone()).unwrap()
    }

    fn checkerboard(size: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Rgb([250, 250, 250])
            } else {
                Rgb([10, 30, 200])
            }
        })
    }

    #[test]
    fn test_blur_edges_keeps_centre() {
        let source = checkerboard(64);
        let out = blur_edges(&source);

        assert_eq!(out.dimensions(), (64, 64));
        assert_eq!(out.get_pixel(32, 32), source.get_pixel(32, 32));
        assert_eq!(out.get_pixel(20, 33), source.get_pixel(20, 33));
        // Corners are background
        assert_ne!(out.get_pixel(0, 0), source.get_pixel(0, 0));
    }

    #[test]
    fn test_blur_edges_tiny_image() {
        let source = RgbImage::from_pixel(3, 3, Rgb([1, 2, 3]));
        assert_eq!(blur_edges(&source).dimensions(), (3, 3));
    }

    #[test]
    fn test_thumbnail_is_smaller_candidate() {
        let source = checkerboard(128);
        let bytes = encode_thumbnail(&artwork(&source)).unwrap();

        let plain = encode_jpeg(&source).unwrap();
        let blurred = encode_jpeg(&blur_edges(&source)).unwrap();
        assert_eq!(bytes.len(), plain.len().min(blurred.len()));

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (128, 128));
    }
}

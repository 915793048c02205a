//! Artwork Abstractions
//!
//! An [`ArtworkExtractor`] resolves a track's content reference to a decoded,
//! downsampled cover image. Colour palettes derived from that image are shared
//! across the core (stored albums, preview events), so the palette type lives
//! here next to the image type.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A decoded RGB8 image, row-major, 3 bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedArtwork {
    pub width: u32,
    pub height: u32,
    pub rgb: Bytes,
}

impl DecodedArtwork {
    /// Wrap a pixel buffer, returning `None` if its length does not match the
    /// dimensions.
    pub fn new(width: u32, height: u32, rgb: impl Into<Bytes>) -> Option<Self> {
        let rgb = rgb.into();
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(3)?;
        if width == 0 || height == 0 || rgb.len() != expected {
            return None;
        }
        Some(Self { width, height, rgb })
    }

    /// RGB triple at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        Some([self.rgb[idx], self.rgb[idx + 1], self.rgb[idx + 2]])
    }
}

/// Swatch colours extracted from album artwork, as `0xAARRGGBB`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumPalette {
    pub vibrant: Option<u32>,
    pub dark_vibrant: Option<u32>,
    pub light_vibrant: Option<u32>,
    pub muted: Option<u32>,
    pub dark_muted: Option<u32>,
    pub light_muted: Option<u32>,
    pub dominant: Option<u32>,
}

impl AlbumPalette {
    /// True when no swatch was found.
    pub fn is_empty(&self) -> bool {
        self.vibrant.is_none()
            && self.dark_vibrant.is_none()
            && self.light_vibrant.is_none()
            && self.muted.is_none()
            && self.dark_muted.is_none()
            && self.light_muted.is_none()
            && self.dominant.is_none()
    }
}

/// Extracts cover art for a track.
#[async_trait]
pub trait ArtworkExtractor: Send + Sync {
    /// Decode the artwork behind `content_ref`, downsampled so neither side
    /// exceeds `max_size`.
    ///
    /// Returns `Ok(None)` when the track has no artwork.
    async fn extract_artwork(&self, content_ref: &str, max_size: u32)
        -> Result<Option<DecodedArtwork>>;
}

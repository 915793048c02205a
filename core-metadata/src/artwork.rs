//! Embedded Artwork Extraction
//!
//! Pulls the cover picture out of an audio file's tags, decodes it with the
//! `image` crate and downsamples it to fit a requested bounding box.
//!
//! Content references are `file://` URIs as produced by the desktop media
//! index. A bare filesystem path is accepted as well.

use async_trait::async_trait;
use bridge_traits::artwork::{ArtworkExtractor, DecodedArtwork};
use image::DynamicImage;
use lofty::file::TaggedFileExt;
use lofty::picture::{Picture, PictureType};
use lofty::probe::Probe;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use crate::error::{MetadataError, Result};

const FILE_SCHEME: &str = "file://";

/// Filesystem path behind a content reference.
pub fn content_ref_to_path(content_ref: &str) -> PathBuf {
    PathBuf::from(content_ref.strip_prefix(FILE_SCHEME).unwrap_or(content_ref))
}

/// Decode encoded image bytes and shrink them to fit in `max_size` x
/// `max_size`, preserving aspect ratio. Smaller images are not upscaled.
pub fn decode_artwork(data: &[u8], max_size: u32) -> Result<DecodedArtwork> {
    let img = image::load_from_memory(data)?;
    let img = fit_within(img, max_size.max(1));
    into_decoded(img)
}

fn fit_within(img: DynamicImage, max_size: u32) -> DynamicImage {
    if img.width() <= max_size && img.height() <= max_size {
        img
    } else {
        img.thumbnail(max_size, max_size)
    }
}

pub(crate) fn into_decoded(img: DynamicImage) -> Result<DecodedArtwork> {
    let rgb = img.into_rgb8();
    let (width, height) = rgb.dimensions();
    DecodedArtwork::new(width, height, rgb.into_raw())
        .ok_or_else(|| MetadataError::ImageError(format!("empty image {}x{}", width, height)))
}

/// Front cover if tagged as such, otherwise the first picture.
fn pick_cover(pictures: &[Picture]) -> Option<&Picture> {
    pictures
        .iter()
        .find(|p| p.pic_type() == PictureType::CoverFront)
        .or_else(|| pictures.first())
}

/// Reads embedded cover art with `lofty`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedArtworkExtractor;

impl EmbeddedArtworkExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous extraction, `Ok(None)` when the file has no usable picture.
    pub fn extract_blocking(path: &Path, max_size: u32) -> Result<Option<DecodedArtwork>> {
        if !path.exists() {
            return Err(MetadataError::FileNotFound(path.display().to_string()));
        }

        let tagged_file = Probe::open(path)
            .and_then(|probe| probe.read())
            .map_err(|e| MetadataError::ExtractionFailed(format!("{}: {}", path.display(), e)))?;

        let picture = tagged_file
            .primary_tag()
            .and_then(|tag| pick_cover(tag.pictures()))
            .or_else(|| {
                tagged_file
                    .tags()
                    .iter()
                    .find_map(|tag| pick_cover(tag.pictures()))
            });

        let Some(picture) = picture else {
            debug!("No embedded artwork");
            return Ok(None);
        };

        if picture.data().is_empty() {
            return Ok(None);
        }

        decode_artwork(picture.data(), max_size).map(Some)
    }
}

#[async_trait]
impl ArtworkExtractor for EmbeddedArtworkExtractor {
    #[instrument(skip(self))]
    async fn extract_artwork(
        &self,
        content_ref: &str,
        max_size: u32,
    ) -> bridge_traits::error::Result<Option<DecodedArtwork>> {
        let path = content_ref_to_path(content_ref);

        let result = tokio::task::spawn_blocking(move || Self::extract_blocking(&path, max_size))
            .await
            .map_err(|e| MetadataError::ImageError(format!("artwork task failed: {}", e)))?;

        Ok(result?)
    }
}

//! Bridge resolution
//!
//! Host-injected bridges on [`CoreConfig`] win. Anything left unset falls
//! back to the desktop implementations when the `desktop-shims` feature is
//! enabled and is reported as a missing capability otherwise.

use std::sync::Arc;

use bridge_traits::{ArtworkExtractor, MediaIndex, TagReader};
use core_runtime::config::CoreConfig;
use tracing::debug;

use crate::error::Result;

pub(crate) struct Bridges {
    pub media_index: Arc<dyn MediaIndex>,
    pub tag_reader: Arc<dyn TagReader>,
    pub artwork: Arc<dyn ArtworkExtractor>,
}

impl Bridges {
    pub fn resolve(config: &CoreConfig) -> Result<Self> {
        Ok(Self {
            media_index: match &config.media_index {
                Some(index) => Arc::clone(index),
                None => default_media_index(config)?,
            },
            tag_reader: match &config.tag_reader {
                Some(reader) => Arc::clone(reader),
                None => default_tag_reader()?,
            },
            artwork: match &config.artwork_extractor {
                Some(extractor) => Arc::clone(extractor),
                None => default_artwork_extractor()?,
            },
        })
    }
}

#[cfg(feature = "desktop-shims")]
fn default_media_index(config: &CoreConfig) -> Result<Arc<dyn MediaIndex>> {
    debug!(roots = config.music_roots.len(), "Using filesystem media index");
    Ok(Arc::new(
        bridge_desktop::FilesystemMediaIndex::from_config(config),
    ))
}

#[cfg(feature = "desktop-shims")]
fn default_tag_reader() -> Result<Arc<dyn TagReader>> {
    debug!("Using lofty tag reader");
    Ok(Arc::new(core_metadata::LoftyTagReader::new()))
}

#[cfg(feature = "desktop-shims")]
fn default_artwork_extractor() -> Result<Arc<dyn ArtworkExtractor>> {
    debug!("Using embedded artwork extractor");
    Ok(Arc::new(core_metadata::EmbeddedArtworkExtractor::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn missing(capability: &str) -> crate::error::CoreError {
    debug!(capability, "No bridge configured");
    crate::error::CoreError::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "No {capability} configured. Inject one on CoreConfig or enable the desktop-shims feature."
        ),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn default_media_index(_config: &CoreConfig) -> Result<Arc<dyn MediaIndex>> {
    Err(missing("MediaIndex"))
}

#[cfg(not(feature = "desktop-shims"))]
fn default_tag_reader() -> Result<Arc<dyn TagReader>> {
    Err(missing("TagReader"))
}

#[cfg(not(feature = "desktop-shims"))]
fn default_artwork_extractor() -> Result<Arc<dyn ArtworkExtractor>> {
    Err(missing("ArtworkExtractor"))
}

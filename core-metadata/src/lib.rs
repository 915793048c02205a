//! # Metadata Module
//!
//! Desktop tag and artwork collaborators, plus the rules that turn raw tags
//! into library fields.
//!
//! ## Overview
//!
//! This module handles:
//! - Audio tag reading with `lofty` ([`LoftyTagReader`])
//! - Per-field parsing and defaults ([`TrackMetadata`])
//! - Embedded artwork decoding ([`EmbeddedArtworkExtractor`])
//! - Swatch extraction from artwork ([`generate_palette`])
//! - Encoding of stored album thumbnails ([`encode_thumbnail`])

pub mod artwork;
pub mod error;
pub mod fields;
pub mod palette;
pub mod reader;
pub mod thumbnail;

pub use artwork::EmbeddedArtworkExtractor;
pub use error::{MetadataError, Result};
pub use fields::TrackMetadata;
pub use palette::generate_palette;
pub use reader::LoftyTagReader;
pub use thumbnail::encode_thumbnail;

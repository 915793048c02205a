//! # Host Bridge Traits
//!
//! Collaborator traits the discovery engine depends on but does not implement
//! itself.
//!
//! ## Overview
//!
//! The engine is written against these traits so that each host can plug in
//! its own media index, tag reader and artwork source. Desktop defaults live in
//! `bridge-desktop` (media index) and `core-metadata` (tags, artwork).
//!
//! ## Traits
//!
//! - [`MediaIndex`](media::MediaIndex) - Enumerates audio files, hands out
//!   content references and accepts rescan requests
//! - [`GenerationOracle`](media::GenerationOracle) - Cheap "has anything
//!   changed" token for the media index
//! - [`TagReader`](tags::TagReader) - Raw tag fields for one file
//! - [`ArtworkExtractor`](artwork::ArtworkExtractor) - Decoded, downsampled
//!   cover art for one track
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it and keep messages actionable (file
//! paths, what was attempted).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`; the engine calls them from many
//! tasks at once.

pub mod artwork;
pub mod error;
pub mod media;
pub mod tags;

pub use error::BridgeError;

pub use artwork::{AlbumPalette, ArtworkExtractor, DecodedArtwork};
pub use media::{GenerationOracle, MediaIndex, RawFileRef, RescanProgress};
pub use tags::{RawTags, TagReader};

//! # Repository Pattern Implementation
//!
//! Data access for the library cache.
//!
//! ## Available Repositories
//!
//! - `LibraryCache` - Config values and wholesale track/album replacement,
//!   the write side used by sync
//! - `TrackRepository` - Track queries, play queues and favorites
//! - `AlbumRepository` - Album queries
//! - `ArtistRepository` - Artist names and aggregated summaries
//!
//! All SQLite implementations hold a clone of the same `SqlitePool`.

pub mod album;
pub mod artist;
pub mod cache;
pub mod pagination;
pub mod track;

pub use album::{AlbumRepository, SqliteAlbumRepository};
pub use artist::{ArtistRepository, SqliteArtistRepository};
pub use cache::{LibraryCache, SqliteLibraryCache, GENERATION_KEY};
pub use pagination::{Page, PageRequest};
pub use track::{SqliteTrackRepository, TrackRepository};

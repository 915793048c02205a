//! # Library Cache Module
//!
//! Owns the persisted music library: tracks, albums and a small key/value
//! config table.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite schema and migrations (`db`)
//! - Domain models with derived album identity (`models`)
//! - The sync-facing write API and per-entity read repositories
//!   (`repositories`)
//! - Typed user settings stored alongside engine bookkeeping (`settings`)

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;
pub mod settings;

pub use error::{LibraryError, Result};
pub use models::{album_id, Album, ArtistSummary, Track, TrackQueueItem};
pub use repositories::{LibraryCache, SqliteLibraryCache};

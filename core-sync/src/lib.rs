//! # Library Discovery & Sync
//!
//! Rebuilds the local library from the host media index.
//!
//! ## Overview
//!
//! A sync run:
//! - Checks the media index generation and skips when nothing changed
//! - Enumerates audio files
//! - Extracts metadata concurrently, publishing album previews as they appear
//! - Reconciles the results into tracks and albums
//! - Commits everything to the library cache in one transaction
//!
//! ## Components
//!
//! - **Sync Coordinator** (`coordinator`): Serializes runs, owns the discovery
//!   state and handles cancellation
//! - **Extraction Pipeline** (`pipeline`): Bounded, order-preserving fan-out
//!   over the tag reader
//! - **Library Reconciler** (`reconciler`): Album grouping, thumbnails and
//!   palettes

pub mod coordinator;
pub mod error;
pub mod pipeline;
pub mod reconciler;

pub use coordinator::{DiscoveryResult, RunId, SyncConfig, SyncCoordinator};
pub use error::{Result, SyncError};
pub use pipeline::{MetadataExtractionPipeline, PipelineConfig};
pub use reconciler::LibraryReconciler;

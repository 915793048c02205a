//! # Desktop Bridge Implementations
//!
//! Default media index for desktop platforms (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `FilesystemMediaIndex` walks the configured music roots with `walkdir`,
//!   filters by extension and fingerprints the result with SHA-256 to provide
//!   a generation token.
//!
//! Tag and artwork readers for desktop live in `core-metadata`.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::FilesystemMediaIndex;
//! use bridge_traits::MediaIndex;
//!
//! #[tokio::main]
//! async fn main() {
//!     let index = FilesystemMediaIndex::with_default_extensions(vec!["/home/me/Music".into()]);
//!     let files = index.enumerate_audio_files().await.unwrap();
//!     println!("{} files", files.len());
//! }
//! ```

mod media_index;

pub use media_index::FilesystemMediaIndex;

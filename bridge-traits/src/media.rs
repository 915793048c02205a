//! Media Index Abstractions
//!
//! The media index is the authoritative list of audio files on the device. The
//! core never walks storage on its own; it asks the host's index for the
//! current file set, a content reference per file, and a generation token that
//! changes whenever the file set changes.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// A single audio file as reported by the media index.
///
/// `id` is assigned by the index and is stable for the same file across
/// enumerations. Instances only live for the duration of one discovery run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawFileRef {
    pub id: i64,
    pub path: PathBuf,
}

impl RawFileRef {
    pub fn new(id: i64, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            path: path.into(),
        }
    }

    /// File name without its extension, used as the fallback track title.
    pub fn file_stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Progress of an explicit rescan request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RescanProgress {
    /// Files processed so far
    pub completed: usize,
    /// Total files found under the rescanned root
    pub total: usize,
}

/// Source of the media index generation token.
///
/// The token is opaque: callers compare it for equality only and never order
/// it. Implementations fail soft. Any internal error is reported as `None`,
/// which simply disables the "nothing changed" shortcut.
#[async_trait]
pub trait GenerationOracle: Send + Sync {
    /// Current generation of the index, or `None` if unsupported or unavailable.
    async fn current_generation(&self) -> Option<i64>;
}

/// Host media index.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::media::MediaIndex;
///
/// async fn count_tracks(index: &dyn MediaIndex) -> Result<usize> {
///     Ok(index.enumerate_audio_files().await?.len())
/// }
/// ```
#[async_trait]
pub trait MediaIndex: GenerationOracle {
    /// Enumerate every file the index classifies as music.
    ///
    /// # Errors
    ///
    /// A failure here fails the whole discovery run.
    async fn enumerate_audio_files(&self) -> Result<Vec<RawFileRef>>;

    /// Content reference for a file, usable by an
    /// [`ArtworkExtractor`](crate::artwork::ArtworkExtractor) and stored as the
    /// track URI.
    fn content_ref(&self, file: &RawFileRef) -> String;

    /// Filesystem roots covered by this index.
    fn roots(&self) -> Vec<PathBuf>;

    /// Ask the index to re-read everything under `root`.
    ///
    /// `progress` is invoked from the calling task. The first call reports
    /// `completed = 0` with the final `total`. Dropping the returned future
    /// abandons the rescan between batches.
    async fn request_rescan(
        &self,
        root: &Path,
        progress: &(dyn Fn(RescanProgress) + Send + Sync),
    ) -> Result<()>;
}

//! Tag Reading Abstractions
//!
//! A [`TagReader`] turns one audio file into a flat map of textual tag fields.
//! Readers do no interpretation: splitting `"1/9"` track numbers, stripping
//! `" dB"` gain suffixes and choosing between lyrics fields all happen in the
//! core.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;

/// Canonical field names used by readers for well-known tags.
///
/// Fields the reader has no canonical name for are stored under the raw key
/// found in the file (for example `UNSYNCEDLYRICS` or a lower-case `lyrics`).
pub mod keys {
    pub const TITLE: &str = "TITLE";
    pub const ARTIST: &str = "ARTIST";
    pub const ALBUM: &str = "ALBUM";
    pub const TRACK_NUMBER: &str = "TRACKNUMBER";
    pub const DISC_NUMBER: &str = "DISCNUMBER";
    pub const LYRICS: &str = "LYRICS";
    pub const REPLAYGAIN_TRACK_GAIN: &str = "REPLAYGAIN_TRACK_GAIN";
    pub const REPLAYGAIN_TRACK_PEAK: &str = "REPLAYGAIN_TRACK_PEAK";
    pub const REPLAYGAIN_ALBUM_GAIN: &str = "REPLAYGAIN_ALBUM_GAIN";
    pub const REPLAYGAIN_ALBUM_PEAK: &str = "REPLAYGAIN_ALBUM_PEAK";
}

/// Raw tag fields read from a single file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTags {
    fields: HashMap<String, String>,
    /// Audio duration reported by the container, if known
    pub duration_ms: Option<u64>,
}

impl RawTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly useful in tests.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Insert a field. The first value wins when a key repeats.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.entry(key.into()).or_insert_with(|| value.into());
    }

    /// Look up a field, treating blank values as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Reads raw tags from an audio file.
///
/// Implementations may block on file I/O and should move that work off the
/// async executor.
#[async_trait]
pub trait TagReader: Send + Sync {
    /// Read all tag fields of the file at `path`.
    ///
    /// # Errors
    ///
    /// Any failure (missing file, unsupported or corrupt format) is per-file;
    /// callers fall back to default metadata.
    async fn read_tags(&self, path: &Path) -> Result<RawTags>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use mockall::mock;

    mock! {
        pub Reader {}

        #[async_trait]
        impl TagReader for Reader {
            async fn read_tags(&self, path: &Path) -> Result<RawTags>;
        }
    }

    #[test]
    fn test_blank_values_are_absent() {
        let tags = RawTags::new()
            .with_field(keys::TITLE, "   ")
            .with_field(keys::ARTIST, "Megadeth");

        assert_eq!(tags.get(keys::TITLE), None);
        assert_eq!(tags.get(keys::ARTIST), Some("Megadeth"));
        assert_eq!(tags.get(keys::ALBUM), None);
    }

    #[test]
    fn test_first_value_wins() {
        let mut tags = RawTags::new();
        tags.insert(keys::LYRICS, "first");
        tags.insert(keys::LYRICS, "second");

        assert_eq!(tags.get(keys::LYRICS), Some("first"));
        assert_eq!(tags.len(), 1);
    }

    #[tokio::test]
    async fn test_reader_is_object_safe() {
        let mut reader = MockReader::new();
        reader
            .expect_read_tags()
            .returning(|_| Err(BridgeError::NotFound("missing.mp3".to_string())));

        let reader: Box<dyn TagReader> = Box::new(reader);
        let result = reader.read_tags(Path::new("missing.mp3")).await;
        assert!(matches!(result, Err(BridgeError::NotFound(_))));
    }
}

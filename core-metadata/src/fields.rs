//! Per-track metadata derived from raw tag fields
//!
//! Every field is looked up through an ordered list of tag keys and a parser.
//! The first key with a non-blank value decides; if its value does not parse,
//! the field takes its default.

use bridge_traits::tags::{keys, RawTags};
use bridge_traits::RawFileRef;
use serde::{Deserialize, Serialize};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Everything the library needs from one file's tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    /// Media index id
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub album_name: String,
    pub duration_ms: i64,
    pub track_number: i32,
    pub disc_number: i32,
    pub lyrics: Option<String>,
    pub track_gain: Option<f32>,
    pub track_peak: Option<f32>,
    pub album_gain: Option<f32>,
    pub album_peak: Option<f32>,
}

/// An ordered key list plus the parser applied to the winning value.
pub struct FieldRule<T> {
    pub keys: &'static [&'static str],
    pub parse: fn(&str) -> Option<T>,
}

impl<T> FieldRule<T> {
    /// Apply the rule. `None` if no key is present or the value is unparseable.
    pub fn apply(&self, tags: &RawTags) -> Option<T> {
        self.keys
            .iter()
            .find_map(|key| tags.get(key))
            .and_then(self.parse)
    }
}

pub const TITLE: FieldRule<String> = FieldRule {
    keys: &[keys::TITLE],
    parse: parse_text,
};

pub const ARTIST: FieldRule<String> = FieldRule {
    keys: &[keys::ARTIST],
    parse: parse_artist,
};

pub const ALBUM: FieldRule<String> = FieldRule {
    keys: &[keys::ALBUM],
    parse: parse_text,
};

pub const TRACK_NUMBER: FieldRule<i32> = FieldRule {
    keys: &[keys::TRACK_NUMBER],
    parse: parse_position,
};

pub const DISC_NUMBER: FieldRule<i32> = FieldRule {
    keys: &[keys::DISC_NUMBER],
    parse: parse_position,
};

pub const LYRICS: FieldRule<String> = FieldRule {
    keys: &[keys::LYRICS, "lyrics", "UNSYNCEDLYRICS", "unsyncedlyrics"],
    parse: parse_text,
};

pub const TRACK_GAIN: FieldRule<f32> = FieldRule {
    keys: &[keys::REPLAYGAIN_TRACK_GAIN],
    parse: parse_gain,
};

pub const TRACK_PEAK: FieldRule<f32> = FieldRule {
    keys: &[keys::REPLAYGAIN_TRACK_PEAK],
    parse: parse_peak,
};

pub const ALBUM_GAIN: FieldRule<f32> = FieldRule {
    keys: &[keys::REPLAYGAIN_ALBUM_GAIN],
    parse: parse_gain,
};

pub const ALBUM_PEAK: FieldRule<f32> = FieldRule {
    keys: &[keys::REPLAYGAIN_ALBUM_PEAK],
    parse: parse_peak,
};

fn parse_text(value: &str) -> Option<String> {
    Some(value.to_string())
}

/// Drops a `" feat."` credit and everything after it.
///
/// ```
/// use core_metadata::fields::parse_artist;
///
/// assert_eq!(parse_artist("Artist feat. Someone Else").as_deref(), Some("Artist"));
/// assert_eq!(parse_artist("Featured").as_deref(), Some("Featured"));
/// ```
pub fn parse_artist(value: &str) -> Option<String> {
    let artist = match value.find(" feat.") {
        Some(idx) => &value[..idx],
        None => value,
    };
    Some(artist.to_string())
}

/// `"3/12"` -> 3
pub fn parse_position(value: &str) -> Option<i32> {
    value.split('/').next()?.trim().parse().ok()
}

/// `"-6.5 dB"` -> -6.5
pub fn parse_gain(value: &str) -> Option<f32> {
    parse_float(&value.replace(" dB", ""))
}

pub fn parse_peak(value: &str) -> Option<f32> {
    parse_float(value)
}

fn parse_float(value: &str) -> Option<f32> {
    value.trim().parse::<f32>().ok().filter(|v| v.is_finite())
}

impl TrackMetadata {
    /// Metadata for a file whose tags could not be read.
    pub fn fallback(file: &RawFileRef) -> Self {
        Self {
            id: file.id,
            title: file.file_stem(),
            artist: UNKNOWN_ARTIST.to_string(),
            album_name: UNKNOWN_ALBUM.to_string(),
            duration_ms: 0,
            track_number: 0,
            disc_number: 0,
            lyrics: None,
            track_gain: None,
            track_peak: None,
            album_gain: None,
            album_peak: None,
        }
    }

    /// Apply the field rules to `tags`, falling back per field.
    pub fn from_tags(file: &RawFileRef, tags: &RawTags) -> Self {
        let fallback = Self::fallback(file);

        Self {
            id: file.id,
            title: TITLE.apply(tags).unwrap_or(fallback.title),
            artist: ARTIST.apply(tags).unwrap_or(fallback.artist),
            album_name: ALBUM.apply(tags).unwrap_or(fallback.album_name),
            duration_ms: tags
                .duration_ms
                .and_then(|ms| i64::try_from(ms).ok())
                .unwrap_or(0),
            track_number: TRACK_NUMBER.apply(tags).unwrap_or(0),
            disc_number: DISC_NUMBER.apply(tags).unwrap_or(0),
            lyrics: LYRICS.apply(tags),
            track_gain: TRACK_GAIN.apply(tags),
            track_peak: TRACK_PEAK.apply(tags),
            album_gain: ALBUM_GAIN.apply(tags),
            album_peak: ALBUM_PEAK.apply(tags),
        }
    }
}

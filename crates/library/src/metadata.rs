// FILE: crates/library/src/metadata.rs

use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::Tag;
use std::path::Path;

/// Tag fields used as hints for folder names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    /// Often holds the narrator on audiobook rips
    pub composer: Option<String>,
    pub year: Option<i32>,
}

impl AudioTags {
    pub fn is_empty(&self) -> bool {
        *self == AudioTags::default()
    }

    /// Album artist, falling back to the track artist
    pub fn author(&self) -> Option<&str> {
        self.album_artist.as_deref().or(self.artist.as_deref())
    }
}

fn non_empty(value: Option<impl AsRef<str>>) -> Option<String> {
    value
        .map(|v| v.as_ref().trim().to_string())
        .filter(|v| !v.is_empty())
}

fn leading_year(value: &str) -> Option<i32> {
    let digits: String = value.trim().chars().take(4).collect();
    if digits.len() == 4 && digits.chars().all(|c| c.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}

fn from_tag(tag: &Tag) -> AudioTags {
    let year = tag
        .get_string(&ItemKey::Year)
        .or_else(|| tag.get_string(&ItemKey::RecordingDate))
        .and_then(leading_year);

    AudioTags {
        title: non_empty(tag.title()),
        artist: non_empty(tag.artist()),
        album: non_empty(tag.album()),
        album_artist: non_empty(tag.get_string(&ItemKey::AlbumArtist)),
        composer: non_empty(tag.get_string(&ItemKey::Composer)),
        year,
    }
}

/// Reads the primary tag of an audio file
///
/// Unreadable files and files without tags give `None`; tags are only ever
/// used as hints.
pub fn read_tags(path: &Path) -> Option<AudioTags> {
    let tagged_file = match Probe::open(path).and_then(|probe| probe.read()) {
        Ok(file) => file,
        Err(e) => {
            log::debug!("No readable tags in {}: {}", path.display(), e);
            return None;
        }
    };

    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())?;
    let tags = from_tag(tag);
    (!tags.is_empty()).then_some(tags)
}

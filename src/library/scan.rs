use std::path::Path;

use lofty::prelude::*;
use walkdir::WalkDir;

use crate::config::LibrarySettings;
use crate::error::{Error, Result};

use super::display::{title_from_path, title_from_url};
use super::model::{Track, TrackSource};

const LOCAL_ARTIST: &str = "Local File";
const REMOTE_ARTIST: &str = "Online";

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Title and artist from the file's tags, when it has any.
///
/// Duration stays unknown until the media element loads the track.
fn read_tags(path: &Path) -> (Option<String>, Option<String>) {
    let Ok(tagged) = lofty::read_from_path(path) else {
        return (None, None);
    };
    let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) else {
        return (None, None);
    };

    let clean = |v: Option<std::borrow::Cow<'_, str>>| {
        v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    };
    (clean(tag.title()), clean(tag.artist()))
}

/// Turn a local file into a playlist track.
///
/// Fails with `UnknownSource` when `path` is not a regular file with one of the
/// configured audio extensions.
pub fn track_from_file(path: &Path, settings: &LibrarySettings) -> Result<Track> {
    if !path.is_file() || !is_audio_file(path, settings) {
        return Err(Error::UnknownSource(path.display().to_string()));
    }

    let (title, artist) = read_tags(path);
    Ok(Track::new(
        title.unwrap_or_else(|| title_from_path(path)),
        artist.unwrap_or_else(|| LOCAL_ARTIST.to_string()),
        TrackSource::File(path.to_path_buf()),
    ))
}

/// Turn a URL into a playlist track. No validation happens here; a bad URL
/// fails later, when the media element tries to load it.
pub fn track_from_url(url: &str) -> Track {
    let url = url.trim();
    Track::new(
        title_from_url(url),
        REMOTE_ARTIST.to_string(),
        TrackSource::Url(url.to_string()),
    )
}

/// Collect every audio file under `dir` into tracks, sorted by title.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<Track> {
    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    let mut tracks: Vec<Track> = walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(std::result::Result::ok)
        .filter_map(|entry| match track_from_file(entry.path(), settings) {
            Ok(track) => Some(track),
            Err(e) => {
                if entry.file_type().is_file() {
                    log::debug!("library: skipping {}", e);
                }
                None
            }
        })
        .collect();

    tracks.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
    log::info!("library: found {} track(s) in {}", tracks.len(), dir.display());
    tracks
}

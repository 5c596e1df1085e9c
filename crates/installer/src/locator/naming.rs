//! File names derived from URLs

use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use url::Url;

use crate::manifest::LATEST_FILE_ID;

/// Final segments served by download endpoints; they say nothing about the file
pub const UNINFORMATIVE_SEGMENTS: &[&str] = &["download", LATEST_FILE_ID];

static ID_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+-").expect("id prefix pattern is valid"));

/// Percent-decoded last path segment, if there is a non-empty one
pub fn last_segment(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.last()?;
    if segment.is_empty() {
        return None;
    }
    Some(percent_decode_str(segment).decode_utf8_lossy().into_owned())
}

/// Name to store a response under: the URL's own name unless it is
/// missing or just `download`/`latest`, in which case `fallback` is used.
pub fn file_name_for(url: &Url, fallback: &str) -> String {
    match last_segment(url) {
        Some(name) if !UNINFORMATIVE_SEGMENTS.contains(&name.as_str()) && !name.contains(['/', '\\']) => name,
        _ => fallback.to_string(),
    }
}

/// Default name for a resource whose final URL does not yield one.
///
/// `<fileId>.jar`, except that `latest` is shared by every project and is
/// qualified with the project id so two resources never collide.
pub fn fallback_file_name(project_id: &str, file_id: &str) -> String {
    if file_id == LATEST_FILE_ID {
        format!("{}-{}.jar", project_id, LATEST_FILE_ID)
    } else {
        format!("{}.jar", file_id)
    }
}

/// Whether a file identifier selects a concrete version
pub fn is_numeric_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

/// `238222-just-enough-items` -> `just-enough-items`
pub fn strip_id_prefix(name: &str) -> &str {
    match ID_PREFIX.find(name) {
        Some(prefix) => &name[prefix.end()..],
        None => name,
    }
}

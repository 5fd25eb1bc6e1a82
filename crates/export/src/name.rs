//! Deterministic archive entry names.
//!
//! An entry name is `<id>-<date>[-<slug>][.<ext>]`:
//!
//! - `id` is zero-padded to the width of the highest id in the cache, so
//!   names sort numerically in any file browser,
//! - `date` is the cache insertion date (`YYYY-MM-DD`, UTC),
//! - `slug` is the percent-decoded final path segment of the source URL,
//!   without its extension,
//! - `ext` is whatever the sniffer settled on.
//!
//! The id alone makes every name unique.

use time::UtcDateTime;
use url::Url;

/// Folder used for media that isn't attributed to any feed.
pub const UNSORTED_FOLDER: &str = "_unsorted";

/// Number of decimal digits in `max_id` (at least 1).
///
/// ```
/// use mediapack_export::pad_width;
/// assert_eq!(pad_width(0), 1);
/// assert_eq!(pad_width(9), 1);
/// assert_eq!(pad_width(10), 2);
/// assert_eq!(pad_width(12345), 5);
/// ```
pub fn pad_width(max_id: u64) -> usize {
    max_id.checked_ilog10().map_or(1, |digits| digits as usize + 1)
}

/// Build the archive entry name for a media item.
///
/// ```
/// use mediapack_export::build_name;
/// use time::macros::utc_datetime;
///
/// let created = utc_datetime!(2024-03-04 12:00);
/// assert_eq!(build_name(1, 2, "jpg", "https://x.test/a%20b.JPG?x=1", created), "01-2024-03-04-a b.jpg");
/// assert_eq!(build_name(7, 3, "", "", created), "007-2024-03-04");
/// ```
pub fn build_name(id: i64, pad_width: usize, extension: &str, source_url: &str, created_at: UtcDateTime) -> String {
    let date = created_at.date();
    let base = format!("{id:0pad_width$}-{:04}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day());
    let name = match url_slug(source_url) {
        Some(slug) => format!("{base}-{slug}"),
        None => base,
    };
    if extension.is_empty() { name } else { format!("{name}.{extension}") }
}

/// Percent-decoded stem of the last path segment of an absolute URL.
fn url_slug(source_url: &str) -> Option<String> {
    if source_url.is_empty() {
        return None;
    }
    let url = Url::parse(source_url).ok()?;
    // `data:` and friends have no path segments worth naming a file after.
    if url.cannot_be_a_base() {
        return None;
    }
    let segment = url.path().trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    let stem = segment.rsplit_once('.').map_or(segment, |(stem, _ext)| stem);
    let decoded = urlencoding::decode(stem).map_or_else(|_| stem.to_string(), |decoded| decoded.into_owned());
    let slug = decoded.replace(['/', '\\'], "_");
    (!slug.is_empty()).then_some(slug)
}

/// Turn a feed label into a single, safe archive path component.
///
/// ```
/// use mediapack_export::folder_name;
/// assert_eq!(folder_name("Cats & Dogs"), "Cats & Dogs");
/// assert_eq!(folder_name("News/World"), "News_World");
/// assert_eq!(folder_name("../etc"), "_etc");
/// assert_eq!(folder_name(""), "_unsorted");
/// ```
pub fn folder_name(label: &str) -> String {
    let folder = label.replace(['/', '\\'], "_");
    let folder = folder.trim().trim_start_matches('.');
    if folder.is_empty() { UNSORTED_FOLDER.to_string() } else { folder.to_string() }
}

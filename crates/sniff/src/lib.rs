//! File extension sniffing for cached media.
//!
//! The extension of a cached media item is not reliably known. This crate
//! resolves one through a layered fallback chain, first success wins:
//!
//! 1. the **declared content type** (`image/png`), looked up in a static
//!    registry of `(type, subtype)` pairs ([`MediaKind::from_mime`]),
//! 2. the **URL hint**, the extension of the final path segment when it is a
//!    registered canonical extension ([`MediaKind::from_extension`]),
//! 3. the **content prefix**, matched against magic-byte signatures
//!    ([`MediaKind::from_magic_bytes`]).
//!
//! The cheap hints come first because they decide the *visible* file name;
//! byte sniffing is the fallback for items with neither. [`PeekableReader`]
//! provides the prefix without consuming it, so the same source can be
//! streamed in full afterwards.

pub mod error;
mod peekable;
mod registry;

pub use crate::peekable::PeekableReader;
pub use crate::registry::MediaKind;
use url::Url;

/// Number of leading bytes requested for magic-byte detection. Sources
/// shorter than this are sniffed with whatever they have.
pub const SNIFF_LENGTH: usize = 256 + 128;

/// Resolve a lowercase file extension (without a leading dot) for a media
/// item, or an empty string when no step reaches a conclusion.
///
/// # Examples
///
/// ```
/// use mediapack_sniff::resolve_extension;
///
/// // Declared type wins over everything else.
/// assert_eq!(resolve_extension("image/png", "https://x.test/a.gif", Some(b"GIF89a".as_slice())), "png");
/// // URL hint when the declared type is missing or unknown.
/// assert_eq!(resolve_extension("", "https://x.test/photo.JPG?size=large", None), "jpg");
/// // Magic bytes as a last resort.
/// assert_eq!(resolve_extension("", "", Some(b"\x89PNG\r\n\x1a\n".as_slice())), "png");
/// assert_eq!(resolve_extension("", "", None), "");
/// ```
pub fn resolve_extension(declared_type: &str, source_url: &str, prefix: Option<&[u8]>) -> String {
    if !declared_type.is_empty()
        && let Some(kind) = MediaKind::from_mime(declared_type)
    {
        tracing::trace!(declared_type, extension = kind.extension, "extension from declared type");
        return kind.extension.to_string();
    }
    if !source_url.is_empty()
        && let Some(kind) = url_extension(source_url).as_deref().and_then(MediaKind::from_extension)
    {
        tracing::trace!(source_url, extension = kind.extension, "extension from URL");
        return kind.extension.to_string();
    }
    if let Some(kind) = prefix.and_then(MediaKind::from_magic_bytes) {
        tracing::trace!(extension = kind.extension, "extension from magic bytes");
        return kind.extension.to_string();
    }
    String::new()
}

/// Extension (without the dot) of the final path segment of `source_url`.
///
/// Query strings and fragments never contribute. Strings that don't parse as
/// absolute URLs are treated as bare paths.
fn url_extension(source_url: &str) -> Option<String> {
    match Url::parse(source_url) {
        Ok(url) => last_extension(url.path()).map(str::to_string),
        Err(_) => last_extension(source_url.split(['?', '#']).next().unwrap_or_default()).map(str::to_string),
    }
}

/// `.bashrc` is a dotfile with no extension, not a file named "" with the
/// extension "bashrc".
fn last_extension(path: &str) -> Option<&str> {
    let segment = path.rsplit('/').next().unwrap_or_default();
    let (stem, ext) = segment.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then_some(ext)
}

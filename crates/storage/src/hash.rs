//! Blob keys: hashing source URLs and validating hashes.
//!
//! A hash is used verbatim as a file name on disk, so anything that could be
//! interpreted as a path (separators, `..`, null bytes) is rejected before
//! touching the filesystem.

use crate::error::{ErrorKind, Result};

/// Hash a source URL into the key its cached content is stored under.
///
/// # Examples
///
/// ```
/// use mediapack_storage::hash_url;
///
/// let hash = hash_url("https://example.com/cat.jpg");
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash, hash_url("https://example.com/cat.jpg"));
/// ```
#[must_use]
pub fn hash_url(url: &str) -> String {
    blake3::hash(url.as_bytes()).to_hex().to_string()
}

/// Validates a blob hash for use as a file name.
///
/// Hashes must be non-empty and consist of ASCII alphanumerics, `-` or `_`.
///
/// # Examples
///
/// ```
/// use mediapack_storage::validate_hash;
/// assert!(validate_hash("6f1b17063da85085").is_ok());
/// assert!(validate_hash("").is_err());
/// assert!(validate_hash("../etc/passwd").is_err());
/// ```
pub fn validate(hash: &str) -> Result<&str> {
    if hash.is_empty() || !hash.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_') {
        exn::bail!(ErrorKind::InvalidHash(hash.to_string()));
    }
    Ok(hash)
}

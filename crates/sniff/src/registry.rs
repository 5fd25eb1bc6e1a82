//! Static registry of known media kinds.
//!
//! Each [`MediaKind`] ties a canonical file extension to the MIME types that
//! declare it and a magic-byte matcher that recognizes it. The table is a
//! plain `static` slice: no lazy initialization, nothing to mutate.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// A known media type.
#[derive(Debug)]
pub struct MediaKind {
    /// Canonical extension, lowercase, without a leading dot.
    pub extension: &'static str,
    /// `(type, subtype)` pairs, lowercase. The first pair is the canonical MIME type.
    pub mimes: &'static [(&'static str, &'static str)],
    matcher: fn(&[u8]) -> bool,
}

// Extensions are unique within the registry, so they identify a kind.
impl PartialEq for MediaKind {
    fn eq(&self, other: &Self) -> bool {
        self.extension == other.extension
    }
}
impl Eq for MediaKind {}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.extension)
    }
}

impl MediaKind {
    /// All registered kinds, in magic-byte detection order.
    #[must_use]
    pub fn all() -> &'static [MediaKind] {
        KINDS
    }

    /// The canonical `type/subtype` string.
    #[must_use]
    pub fn mime(&self) -> String {
        let (kind, sub) = self.mimes[0];
        format!("{kind}/{sub}")
    }

    /// Look up a kind by MIME `type` and `subtype`, case-insensitively.
    #[must_use]
    pub fn from_mime_parts(kind: &str, sub: &str) -> Option<&'static MediaKind> {
        KINDS.iter().find(|k| {
            k.mimes.iter().any(|(t, s)| t.eq_ignore_ascii_case(kind) && s.eq_ignore_ascii_case(sub))
        })
    }

    /// Look up a kind by a declared content type such as `image/png` or
    /// `text/html; charset=utf-8`. Parameters and surrounding whitespace are
    /// ignored; a value without a `/` never matches.
    #[must_use]
    pub fn from_mime(content_type: &str) -> Option<&'static MediaKind> {
        let (kind, sub) = split_mime(content_type);
        if kind.is_empty() || sub.is_empty() {
            return None;
        }
        Self::from_mime_parts(kind, sub)
    }

    /// Look up a kind by its canonical extension, case-insensitively. A
    /// leading dot is tolerated.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<&'static MediaKind> {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        if ext.is_empty() {
            return None;
        }
        KINDS.iter().find(|k| k.extension.eq_ignore_ascii_case(ext))
    }

    /// Detect a kind from the leading bytes of the content.
    ///
    /// Returns `None` if no signature matches or if the input is too short to
    /// detect anything.
    #[must_use]
    pub fn from_magic_bytes(bytes: &[u8]) -> Option<&'static MediaKind> {
        KINDS.iter().find(|k| (k.matcher)(bytes))
    }

    /// Verify that `bytes` carry this kind's signature.
    #[must_use]
    pub fn check_magic_bytes(&self, bytes: &[u8]) -> bool {
        (self.matcher)(bytes)
    }
}

/// Split `type/subtype; params` into trimmed `(type, subtype)`. A value with
/// no `/` is all type, no subtype.
pub(crate) fn split_mime(content_type: &str) -> (&str, &str) {
    let essence = content_type.split(';').next().unwrap_or_default();
    match essence.split_once('/') {
        Some((kind, sub)) => (kind.trim(), sub.trim()),
        None => (essence.trim(), ""),
    }
}

// Matchers. Offsets follow the published container specifications.

fn riff(bytes: &[u8], form: &[u8; 4]) -> bool {
    bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == form
}

fn ftyp_brand(bytes: &[u8]) -> Option<&[u8]> {
    (bytes.len() >= 12 && &bytes[4..8] == b"ftyp").then(|| &bytes[8..12])
}

fn ftyp_any(bytes: &[u8], brands: &[&[u8; 4]]) -> bool {
    ftyp_brand(bytes).is_some_and(|brand| brands.iter().any(|b| brand == *b))
}

fn ebml_doctype(bytes: &[u8], doctype: &[u8]) -> bool {
    bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) && bytes.windows(doctype.len()).any(|w| w == doctype)
}

fn is_jpg(b: &[u8]) -> bool {
    b.starts_with(&[0xFF, 0xD8, 0xFF])
}
fn is_png(b: &[u8]) -> bool {
    b.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])
}
fn is_gif(b: &[u8]) -> bool {
    b.starts_with(b"GIF87a") || b.starts_with(b"GIF89a")
}
fn is_webp(b: &[u8]) -> bool {
    riff(b, b"WEBP")
}
fn is_bmp(b: &[u8]) -> bool {
    b.starts_with(b"BM") && b.len() >= 14
}
fn is_tif(b: &[u8]) -> bool {
    b.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || b.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
}
fn is_ico(b: &[u8]) -> bool {
    b.starts_with(&[0x00, 0x00, 0x01, 0x00])
}
fn is_psd(b: &[u8]) -> bool {
    b.starts_with(b"8BPS")
}
fn is_heif(b: &[u8]) -> bool {
    ftyp_any(b, &[b"heic", b"heix", b"hevc", b"hevx", b"mif1", b"msf1"])
}
fn is_avif(b: &[u8]) -> bool {
    ftyp_any(b, &[b"avif", b"avis"])
}
fn is_jxr(b: &[u8]) -> bool {
    b.starts_with(&[0x49, 0x49, 0xBC])
}
fn is_svg(b: &[u8]) -> bool {
    let b = b.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(b);
    let start = b.iter().position(|c| !c.is_ascii_whitespace()).unwrap_or(b.len());
    b[start..].starts_with(b"<") && b.windows(4).any(|w| w == b"<svg")
}
fn is_m4v(b: &[u8]) -> bool {
    ftyp_any(b, &[b"M4V ", b"M4VH", b"M4VP"])
}
fn is_mov(b: &[u8]) -> bool {
    ftyp_any(b, &[b"qt  "]) || (b.len() >= 8 && &b[4..8] == b"moov")
}
fn is_3gp(b: &[u8]) -> bool {
    ftyp_brand(b).is_some_and(|brand| brand.starts_with(b"3gp") || brand.starts_with(b"3g2"))
}
fn is_m4a(b: &[u8]) -> bool {
    ftyp_any(b, &[b"M4A ", b"M4B "])
}
fn is_mp4(b: &[u8]) -> bool {
    ftyp_any(
        b,
        &[
            b"avc1", b"dash", b"iso2", b"iso3", b"iso4", b"iso5", b"iso6", b"isom", b"mmp4", b"mp41", b"mp42",
            b"mp4v", b"mp71", b"MSNV", b"NDAS", b"NDSC", b"NDSH", b"NDSM", b"NDSP", b"NDSS", b"NDXC", b"NDXH",
            b"NDXM", b"NDXP", b"NDXS", b"F4V ", b"F4P ",
        ],
    )
}
fn is_webm(b: &[u8]) -> bool {
    ebml_doctype(b, b"webm")
}
fn is_mkv(b: &[u8]) -> bool {
    ebml_doctype(b, b"matroska")
}
fn is_avi(b: &[u8]) -> bool {
    riff(b, b"AVI ")
}
fn is_wmv(b: &[u8]) -> bool {
    b.starts_with(&[0x30, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11, 0xA6, 0xD9])
}
fn is_mpg(b: &[u8]) -> bool {
    b.len() >= 4 && b.starts_with(&[0x00, 0x00, 0x01]) && (0xB0..=0xBF).contains(&b[3])
}
fn is_flv(b: &[u8]) -> bool {
    b.starts_with(&[0x46, 0x4C, 0x56, 0x01])
}
fn is_mp3(b: &[u8]) -> bool {
    b.starts_with(b"ID3") || (b.len() >= 2 && b[0] == 0xFF && matches!(b[1], 0xFB | 0xF3 | 0xF2))
}
fn is_ogg(b: &[u8]) -> bool {
    b.starts_with(b"OggS")
}
fn is_flac(b: &[u8]) -> bool {
    b.starts_with(b"fLaC")
}
fn is_wav(b: &[u8]) -> bool {
    riff(b, b"WAVE")
}
fn is_mid(b: &[u8]) -> bool {
    b.starts_with(b"MThd")
}
fn is_amr(b: &[u8]) -> bool {
    b.starts_with(b"#!AMR\n")
}
fn is_aac(b: &[u8]) -> bool {
    b.starts_with(&[0xFF, 0xF1]) || b.starts_with(&[0xFF, 0xF9])
}
fn is_aiff(b: &[u8]) -> bool {
    b.len() >= 12 && b.starts_with(b"FORM") && &b[8..12] == b"AIFF"
}
fn is_pdf(b: &[u8]) -> bool {
    b.starts_with(b"%PDF")
}

macro_rules! kind {
    ($ext:literal, [$(($t:literal, $s:literal)),+ $(,)?], $matcher:ident) => {
        MediaKind { extension: $ext, mimes: &[$(($t, $s)),+], matcher: $matcher }
    };
}

// Order matters for detection only where signatures overlap: the ISO base
// media brands are disjoint, but the generic mp4 brands go after the specific
// ones, and webm before mkv (both EBML).
static KINDS: &[MediaKind] = &[
    kind!("jpg", [("image", "jpeg"), ("image", "jpg"), ("image", "pjpeg")], is_jpg),
    kind!("png", [("image", "png"), ("image", "apng"), ("image", "x-png")], is_png),
    kind!("gif", [("image", "gif")], is_gif),
    kind!("webp", [("image", "webp")], is_webp),
    kind!("bmp", [("image", "bmp"), ("image", "x-ms-bmp")], is_bmp),
    kind!("tif", [("image", "tiff")], is_tif),
    kind!("ico", [("image", "vnd.microsoft.icon"), ("image", "x-icon")], is_ico),
    kind!("psd", [("image", "vnd.adobe.photoshop")], is_psd),
    kind!("heif", [("image", "heif"), ("image", "heic")], is_heif),
    kind!("avif", [("image", "avif")], is_avif),
    kind!("jxr", [("image", "vnd.ms-photo"), ("image", "jxr")], is_jxr),
    kind!("svg", [("image", "svg+xml")], is_svg),
    kind!("m4v", [("video", "x-m4v")], is_m4v),
    kind!("mov", [("video", "quicktime")], is_mov),
    kind!("3gp", [("video", "3gpp")], is_3gp),
    kind!("m4a", [("audio", "mp4"), ("audio", "x-m4a"), ("audio", "m4a")], is_m4a),
    kind!("mp4", [("video", "mp4")], is_mp4),
    kind!("webm", [("video", "webm"), ("audio", "webm")], is_webm),
    kind!("mkv", [("video", "x-matroska")], is_mkv),
    kind!("avi", [("video", "x-msvideo"), ("video", "avi")], is_avi),
    kind!("wmv", [("video", "x-ms-wmv")], is_wmv),
    kind!("mpg", [("video", "mpeg")], is_mpg),
    kind!("flv", [("video", "x-flv")], is_flv),
    kind!("mp3", [("audio", "mpeg"), ("audio", "mp3")], is_mp3),
    kind!("ogg", [("audio", "ogg"), ("application", "ogg")], is_ogg),
    kind!("flac", [("audio", "flac"), ("audio", "x-flac")], is_flac),
    kind!("wav", [("audio", "wav"), ("audio", "x-wav"), ("audio", "wave")], is_wav),
    kind!("mid", [("audio", "midi")], is_mid),
    kind!("amr", [("audio", "amr")], is_amr),
    kind!("aac", [("audio", "aac")], is_aac),
    kind!("aiff", [("audio", "x-aiff"), ("audio", "aiff")], is_aiff),
    kind!("pdf", [("application", "pdf")], is_pdf),
];

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("image/jpeg", "jpg")]
    #[case("IMAGE/JPEG", "jpg")]
    #[case("image/pjpeg", "jpg")]
    #[case("image/png", "png")]
    #[case("image/svg+xml", "svg")]
    #[case("video/mp4", "mp4")]
    #[case("audio/mpeg", "mp3")]
    #[case("audio/mp4", "m4a")]
    #[case("image/webp; charset=binary", "webp")]
    #[case(" application/pdf ", "pdf")]
    fn test_from_mime(#[case] content_type: &str, #[case] expected: &str) {
        assert_eq!(MediaKind::from_mime(content_type).map(|k| k.extension), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("image")]
    #[case("image/")]
    #[case("/png")]
    #[case("text/html")]
    #[case("application/octet-stream")]
    fn test_from_mime_unknown(#[case] content_type: &str) {
        assert_eq!(MediaKind::from_mime(content_type), None);
    }

    #[rstest]
    #[case("jpg", Some("jpg"))]
    #[case("JPG", Some("jpg"))]
    #[case(".png", Some("png"))]
    #[case("jpeg", None)]
    #[case("html", None)]
    #[case("", None)]
    #[case(".", None)]
    fn test_from_extension(#[case] ext: &str, #[case] expected: Option<&str>) {
        assert_eq!(MediaKind::from_extension(ext).map(|k| k.extension), expected);
    }

    #[rstest]
    #[case(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10], "jpg")]
    #[case(b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR", "png")]
    #[case(b"GIF89a\x01\x00\x01\x00", "gif")]
    #[case(b"RIFF\x24\x00\x00\x00WEBPVP8 ", "webp")]
    #[case(b"RIFF\x24\x00\x00\x00WAVEfmt ", "wav")]
    #[case(b"RIFF\x24\x00\x00\x00AVI LIST", "avi")]
    #[case(b"\x00\x00\x00\x18ftypisom\x00\x00\x02\x00", "mp4")]
    #[case(b"\x00\x00\x00\x18ftypM4A \x00\x00\x02\x00", "m4a")]
    #[case(b"\x00\x00\x00\x18ftypqt  \x00\x00\x02\x00", "mov")]
    #[case(b"\x00\x00\x00\x18ftypheic\x00\x00\x00\x00", "heif")]
    #[case(b"\x00\x00\x00\x1cftypavif\x00\x00\x00\x00", "avif")]
    #[case(b"\x1a\x45\xdf\xa3\x9f\x42\x86\x81\x01\x42\x82\x84webm", "webm")]
    #[case(b"\x1a\x45\xdf\xa3\xa3\x42\x86\x81\x01\x42\x82\x88matroska", "mkv")]
    #[case(b"ID3\x04\x00\x00\x00\x00\x00\x00", "mp3")]
    #[case(&[0xFF, 0xFB, 0x90, 0x64], "mp3")]
    #[case(&[0xFF, 0xF1, 0x50, 0x80], "aac")]
    #[case(b"OggS\x00\x02", "ogg")]
    #[case(b"fLaC\x00\x00\x00\x22", "flac")]
    #[case(b"%PDF-1.7\n", "pdf")]
    #[case(b"<?xml version=\"1.0\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\"/>", "svg")]
    #[case(b"\x00\x00\x01\xba\x44\x00", "mpg")]
    #[case(b"\x00\x00\x01\x00\x01\x00", "ico")]
    fn test_from_magic_bytes(#[case] bytes: &[u8], #[case] expected: &str) {
        let kind = MediaKind::from_magic_bytes(bytes).unwrap();
        assert_eq!(kind.extension, expected);
        assert!(kind.check_magic_bytes(bytes));
    }

    #[rstest]
    #[case(b"")]
    #[case(b"<!DOCTYPE html><html></html>")]
    #[case(b"just some text")]
    #[case(b"\x00\x00\x00\x18ftypzzzz\x00\x00")]
    #[case(b"RIFF\x24\x00\x00\x00")]
    fn test_from_magic_bytes_unknown(#[case] bytes: &[u8]) {
        assert_eq!(MediaKind::from_magic_bytes(bytes), None);
    }

    #[test]
    fn test_registry_is_consistent() {
        for kind in MediaKind::all() {
            assert_eq!(kind.extension, kind.extension.to_lowercase());
            assert!(!kind.mimes.is_empty());
            assert_eq!(MediaKind::from_extension(kind.extension), Some(kind));
            assert_eq!(MediaKind::from_mime(&kind.mime()), Some(kind));
        }
    }

    #[rstest]
    #[case("image/png", ("image", "png"))]
    #[case("image/png; q=0.9", ("image", "png"))]
    #[case("image", ("image", ""))]
    #[case("", ("", ""))]
    fn test_split_mime(#[case] input: &str, #[case] expected: (&str, &str)) {
        assert_eq!(split_mime(input), expected);
    }
}

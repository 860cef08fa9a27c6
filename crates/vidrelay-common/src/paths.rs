//! Filename utilities.
//!
//! Stored files are addressed by bare filename. Titles coming from upstream
//! are sanitized into filenames with [`media_filename`], and every filename
//! arriving from a request is checked with [`validate_filename`] before it is
//! joined onto the store root.

use crate::error::{Error, Result};

/// Characters that are unsafe in filenames on at least one common filesystem.
const UNSAFE_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Maximum length in bytes of a sanitized title (before the extension).
const MAX_TITLE_BYTES: usize = 200;

/// Fallback stem when a title sanitizes to nothing.
const FALLBACK_TITLE: &str = "video";

/// Extension given to every downloaded media file.
pub const MEDIA_EXTENSION: &str = "mp4";

/// Strip filesystem-unsafe characters from an upstream title.
///
/// Removes `<>:"/\|?*` and control characters, trims surrounding whitespace
/// and leading dots, and caps the result at a fixed byte length on a char
/// boundary.
///
/// # Examples
///
/// ```
/// use vidrelay_common::paths::sanitize_title;
///
/// assert_eq!(sanitize_title("My: \"Clip\" <1/2>?"), "My Clip 12");
/// assert_eq!(sanitize_title("..hidden"), "hidden");
/// ```
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !UNSAFE_CHARS.contains(c) && !c.is_control())
        .collect();

    let trimmed = cleaned
        .trim_start_matches(|c: char| c == '.' || c.is_whitespace())
        .trim_end();

    let mut end = trimmed.len().min(MAX_TITLE_BYTES);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }

    trimmed[..end].trim_end().to_string()
}

/// Build the stored filename for an upstream title.
///
/// # Examples
///
/// ```
/// use vidrelay_common::paths::media_filename;
///
/// assert_eq!(media_filename("Cat | Dog"), "Cat  Dog.mp4");
/// assert_eq!(media_filename("???"), "video.mp4");
/// ```
pub fn media_filename(title: &str) -> String {
    let stem = sanitize_title(title);
    let stem = if stem.is_empty() {
        FALLBACK_TITLE
    } else {
        stem.as_str()
    };
    format!("{stem}.{MEDIA_EXTENSION}")
}

/// Reject filenames that could escape the store root.
///
/// A valid filename is a single non-empty path component: no separators, no
/// NUL, no leading dot (which also rules out `.` and `..`).
pub fn validate_filename(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0']);

    if invalid {
        return Err(Error::invalid_filename(name));
    }

    Ok(())
}

/// Guess the MIME type of a stored file from its extension.
///
/// Everything the relay downloads is MP4, so unknown extensions are served
/// as `video/mp4` too.
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        "m4a" => "audio/mp4",
        "mp3" => "audio/mpeg",
        _ => "video/mp4",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_unsafe_chars() {
        assert_eq!(sanitize_title(r#"a<b>c:d"e/f\g|h?i*j"#), "abcdefghij");
        assert_eq!(sanitize_title("tab\there"), "tabhere");
        assert_eq!(sanitize_title("  spaced out  "), "spaced out");
    }

    #[test]
    fn test_sanitize_strips_leading_dots() {
        assert_eq!(sanitize_title("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_title(". .x"), "x");
    }

    #[test]
    fn test_sanitize_truncates_on_char_boundary() {
        let long = "é".repeat(150);
        let out = sanitize_title(&long);
        assert!(out.len() <= MAX_TITLE_BYTES);
        assert_eq!(out.chars().count(), MAX_TITLE_BYTES / 2);
    }

    #[test]
    fn test_media_filename() {
        assert_eq!(media_filename("Funny cat"), "Funny cat.mp4");
        assert_eq!(media_filename(""), "video.mp4");
        assert_eq!(media_filename("/\\"), "video.mp4");
    }

    #[test]
    fn test_validate_filename() {
        assert!(validate_filename("clip.mp4").is_ok());
        assert!(validate_filename("with space.mp4").is_ok());

        assert!(validate_filename("").is_err());
        assert!(validate_filename(".").is_err());
        assert!(validate_filename("..").is_err());
        assert!(validate_filename(".hidden").is_err());
        assert!(validate_filename("../clip.mp4").is_err());
        assert!(validate_filename("dir/clip.mp4").is_err());
        assert!(validate_filename("dir\\clip.mp4").is_err());
        assert!(validate_filename("nul\0.mp4").is_err());
    }

    #[test]
    fn test_sanitized_names_always_validate() {
        for title in ["../x", "a/b", "..", "", "?*", ".mp4", "ok"] {
            let name = media_filename(title);
            assert!(validate_filename(&name).is_ok(), "{title:?} -> {name:?}");
        }
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("clip.mp4"), "video/mp4");
        assert_eq!(content_type_for("clip.MP4"), "video/mp4");
        assert_eq!(content_type_for("clip.webm"), "video/webm");
        assert_eq!(content_type_for("no_extension"), "video/mp4");
    }
}

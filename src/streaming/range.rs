//! HTTP `Range` header handling.
//!
//! Supports a single byte range per request:
//! - `bytes=0-499`
//! - `bytes=500-` (to the end)
//! - `bytes=-500` (last 500 bytes)
//!
//! Anything else (other units, multiple ranges, garbage) is malformed and is
//! answered with 416 rather than silently falling back to a full response.

use vidrelay_common::{Error, Result};

/// A range as written by the client, before it is checked against a size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// `bytes=start-` or `bytes=start-end`.
    FromStart { start: u64, end: Option<u64> },
    /// `bytes=-len`.
    Suffix { len: u64 },
}

/// An inclusive byte range that lies inside the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered, `end - start + 1`.
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Content-Range` header of a 206 response.
    pub fn content_range(&self, file_size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, file_size)
    }
}

/// Parse a `Range` header value. Returns `None` when it is malformed.
pub fn parse_range_header(value: &str) -> Option<RangeSpec> {
    let spec = value.trim().strip_prefix("bytes=")?;
    if spec.contains(',') {
        return None;
    }

    let (start, end) = spec.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());

    match (start.is_empty(), end.is_empty()) {
        (true, false) => Some(RangeSpec::Suffix {
            len: end.parse().ok()?,
        }),
        (false, true) => Some(RangeSpec::FromStart {
            start: start.parse().ok()?,
            end: None,
        }),
        (false, false) => Some(RangeSpec::FromStart {
            start: start.parse().ok()?,
            end: Some(end.parse().ok()?),
        }),
        (true, true) => None,
    }
}

impl RangeSpec {
    /// Check the range against the file size.
    ///
    /// An end past the last byte is clamped to it; a start past the last
    /// byte, an inverted range, an empty suffix or an empty file make the
    /// range unsatisfiable.
    pub fn resolve(self, file_size: u64) -> Result<ByteRange> {
        let unsatisfiable = Error::RangeNotSatisfiable { size: file_size };
        if file_size == 0 {
            return Err(unsatisfiable);
        }
        let last = file_size - 1;

        match self {
            RangeSpec::FromStart { start, end } => {
                let end = end.unwrap_or(last).min(last);
                if start > end {
                    return Err(unsatisfiable);
                }
                Ok(ByteRange { start, end })
            }
            RangeSpec::Suffix { len } => {
                if len == 0 {
                    return Err(unsatisfiable);
                }
                Ok(ByteRange {
                    start: file_size.saturating_sub(len),
                    end: last,
                })
            }
        }
    }
}

/// Parse and resolve a header in one step.
pub fn resolve_range_header(value: &str, file_size: u64) -> Result<ByteRange> {
    parse_range_header(value)
        .ok_or(Error::RangeNotSatisfiable { size: file_size })?
        .resolve(file_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_closed_range() {
        assert_eq!(
            parse_range_header("bytes=100-199"),
            Some(RangeSpec::FromStart {
                start: 100,
                end: Some(199)
            })
        );
    }

    #[test]
    fn test_parse_open_end() {
        assert_eq!(
            parse_range_header("bytes=500-"),
            Some(RangeSpec::FromStart {
                start: 500,
                end: None
            })
        );
    }

    #[test]
    fn test_parse_suffix() {
        assert_eq!(
            parse_range_header("bytes=-200"),
            Some(RangeSpec::Suffix { len: 200 })
        );
    }

    #[test]
    fn test_parse_malformed() {
        assert_eq!(parse_range_header("bytes=-"), None);
        assert_eq!(parse_range_header("bytes=abc-def"), None);
        assert_eq!(parse_range_header("bytes=1-2,5-9"), None);
        assert_eq!(parse_range_header("items=0-1"), None);
        assert_eq!(parse_range_header("0-1"), None);
        assert_eq!(parse_range_header("bytes=12"), None);
        assert_eq!(parse_range_header("bytes=-1-2"), None);
    }

    #[test]
    fn test_resolve_closed_range() {
        let range = resolve_range_header("bytes=100-199", 1000).unwrap();
        assert_eq!(range, ByteRange { start: 100, end: 199 });
        assert_eq!(range.length(), 100);
        assert_eq!(range.content_range(1000), "bytes 100-199/1000");
    }

    #[test]
    fn test_resolve_open_end_runs_to_last_byte() {
        let range = resolve_range_header("bytes=500-", 1000).unwrap();
        assert_eq!(range, ByteRange { start: 500, end: 999 });
    }

    #[test]
    fn test_resolve_clamps_end() {
        let range = resolve_range_header("bytes=0-5000", 1000).unwrap();
        assert_eq!(range, ByteRange { start: 0, end: 999 });
    }

    #[test]
    fn test_resolve_suffix() {
        assert_eq!(
            resolve_range_header("bytes=-200", 1000).unwrap(),
            ByteRange { start: 800, end: 999 }
        );
        // Longer than the file: the whole file.
        assert_eq!(
            resolve_range_header("bytes=-5000", 1000).unwrap(),
            ByteRange { start: 0, end: 999 }
        );
    }

    #[test]
    fn test_resolve_single_byte() {
        let range = resolve_range_header("bytes=999-999", 1000).unwrap();
        assert_eq!(range.length(), 1);
    }

    #[test]
    fn test_resolve_unsatisfiable() {
        for header in ["bytes=1000-", "bytes=1500-1600", "bytes=200-100", "bytes=-0", "junk"] {
            let err = resolve_range_header(header, 1000).unwrap_err();
            assert_matches!(err, Error::RangeNotSatisfiable { size: 1000 }, "{header}");
        }
    }

    #[test]
    fn test_resolve_empty_file() {
        assert!(resolve_range_header("bytes=0-", 0).is_err());
        assert!(resolve_range_header("bytes=-10", 0).is_err());
    }
}

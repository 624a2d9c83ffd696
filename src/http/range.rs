//! HTTP Range request parsing module
//!
//! Single `bytes=` ranges only (RFC 7233). Multi-range requests are answered
//! with the whole file, which browsers accept for media seeking.

/// Inclusive byte span inside a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub const fn len(self) -> usize {
        self.end - self.start + 1
    }

    pub const fn is_empty(self) -> bool {
        false
    }
}

/// What a `Range` header asks for, relative to a file of known size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOutcome {
    /// Serve the span with 206
    Partial(ByteRange),
    /// Answer 416
    NotSatisfiable,
    /// No usable header, serve the whole file
    Full,
}

/// Evaluate a `Range` header against `file_size`
///
/// # Examples
/// ```
/// use site_preview::http::range::{evaluate_range, ByteRange, RangeOutcome};
///
/// assert_eq!(
///     evaluate_range(Some("bytes=0-99"), 1000),
///     RangeOutcome::Partial(ByteRange { start: 0, end: 99 })
/// );
/// assert_eq!(evaluate_range(None, 1000), RangeOutcome::Full);
/// ```
pub fn evaluate_range(header: Option<&str>, file_size: usize) -> RangeOutcome {
    let Some(spec) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return RangeOutcome::Full;
    };
    if spec.contains(',') {
        return RangeOutcome::Full;
    }
    let Some((first, last)) = spec.split_once('-') else {
        return RangeOutcome::Full;
    };
    let (first, last) = (first.trim(), last.trim());

    if file_size == 0 {
        return RangeOutcome::NotSatisfiable;
    }

    if first.is_empty() {
        // "-500": the final 500 bytes
        return match last.parse::<usize>() {
            Ok(0) => RangeOutcome::NotSatisfiable,
            Ok(suffix) => RangeOutcome::Partial(ByteRange {
                start: file_size.saturating_sub(suffix),
                end: file_size - 1,
            }),
            Err(_) => RangeOutcome::Full,
        };
    }

    let Ok(start) = first.parse::<usize>() else {
        return RangeOutcome::Full;
    };
    if start >= file_size {
        return RangeOutcome::NotSatisfiable;
    }

    let end = if last.is_empty() {
        file_size - 1
    } else {
        match last.parse::<usize>() {
            Ok(end) => end.min(file_size - 1),
            Err(_) => return RangeOutcome::Full,
        }
    };

    if start > end {
        return RangeOutcome::NotSatisfiable;
    }
    RangeOutcome::Partial(ByteRange { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partial(start: usize, end: usize) -> RangeOutcome {
        RangeOutcome::Partial(ByteRange { start, end })
    }

    #[test]
    fn test_bounded_range() {
        assert_eq!(evaluate_range(Some("bytes=0-9"), 100), partial(0, 9));
        assert_eq!(ByteRange { start: 0, end: 9 }.len(), 10);
    }

    #[test]
    fn test_open_ended_range() {
        assert_eq!(evaluate_range(Some("bytes=50-"), 100), partial(50, 99));
    }

    #[test]
    fn test_end_clamped_to_file() {
        assert_eq!(evaluate_range(Some("bytes=90-500"), 100), partial(90, 99));
    }

    #[test]
    fn test_suffix_range() {
        assert_eq!(evaluate_range(Some("bytes=-20"), 100), partial(80, 99));
        assert_eq!(evaluate_range(Some("bytes=-500"), 100), partial(0, 99));
    }

    #[test]
    fn test_not_satisfiable() {
        assert_eq!(
            evaluate_range(Some("bytes=200-"), 100),
            RangeOutcome::NotSatisfiable
        );
        assert_eq!(
            evaluate_range(Some("bytes=-0"), 100),
            RangeOutcome::NotSatisfiable
        );
        assert_eq!(
            evaluate_range(Some("bytes=9-3"), 100),
            RangeOutcome::NotSatisfiable
        );
    }

    #[test]
    fn test_ignored_headers() {
        assert_eq!(evaluate_range(Some("bytes=a-b"), 100), RangeOutcome::Full);
        assert_eq!(
            evaluate_range(Some("bytes=0-9,20-29"), 100),
            RangeOutcome::Full
        );
        assert_eq!(evaluate_range(Some("items=0-9"), 100), RangeOutcome::Full);
    }
}

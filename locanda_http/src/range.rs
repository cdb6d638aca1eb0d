// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Range {
    StartPointToEnd { start: u64 },
    Points {
        start: u64,
        end: u64,
    },
    Suffix { suffix: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRangeList {
    pub ranges: Vec<Range>,
}

impl HttpRangeList {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        if !value.starts_with("bytes=") {
            return None;
        }
        let mut ranges = Vec::new();
        for range in value[6..].split(',') {
            let range = range.trim();
            if range.is_empty() {
                continue;
            }
            let range = if let Some(suffix) = range.strip_prefix('-') {
                Range::Suffix { suffix: parse_unsigned(suffix)? }
            } else if let Some(start) = range.strip_suffix('-') {
                Range::StartPointToEnd { start: parse_unsigned(start)? }
            } else {
                let mut range = range.splitn(2, '-');
                let start = parse_unsigned(range.next()?)?;
                let end = parse_unsigned(range.next()?)?;
                Range::Points { start, end }
            };
            ranges.push(range);
        }
        Some(Self { ranges })
    }

    /// Resolves the requested ranges to a single absolute interval
    /// `(start, end)` with inclusive end, against a resource of the given
    /// length. When multiple ranges are requested, a single interval covering
    /// all of them is returned.
    ///
    /// Returns `None` when the range list is empty or out of order; per
    /// RFC 2616 section 14.35.1 callers must ignore the header in that case.
    /// The returned `start` may lie at or beyond `length`, which signals an
    /// unsatisfiable range.
    #[must_use]
    pub fn resolve(&self, length: u64) -> Option<(u64, u64)> {
        let mut min = u64::MAX;
        let mut max = None;

        for range in &self.ranges {
            let (start, end) = match *range {
                Range::Suffix { suffix } => (length.saturating_sub(suffix), length.checked_sub(1)?),
                Range::StartPointToEnd { start } => (start, length.checked_sub(1)?),
                Range::Points { start, end } => (start, end),
            };
            if end < start {
                return None;
            }
            min = min.min(start);
            max = Some(max.unwrap_or(0).max(end));
        }

        let mut max = max?;
        if max >= length && min < length {
            max = length - 1;
        }

        Some((min, max))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Range> {
        self.ranges.iter()
    }
}

/// Parses an unsigned decimal value, rejecting a leading sign.
fn parse_unsigned(input: &str) -> Option<u64> {
    if input.starts_with('+') {
        return None;
    }
    input.parse().ok()
}

/// The `Content-Range` header field indicates where in a full body a partial
/// message belongs.
///
/// ### References
/// * [RFC 9110](https://httpwg.org/specs/rfc9110.html#field.content-range)
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContentRangeHeaderValue {
    Range {
        /// The start of the range, inclusive.
        start: u64,

        /// The end of the range, inclusive.
        end: u64,

        /// Complete length of the **resource**, not the body.
        complete_length: Option<u64>,
    },

    /// Used for 416 Requested Range Not Satisfiable, serialized as
    /// `bytes */<complete-length>`.
    Unsatisfied {
        /// The complete length of the resource.
        complete_length: u64,
    },
}

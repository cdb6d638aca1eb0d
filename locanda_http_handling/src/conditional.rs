// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Evaluation of conditional request headers (RFC 9110 §13) and of
//! `If-Range`, against a resource's validators.

use std::time::SystemTime;

use locanda_http::{
    header_value,
    HeaderMap,
    HeaderName,
    Method,
    StatusCode,
};

/// Matches an entity tag against an `If-Match`/`If-None-Match` field value.
///
/// `strong` selects the strong comparison, under which a weak tag never
/// matches. `*` matches any existing resource.
#[must_use]
pub fn etag_matches(strong: bool, field_value: &str, etag: &str) -> bool {
    if strong && etag.starts_with("W/") {
        return false;
    }

    header_value::split_elements(field_value).iter().any(|element| {
        *element == "*" || (*element == etag && !(strong && element.starts_with("W/")))
    })
}

/// Calculates the response status mandated by the conditional headers of a
/// request, given the resource's validators. Returns `Ok` when the request
/// may proceed normally.
///
/// Precedence follows RFC 9110 §13.2.2: `If-Match`, then
/// `If-Unmodified-Since`, then `If-None-Match` overriding
/// `If-Modified-Since`.
#[must_use]
pub fn evaluate_preconditions(headers: &HeaderMap, method: &Method, last_modified: SystemTime, etag: &str) -> StatusCode {
    if let Some(field_value) = headers.get(&HeaderName::IfMatch).and_then(|value| value.as_str_no_convert()) {
        if !etag_matches(true, field_value, etag) {
            return StatusCode::PreconditionFailed;
        }
    }

    if let Some(date) = date_header(headers, &HeaderName::IfUnmodifiedSince) {
        if last_modified > date {
            return StatusCode::PreconditionFailed;
        }
    }

    let mut status = StatusCode::Ok;
    let mut force = false;
    if let Some(date) = date_header(headers, &HeaderName::IfModifiedSince) {
        // a date in the future isn't a valid validator
        if date <= SystemTime::now() {
            if last_modified > date {
                force = true;
            } else {
                status = StatusCode::NotModified;
            }
        }
    }

    if let Some(field_value) = headers.get(&HeaderName::IfNoneMatch).and_then(|value| value.as_str_no_convert()) {
        // RFC 9110 §13.1.2: weak comparison
        if etag_matches(false, field_value, etag) {
            status = if matches!(method, Method::Get | Method::Head) {
                StatusCode::NotModified
            } else {
                StatusCode::PreconditionFailed
            };
        } else {
            force = true;
        }
    }

    if force {
        StatusCode::Ok
    } else {
        status
    }
}

/// How a `Range` header should be acted upon for the resource at hand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RangeDecision {
    /// Evaluate the conditional headers, then serve the contained range (or
    /// everything when `None`).
    Evaluate(Option<(u64, u64)>),

    /// The range lies wholly beyond the resource.
    Unsatisfiable,

    /// `If-Range` was present: serve directly without evaluating the other
    /// conditional headers. The range is dropped when the validator didn't
    /// match.
    Serve(Option<(u64, u64)>),
}

/// Decides what to do with a resolved `Range` interval, taking `If-Range`
/// into account. An unsatisfiable range under `If-Range` degrades to a full
/// response rather than a 416.
#[must_use]
pub fn resolve_range(headers: &HeaderMap, range: Option<(u64, u64)>, length: u64, last_modified: SystemTime, etag: &str) -> RangeDecision {
    let Some((start, end)) = range else {
        return RangeDecision::Evaluate(None);
    };
    if length == 0 {
        return RangeDecision::Evaluate(None);
    }

    let Some(if_range) = headers.get(&HeaderName::IfRange).and_then(|value| value.as_str_no_convert()) else {
        if start >= length {
            return RangeDecision::Unsatisfiable;
        }
        return RangeDecision::Evaluate(Some((start, end)));
    };

    if start >= length {
        // RFC 9110 §13.1.5: an invalid range with If-Range gets everything
        return RangeDecision::Serve(None);
    }

    if !if_range.starts_with('"') && !if_range.starts_with("W/") {
        if let Ok(date) = httpdate::parse_http_date(if_range) {
            if last_modified > date {
                return RangeDecision::Serve(None);
            }
        }
    } else if if_range != etag {
        return RangeDecision::Serve(None);
    }

    RangeDecision::Serve(Some((start, end)))
}

fn date_header(headers: &HeaderMap, name: &HeaderName) -> Option<SystemTime> {
    headers.get(name).and_then(|value| value.try_into().ok())
}

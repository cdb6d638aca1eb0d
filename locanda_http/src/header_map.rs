// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::time::{SystemTime, Duration};

use hashbrown::HashMap;

use locanda_resources::MediaType;

use crate::{
    ContentRangeHeaderValue,
    HeaderName,
    HeaderValue,
};

/// An ordered, case-insensitive, multi-valued header collection.
///
/// Insertion order is preserved; duplicates are permitted and are the
/// mechanism for multi-valued headers.
#[derive(Clone, Debug, Default)]
pub struct HeaderMap {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl HeaderMap {
    pub fn new() -> HeaderMap {
        HeaderMap::default()
    }

    /// Appends a header to the list of headers. This is used for headers that
    /// can be duplicated, such as `Set-Cookie` and `Link`.
    pub fn append_possible_duplicate(&mut self, header_name: HeaderName, value: HeaderValue) {
        self.headers.push((header_name, value));
    }

    #[must_use]
    pub fn contains(&self, header_name: &HeaderName) -> bool {
        for (name, _) in &self.headers {
            if name == header_name {
                return true;
            }
        }

        false
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    #[must_use]
    pub fn get(&self, header_name: &HeaderName) -> Option<&HeaderValue> {
        for (name, value) in &self.headers {
            if name == header_name {
                return Some(value);
            }
        }

        None
    }

    #[must_use]
    pub fn get_mut(&mut self, header_name: &HeaderName) -> Option<&mut HeaderValue> {
        for (name, value) in &mut self.headers {
            if name == header_name {
                return Some(value);
            }
        }

        None
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(HeaderName, HeaderValue)> {
        self.headers.iter()
    }

    /// Removes all headers with the given name, preserving the relative order
    /// of the rest.
    pub fn remove(&mut self, header_name: &HeaderName) {
        self.headers.retain(|(name, _)| name != header_name);
    }

    /// Replaces the first header with the given name in place, keeping its
    /// position, and returns the prior value. Appends when no header with
    /// that name exists yet.
    pub fn set(&mut self, header_name: HeaderName, value: HeaderValue) -> Option<HeaderValue> {
        for (name, existing_value) in &mut self.headers {
            if name == &header_name {
                return Some(std::mem::replace(existing_value, value));
            }
        }

        self.headers.push((header_name, value));
        None
    }

    /// Splits the value of the given header on `;` into its parameters, as
    /// used by `Content-Type`- and `Content-Disposition`-style headers.
    ///
    /// Each segment is trimmed and split on the first `=`; quoted parameter
    /// values are unquoted. A segment without `=` (such as the media type
    /// itself) maps to an empty value.
    #[must_use]
    pub fn parameter_map(&self, header_name: &HeaderName) -> HashMap<String, String> {
        let mut parameters = HashMap::new();
        let Some(value) = self.get(header_name) else {
            return parameters;
        };

        for segment in value.to_string().split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (name, value) = match segment.split_once('=') {
                Some((name, value)) => (name.trim(), value.trim()),
                None => (segment, ""),
            };
            let value = value.strip_prefix('"')
                .and_then(|value| value.strip_suffix('"'))
                .unwrap_or(value);
            parameters.entry(name.to_string()).or_insert_with(|| value.to_string());
        }

        parameters
    }
}

#[must_use]
pub fn format_system_time_as_weak_etag(date_time: SystemTime) -> String {
    format!("W/\"{:X}\"", date_time.duration_since(SystemTime::UNIX_EPOCH).unwrap_or(Duration::default()).as_millis())
}

//
// Header-specific methods
//
impl HeaderMap {
    pub fn set_content_length(&mut self, length: u64) {
        self.set(HeaderName::ContentLength, HeaderValue::Size(length));
    }

    pub fn set_content_range(&mut self, range: ContentRangeHeaderValue) {
        self.set(HeaderName::ContentRange, HeaderValue::ContentRange(range));
    }

    pub fn set_content_type(&mut self, media_type: MediaType) {
        self.set(HeaderName::ContentType, HeaderValue::MediaType(media_type));
    }

    /// Whether the `Connection` header asks for the connection to be closed
    /// after the current exchange.
    #[must_use]
    pub fn connection_close_requested(&self) -> bool {
        self.get(&HeaderName::Connection)
            .map(|value| value.to_string())
            .map(|value| crate::split_elements(&value).iter().any(|element| element.eq_ignore_ascii_case("close")))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_preserved() {
        let mut headers = HeaderMap::new();
        headers.append_possible_duplicate(HeaderName::Host, "example.com".into());
        headers.append_possible_duplicate(HeaderName::Accept, "text/html".into());
        headers.append_possible_duplicate(HeaderName::Host, "evil.example".into());

        let names: Vec<_> = headers.iter().map(|(name, _)| name.clone()).collect();
        assert_eq!(names, [HeaderName::Host, HeaderName::Accept, HeaderName::Host]);
        assert_eq!(headers.get(&HeaderName::Host).unwrap().to_string(), "example.com");
    }

    #[test]
    fn set_replaces_first_match_in_place() {
        let mut headers = HeaderMap::new();
        headers.append_possible_duplicate(HeaderName::Server, "a".into());
        headers.append_possible_duplicate(HeaderName::Date, "b".into());

        let prior = headers.set(HeaderName::Server, "c".into());
        assert_eq!(prior, Some(HeaderValue::StaticString("a")));
        let names: Vec<_> = headers.iter().map(|(name, _)| name.clone()).collect();
        assert_eq!(names, [HeaderName::Server, HeaderName::Date]);

        assert_eq!(headers.set(HeaderName::ETag, "d".into()), None);
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn remove_preserves_relative_order() {
        let mut headers = HeaderMap::new();
        headers.append_possible_duplicate(HeaderName::Host, "1".into());
        headers.append_possible_duplicate(HeaderName::Accept, "2".into());
        headers.append_possible_duplicate(HeaderName::Host, "3".into());
        headers.append_possible_duplicate(HeaderName::Date, "4".into());

        headers.remove(&HeaderName::Host);
        let names: Vec<_> = headers.iter().map(|(name, _)| name.clone()).collect();
        assert_eq!(names, [HeaderName::Accept, HeaderName::Date]);
    }

    #[test]
    fn parameter_map_splits_and_unquotes() {
        let mut headers = HeaderMap::new();
        headers.append_possible_duplicate(HeaderName::ContentType,
            "application/x-www-form-urlencoded; charset=\"utf-8\"; boundary=xyz".into());

        let parameters = headers.parameter_map(&HeaderName::ContentType);
        assert_eq!(parameters.get("application/x-www-form-urlencoded").map(String::as_str), Some(""));
        assert_eq!(parameters.get("charset").map(String::as_str), Some("utf-8"));
        assert_eq!(parameters.get("boundary").map(String::as_str), Some("xyz"));
    }

    #[test]
    fn connection_close() {
        let mut headers = HeaderMap::new();
        assert!(!headers.connection_close_requested());
        headers.set(HeaderName::Connection, "keep-alive".into());
        assert!(!headers.connection_close_requested());
        headers.set(HeaderName::Connection, "Close".into());
        assert!(headers.connection_close_requested());
    }
}

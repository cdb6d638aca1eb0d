// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::time::SystemTime;
use std::fmt::Write;

use locanda_resources::{ContentCoding, MediaType};

use crate::ContentRangeHeaderValue;

/// Represents a value of a header.
///
/// This makes transforming the response easier for shared code paths: headers
/// that carry structured data (sizes, dates, ranges) are kept in their
/// structured form until the message is serialized, which avoids formatting
/// and re-parsing in between.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HeaderValue {
    StaticString(&'static str),
    String(String),
    ContentCoding(ContentCoding),
    ContentRange(ContentRangeHeaderValue),
    DateTime(SystemTime),
    MediaType(MediaType),
    Size(u64),
}

impl HeaderValue {
    /// Returns the value as a string, but does not convert it to a string if
    /// it is some other non-convertible type.
    #[must_use]
    pub fn as_str_no_convert(&self) -> Option<&str> {
        match self {
            HeaderValue::StaticString(string) => Some(string),
            HeaderValue::String(string) => Some(string),
            HeaderValue::MediaType(media_type) => Some(media_type.as_str()),
            _ => None,
        }
    }

    pub fn append_to_message(&self, response_text: &mut String) {
        match self {
            HeaderValue::StaticString(string) => {
                response_text.push_str(string);
            }
            HeaderValue::String(string) => {
                response_text.push_str(string);
            }
            HeaderValue::ContentCoding(content_coding) => {
                response_text.push_str(content_coding.http_identifier());
            }
            HeaderValue::ContentRange(content_range) => {
                match content_range {
                    ContentRangeHeaderValue::Range { start, end, complete_length } => {
                        match complete_length {
                            Some(complete_length) => {
                                _ = write!(response_text, "bytes {start}-{end}/{complete_length}");
                            }
                            None => _ = write!(response_text, "bytes {start}-{end}/*"),
                        }
                    }
                    ContentRangeHeaderValue::Unsatisfied { complete_length } => {
                        _ = write!(response_text, "bytes */{}", *complete_length);
                    }
                };
            }
            HeaderValue::DateTime(date_time) => {
                _ = write!(response_text, "{}", httpdate::HttpDate::from(*date_time));
            }
            HeaderValue::MediaType(media_type) => {
                response_text.push_str(media_type.as_str());
            }
            HeaderValue::Size(size) => {
                _ = write!(response_text, "{size}");
            }
        }
    }

    /// Get the header in string form.
    #[allow(clippy::inherent_to_string)]
    pub fn to_string(&self) -> String {
        let mut result = String::new();
        self.append_to_message(&mut result);
        result
    }

    /// Parses the value as a number.
    #[must_use]
    pub fn parse_number(&self) -> Option<u64> {
        match self {
            HeaderValue::StaticString(string) => string.parse().ok(),
            HeaderValue::String(string) => string.parse().ok(),
            HeaderValue::Size(size) => Some(*size),
            _ => None,
        }
    }
}

impl From<ContentCoding> for HeaderValue {
    fn from(content_coding: ContentCoding) -> HeaderValue {
        HeaderValue::ContentCoding(content_coding)
    }
}

impl From<&'static str> for HeaderValue {
    fn from(string: &'static str) -> HeaderValue {
        HeaderValue::StaticString(string)
    }
}

impl From<String> for HeaderValue {
    fn from(string: String) -> HeaderValue {
        HeaderValue::String(string)
    }
}

impl From<SystemTime> for HeaderValue {
    fn from(date_time: SystemTime) -> HeaderValue {
        HeaderValue::DateTime(date_time)
    }
}

impl From<MediaType> for HeaderValue {
    fn from(media_type: MediaType) -> HeaderValue {
        HeaderValue::MediaType(media_type)
    }
}

impl From<u64> for HeaderValue {
    fn from(size: u64) -> HeaderValue {
        HeaderValue::Size(size)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeaderValueDateTimeParseError {
    InvalidFormat,
}

impl TryInto<SystemTime> for &HeaderValue {
    type Error = HeaderValueDateTimeParseError;

    fn try_into(self) -> Result<SystemTime, Self::Error> {
        match self {
            HeaderValue::StaticString(string) => httpdate::parse_http_date(string).map_err(|_| HeaderValueDateTimeParseError::InvalidFormat),
            HeaderValue::String(string) => httpdate::parse_http_date(string).map_err(|_| HeaderValueDateTimeParseError::InvalidFormat),
            HeaderValue::DateTime(date_time) => Ok(*date_time),
            _ => Err(HeaderValueDateTimeParseError::InvalidFormat),
        }
    }
}

/// Splits a comma-separated header value into its non-empty trimmed elements.
///
/// RFC 9110 calls these "lists" (`#rule`): elements are delimited by a comma
/// and optional whitespace, and empty elements are ignored.
#[must_use]
pub fn split_elements(value: &str) -> Vec<&str> {
    value.split(',')
        .map(str::trim)
        .filter(|element| !element.is_empty())
        .collect()
}

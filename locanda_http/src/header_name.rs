// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use phf::phf_map;
use unicase::UniCase;

#[derive(Clone, Debug, Eq)]
pub enum HeaderName {
    Other(String),

    Accept,
    AcceptEncoding,
    AcceptRanges,
    Allow,
    Connection,
    ContentEncoding,
    ContentLength,
    ContentRange,
    ContentType,
    Date,
    ETag,
    Expect,
    Host,
    IfMatch,
    IfModifiedSince,
    IfNoneMatch,
    IfRange,
    IfUnmodifiedSince,
    KeepAlive,
    LastModified,
    Location,
    Range,
    Server,
    TE,
    Trailer,
    TransferEncoding,
    Vary,
}

static STRING_TO_HEADER_NAME_MAP: phf::Map<UniCase<&'static str>, HeaderName> = phf_map!(
    UniCase::ascii("accept") => HeaderName::Accept,
    UniCase::ascii("accept-encoding") => HeaderName::AcceptEncoding,
    UniCase::ascii("accept-ranges") => HeaderName::AcceptRanges,
    UniCase::ascii("allow") => HeaderName::Allow,
    UniCase::ascii("connection") => HeaderName::Connection,
    UniCase::ascii("content-encoding") => HeaderName::ContentEncoding,
    UniCase::ascii("content-length") => HeaderName::ContentLength,
    UniCase::ascii("content-range") => HeaderName::ContentRange,
    UniCase::ascii("content-type") => HeaderName::ContentType,
    UniCase::ascii("date") => HeaderName::Date,
    UniCase::ascii("etag") => HeaderName::ETag,
    UniCase::ascii("expect") => HeaderName::Expect,
    UniCase::ascii("host") => HeaderName::Host,
    UniCase::ascii("if-match") => HeaderName::IfMatch,
    UniCase::ascii("if-modified-since") => HeaderName::IfModifiedSince,
    UniCase::ascii("if-none-match") => HeaderName::IfNoneMatch,
    UniCase::ascii("if-range") => HeaderName::IfRange,
    UniCase::ascii("if-unmodified-since") => HeaderName::IfUnmodifiedSince,
    UniCase::ascii("keep-alive") => HeaderName::KeepAlive,
    UniCase::ascii("last-modified") => HeaderName::LastModified,
    UniCase::ascii("location") => HeaderName::Location,
    UniCase::ascii("range") => HeaderName::Range,
    UniCase::ascii("server") => HeaderName::Server,
    UniCase::ascii("te") => HeaderName::TE,
    UniCase::ascii("trailer") => HeaderName::Trailer,
    UniCase::ascii("transfer-encoding") => HeaderName::TransferEncoding,
    UniCase::ascii("vary") => HeaderName::Vary,
);

impl HeaderName {
    /// The header name as it is serialized onto an HTTP/1.1 message.
    #[must_use]
    pub fn to_string_h1(&self) -> &str {
        match self {
            HeaderName::Other(name) => name,

            HeaderName::Accept => "Accept",
            HeaderName::AcceptEncoding => "Accept-Encoding",
            HeaderName::AcceptRanges => "Accept-Ranges",
            HeaderName::Allow => "Allow",
            HeaderName::Connection => "Connection",
            HeaderName::ContentEncoding => "Content-Encoding",
            HeaderName::ContentLength => "Content-Length",
            HeaderName::ContentRange => "Content-Range",
            HeaderName::ContentType => "Content-Type",
            HeaderName::Date => "Date",
            HeaderName::ETag => "ETag",
            HeaderName::Expect => "Expect",
            HeaderName::Host => "Host",
            HeaderName::IfMatch => "If-Match",
            HeaderName::IfModifiedSince => "If-Modified-Since",
            HeaderName::IfNoneMatch => "If-None-Match",
            HeaderName::IfRange => "If-Range",
            HeaderName::IfUnmodifiedSince => "If-Unmodified-Since",
            HeaderName::KeepAlive => "Keep-Alive",
            HeaderName::LastModified => "Last-Modified",
            HeaderName::Location => "Location",
            HeaderName::Range => "Range",
            HeaderName::Server => "Server",
            HeaderName::TE => "TE",
            HeaderName::Trailer => "Trailer",
            HeaderName::TransferEncoding => "Transfer-Encoding",
            HeaderName::Vary => "Vary",
        }
    }
}

// Unknown header names compare case-insensitively, like the well-known ones.
impl PartialEq for HeaderName {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HeaderName::Other(lhs), HeaderName::Other(rhs)) => lhs.eq_ignore_ascii_case(rhs),
            (lhs, rhs) => std::mem::discriminant(lhs) == std::mem::discriminant(rhs),
        }
    }
}

impl std::hash::Hash for HeaderName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        if let HeaderName::Other(name) = self {
            for byte in name.bytes() {
                state.write_u8(byte.to_ascii_lowercase());
            }
        }
    }
}

impl From<String> for HeaderName {
    fn from(value: String) -> Self {
        match STRING_TO_HEADER_NAME_MAP.get(&UniCase::ascii(&value)) {
            Some(name) => name.clone(),
            None => HeaderName::Other(value),
        }
    }
}

impl From<&str> for HeaderName {
    fn from(value: &str) -> Self {
        match STRING_TO_HEADER_NAME_MAP.get(&UniCase::ascii(value)) {
            Some(name) => name.clone(),
            None => HeaderName::Other(value.to_string()),
        }
    }
}

// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use strum_macros::AsRefStr;

use std::io;

#[derive(Debug)]
pub enum Error {
    ParseError(HttpParseError),
    Other(io::Error),
}

impl From<HttpParseError> for Error {
    fn from(error: HttpParseError) -> Self {
        Error::ParseError(error)
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Other(error)
    }
}

/// An error that can occur while parsing an HTTP request.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, AsRefStr)]
pub enum HttpParseError {
    /// The chunk-size line of a chunked body wasn't valid hexadecimal.
    ///
    /// ## Example:
    /// ```text
    /// xyz;name=value\r\n
    /// ```
    ChunkSizeLineMalformed,

    /// The underlying stream ended in the middle of a chunk, before the
    /// terminating zero-size chunk was seen.
    ChunkTruncated,

    /// A header block contained more lines than the server accepts.
    HeaderBlockTooLong,

    /// The header didn't contain a colon, it's only the name.
    ///
    /// ## Example:
    /// ```text
    /// Content-Type
    /// ```
    HeaderDoesNotContainColon,

    /// A continuation (folded) header line occurred before any header line.
    ///
    /// ## Example:
    /// ```text
    /// GET / HTTP/1.1\r\n
    ///    folded-without-a-start\r\n
    /// ```
    HeaderFoldWithoutPreviousLine,

    /// The header (name + value) was too large.
    HeaderTooLarge,

    /// The `Content-Length` field was malformed, meaning it contained
    /// non-numeric characters, was too large, was negative, or was the empty
    /// string.
    ///
    /// ## Example:
    /// ```text
    /// Content-Length: 123abc
    /// ```
    InvalidContentLength,

    /// The line ended with CR but not followed by an LF.
    ///
    /// ## Example:
    /// ```text
    /// Content-Length: 123\r
    /// ```
    InvalidCRLF,

    /// The HTTP version was invalid.
    ///
    /// ## Syntax
    /// The HTTP version must be in the format `HTTP/<digit>.<digit>`, where
    /// `<digit>` is a single digit (0 - 9). Only `HTTP/1.0` and `HTTP/1.1`
    /// are accepted on this transport.
    InvalidHttpVersion,

    /// The request-target format is unknown.
    ///
    /// ## Examples:
    /// ```text
    /// GET not-beginning-with-a-solidus HTTP/1.1
    /// GET ?query=string HTTP/1.1
    /// ```
    InvalidRequestTarget,

    /// The request-line didn't consist of exactly three tokens, or the
    /// method/request-target token was empty.
    ///
    /// ## Example:
    /// ```text
    /// GET /index.html
    /// ```
    MalformedRequestLine,

    /// The method was too large.
    MethodTooLarge,

    /// The request-target (e.g. URI) was too large.
    RequestTargetTooLarge,

    TokenContainsDelimiter,
    TokenContainsNonVisibleAscii,
    TokenContainsWhitespace,
    TokenEmpty,

    FieldValueContainsInvalidCharacters,

    InvalidOctetInMethod,
    InvalidOctetInRequestTarget,
}

// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::io::Write;

use flate2::Compression;
use flate2::write::{GzEncoder, ZlibEncoder};

/// Media-type patterns eligible for transfer compression. A leading `*`
/// matches a suffix, a trailing `*` matches a prefix.
const COMPRESSIBLE_MEDIA_TYPES: [&str; 5] = [
    "text/*",
    "*/javascript",
    "*icon",
    "*+xml",
    "*/json",
];

/// A content coding the server can apply to a response body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentCoding {
    Gzip,
    Deflate,
}

impl ContentCoding {
    /// The identifier as it appears in `Accept-Encoding` and
    /// `Content-Encoding`.
    #[must_use]
    pub const fn http_identifier(&self) -> &'static str {
        match self {
            ContentCoding::Gzip => "gzip",
            ContentCoding::Deflate => "deflate",
        }
    }

    /// Compresses the whole input in one go.
    #[must_use]
    pub fn encode(&self, input: &[u8]) -> Option<Vec<u8>> {
        match self {
            ContentCoding::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(input).ok()?;
                encoder.finish().ok()
            }
            ContentCoding::Deflate => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(input).ok()?;
                encoder.finish().ok()
            }
        }
    }
}

/// Chooses a content coding based on the client's `Accept-Encoding` header.
/// `gzip` is preferred over `deflate`; other codings aren't supported.
#[must_use]
pub fn negotiate(accept_encoding: &str) -> Option<ContentCoding> {
    let mut deflate = false;
    for element in accept_encoding.split(',') {
        let coding = element.split(';').next().unwrap_or(element).trim();
        if coding.eq_ignore_ascii_case("gzip") {
            return Some(ContentCoding::Gzip);
        }
        if coding.eq_ignore_ascii_case("deflate") {
            deflate = true;
        }
    }
    deflate.then_some(ContentCoding::Deflate)
}

/// Whether a response body of the given media type is worth compressing.
/// Parameters (e.g. `; charset=utf-8`) are ignored.
#[must_use]
pub fn is_compressible(media_type: &str) -> bool {
    let media_type = media_type.split(';').next().unwrap_or(media_type).trim();
    COMPRESSIBLE_MEDIA_TYPES.iter().any(|pattern| {
        if let Some(suffix) = pattern.strip_prefix('*') {
            media_type.ends_with(suffix)
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            media_type.starts_with(prefix)
        } else {
            media_type == *pattern
        }
    })
}

enum StreamingEncoderKind {
    Gzip(GzEncoder<Vec<u8>>),
    Deflate(ZlibEncoder<Vec<u8>>),
}

/// An incremental encoder whose compressed output can be drained while more
/// input is still being fed in, so large bodies can be sent in chunks
/// without buffering the whole compressed stream.
pub struct StreamingEncoder {
    kind: StreamingEncoderKind,
}

impl StreamingEncoder {
    #[must_use]
    pub fn new(coding: ContentCoding) -> Self {
        let kind = match coding {
            ContentCoding::Gzip => StreamingEncoderKind::Gzip(GzEncoder::new(Vec::new(), Compression::default())),
            ContentCoding::Deflate => StreamingEncoderKind::Deflate(ZlibEncoder::new(Vec::new(), Compression::default())),
        };
        Self { kind }
    }

    pub fn write(&mut self, input: &[u8]) -> std::io::Result<()> {
        match &mut self.kind {
            StreamingEncoderKind::Gzip(encoder) => encoder.write_all(input),
            StreamingEncoderKind::Deflate(encoder) => encoder.write_all(input),
        }
    }

    /// Takes whatever compressed output has accumulated so far. May be empty
    /// while the encoder is still filling its internal window.
    pub fn take_output(&mut self) -> Vec<u8> {
        match &mut self.kind {
            StreamingEncoderKind::Gzip(encoder) => std::mem::take(encoder.get_mut()),
            StreamingEncoderKind::Deflate(encoder) => std::mem::take(encoder.get_mut()),
        }
    }

    /// Finalizes the stream and returns the remaining compressed output.
    pub fn finish(self) -> std::io::Result<Vec<u8>> {
        match self.kind {
            StreamingEncoderKind::Gzip(encoder) => encoder.finish(),
            StreamingEncoderKind::Deflate(encoder) => encoder.finish(),
        }
    }
}

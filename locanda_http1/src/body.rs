// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Body framing: readers that delimit a message body on a persistent
//! connection, and the chunked transfer encoding in both directions.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt};

use locanda_http::{
    syntax,
    Error,
    HeaderMap,
    HeaderName,
    HeaderValue,
    HttpParseError,
};

use crate::MaximumLength;

/// A reader that yields at most a fixed number of bytes from the underlying
/// stream, delimiting a `Content-Length` body.
///
/// When `strict` is set, an end of stream before the budget is exhausted is
/// an error; otherwise the body simply ends early.
pub struct LimitedReader<R> {
    inner: R,
    remaining: u64,
    strict: bool,
}

impl<R> LimitedReader<R>
        where R: AsyncBufReadExt + Unpin {
    pub fn new(inner: R, limit: u64, strict: bool) -> Self {
        Self {
            inner,
            remaining: limit,
            strict,
        }
    }

    /// The number of bytes that may still be read.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub async fn read(&mut self, buffer: &mut [u8]) -> Result<usize, Error> {
        if self.remaining == 0 || buffer.is_empty() {
            return Ok(0);
        }

        let capacity = buffer.len().min(self.remaining.min(usize::MAX as u64) as usize);
        let read = self.inner.read(&mut buffer[..capacity]).await?;
        if read == 0 {
            if self.strict {
                return Err(Error::Other(io::Error::new(io::ErrorKind::UnexpectedEof, "body ended before its declared length")));
            }
            self.remaining = 0;
            return Ok(0);
        }

        self.remaining -= read as u64;
        Ok(read)
    }

    /// Reads the rest of the budget into a buffer.
    pub async fn read_to_end(&mut self, output: &mut Vec<u8>) -> Result<(), Error> {
        let mut buffer = [0u8; 8192];
        loop {
            let read = self.read(&mut buffer).await?;
            if read == 0 {
                return Ok(());
            }
            output.extend_from_slice(&buffer[..read]);
        }
    }

    /// Discards whatever is left of the budget, so the stream is positioned
    /// at the next message.
    pub async fn skip_remaining(&mut self) -> Result<(), Error> {
        let mut buffer = [0u8; 8192];
        while self.read(&mut buffer).await? != 0 {}
        Ok(())
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Decodes a body in the chunked transfer encoding.
///
/// After the final zero-size chunk, trailer fields are parsed and made
/// available through [`take_trailers`](Self::take_trailers).
pub struct ChunkedReader<R> {
    inner: R,
    chunk_remaining: u64,
    read_first_chunk: bool,
    finished: bool,
    trailers: HeaderMap,
}

impl<R> ChunkedReader<R>
        where R: AsyncBufReadExt + Unpin {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            chunk_remaining: 0,
            read_first_chunk: false,
            finished: false,
            trailers: HeaderMap::new(),
        }
    }

    pub async fn read(&mut self, buffer: &mut [u8]) -> Result<usize, Error> {
        if self.finished || buffer.is_empty() {
            return Ok(0);
        }

        if self.chunk_remaining == 0 {
            self.begin_chunk().await?;
            if self.finished {
                return Ok(0);
            }
        }

        let capacity = buffer.len().min(self.chunk_remaining.min(usize::MAX as u64) as usize);
        let read = self.inner.read(&mut buffer[..capacity]).await?;
        if read == 0 {
            return Err(Error::ParseError(HttpParseError::ChunkTruncated));
        }

        self.chunk_remaining -= read as u64;
        Ok(read)
    }

    pub async fn read_to_end(&mut self, output: &mut Vec<u8>) -> Result<(), Error> {
        let mut buffer = [0u8; 8192];
        loop {
            let read = self.read(&mut buffer).await?;
            if read == 0 {
                return Ok(());
            }
            output.extend_from_slice(&buffer[..read]);
        }
    }

    /// Reads the chunk-size line of the next chunk. On the zero-size chunk,
    /// the trailer section is parsed and the body is complete.
    async fn begin_chunk(&mut self) -> Result<(), Error> {
        if self.read_first_chunk {
            // the CRLF terminating the previous chunk's data
            self.consume_crlf().await?;
        }
        self.read_first_chunk = true;

        let line = crate::read::read_crlf_line(&mut self.inner, MaximumLength::HEADER).await
            .map_err(|error| match error {
                Error::ParseError(HttpParseError::InvalidCRLF) => Error::ParseError(HttpParseError::ChunkSizeLineMalformed),
                other => other,
            })?;
        // chunk extensions are ignored
        let size = line.split(';').next().unwrap_or(&line).trim();
        let size = u64::from_str_radix(size, 16)
            .map_err(|_| Error::ParseError(HttpParseError::ChunkSizeLineMalformed))?;

        if size == 0 {
            self.read_trailers().await?;
            self.finished = true;
        } else {
            self.chunk_remaining = size;
        }
        Ok(())
    }

    async fn consume_crlf(&mut self) -> Result<(), Error> {
        let mut crlf = [0u8; 2];
        self.inner.read_exact(&mut crlf).await?;
        if &crlf != b"\r\n" {
            return Err(Error::ParseError(HttpParseError::InvalidCRLF));
        }
        Ok(())
    }

    /// Trailer fields follow the zero-size chunk, terminated by an empty
    /// line.
    async fn read_trailers(&mut self) -> Result<(), Error> {
        loop {
            let line = crate::read::read_crlf_line(&mut self.inner, MaximumLength::HEADER).await?;
            if line.is_empty() {
                return Ok(());
            }

            let Some((name, value)) = line.split_once(':') else {
                return Err(Error::ParseError(HttpParseError::HeaderDoesNotContainColon));
            };
            let name = name.trim().to_string();
            let value = value.trim().to_string();

            syntax::validate_token(&name)?;
            syntax::validate_field_content(value.as_bytes())?;

            self.trailers.append_possible_duplicate(HeaderName::from(name), HeaderValue::from(value));
        }
    }

    /// Whether the terminating zero-size chunk has been read.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The trailer fields that followed the body.
    #[must_use]
    pub fn take_trailers(&mut self) -> HeaderMap {
        std::mem::take(&mut self.trailers)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Encodes written data in the chunked transfer encoding.
///
/// The CRLF that terminates a chunk's data is deferred until the next write,
/// so chunk boundaries map one-to-one to `write` calls. [`finish`](Self::finish)
/// must be called exactly once to emit the last-chunk and the trailer
/// section.
pub struct ChunkedWriter<W> {
    inner: W,
    wrote_chunk: bool,
    ended: bool,
}

impl<W> ChunkedWriter<W>
        where W: AsyncWriteExt + Unpin {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            wrote_chunk: false,
            ended: false,
        }
    }

    /// Writes one chunk. Empty writes are ignored, since a zero-size chunk
    /// would terminate the body.
    pub async fn write(&mut self, data: &[u8]) -> Result<(), io::Error> {
        if self.ended {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "chunked body already ended"));
        }
        if data.is_empty() {
            return Ok(());
        }

        let mut header = String::with_capacity(18);
        if self.wrote_chunk {
            header.push_str("\r\n");
        }
        header.push_str(&format!("{:X}\r\n", data.len()));
        self.inner.write_all(header.as_bytes()).await?;
        self.inner.write_all(data).await?;
        self.wrote_chunk = true;
        Ok(())
    }

    /// Ends the body with the zero-size chunk, followed by the given trailer
    /// fields (if any) and the terminating empty line.
    pub async fn finish(&mut self, trailers: Option<&HeaderMap>) -> Result<(), io::Error> {
        if self.ended {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "chunked body already ended"));
        }
        self.ended = true;

        let mut tail = String::new();
        if self.wrote_chunk {
            tail.push_str("\r\n");
        }
        tail.push_str("0\r\n");
        if let Some(trailers) = trailers {
            for (name, value) in trailers.iter() {
                tail.push_str(name.to_string_h1());
                tail.push_str(": ");
                tail.push_str(&value.to_string());
                tail.push_str("\r\n");
            }
        }
        tail.push_str("\r\n");
        self.inner.write_all(tail.as_bytes()).await?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn limited_reader_caps_the_stream() {
        let mut reader = LimitedReader::new(std::io::Cursor::new(b"0123456789"), 4, false);
        let mut body = Vec::new();
        reader.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"0123");
        assert_eq!(reader.remaining(), 0);

        // the bytes beyond the budget stay in the stream
        let mut inner = reader.into_inner();
        let mut rest = Vec::new();
        inner.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"456789");
    }

    #[tokio::test]
    async fn limited_reader_lenient_on_short_stream() {
        let mut reader = LimitedReader::new(std::io::Cursor::new(b"ab"), 10, false);
        let mut body = Vec::new();
        reader.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"ab");
    }

    #[tokio::test]
    async fn limited_reader_strict_on_short_stream() {
        let mut reader = LimitedReader::new(std::io::Cursor::new(b"ab"), 10, true);
        let mut body = Vec::new();
        let result = reader.read_to_end(&mut body).await;
        assert!(matches!(result, Err(Error::Other(error)) if error.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[tokio::test]
    async fn limited_reader_skip_positions_at_next_message() {
        let mut reader = LimitedReader::new(std::io::Cursor::new(b"skippedNEXT"), 7, false);
        reader.skip_remaining().await.unwrap();
        let mut inner = reader.into_inner();
        let mut rest = Vec::new();
        inner.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"NEXT");
    }

    #[tokio::test]
    async fn chunked_reader_decodes_chunks_and_extensions() {
        let encoded = b"5;name=value\r\nHello\r\n7\r\n, World\r\n0\r\n\r\nrest";
        let mut reader = ChunkedReader::new(std::io::Cursor::new(&encoded[..]));
        let mut body = Vec::new();
        reader.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"Hello, World");
        assert!(reader.is_finished());
        assert!(reader.take_trailers().is_empty());

        let mut inner = reader.into_inner();
        let mut rest = Vec::new();
        inner.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"rest");
    }

    #[tokio::test]
    async fn chunked_reader_parses_trailers() {
        let encoded = b"3\r\nabc\r\n0\r\nExpires: never\r\nX-Checksum: 42\r\n\r\n";
        let mut reader = ChunkedReader::new(std::io::Cursor::new(&encoded[..]));
        let mut body = Vec::new();
        reader.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"abc");

        let trailers = reader.take_trailers();
        assert_eq!(trailers.len(), 2);
        assert_eq!(
            trailers.get(&HeaderName::Other("X-Checksum".into())).and_then(HeaderValue::as_str_no_convert),
            Some("42"),
        );
    }

    #[tokio::test]
    async fn chunked_reader_rejects_bad_size_line() {
        let mut reader = ChunkedReader::new(std::io::Cursor::new(&b"xyz\r\n"[..]));
        let mut body = Vec::new();
        let result = reader.read_to_end(&mut body).await;
        assert!(matches!(result, Err(Error::ParseError(HttpParseError::ChunkSizeLineMalformed))));
    }

    #[tokio::test]
    async fn chunked_reader_rejects_truncation() {
        let mut reader = ChunkedReader::new(std::io::Cursor::new(&b"A\r\nabc"[..]));
        let mut body = Vec::new();
        let result = reader.read_to_end(&mut body).await;
        assert!(matches!(result, Err(Error::ParseError(HttpParseError::ChunkTruncated))));
    }

    #[tokio::test]
    async fn chunked_writer_round_trip() {
        let mut writer = ChunkedWriter::new(Vec::new());
        writer.write(b"Hello").await.unwrap();
        writer.write(b"").await.unwrap();
        writer.write(b", World").await.unwrap();
        writer.finish(None).await.unwrap();
        let encoded = writer.into_inner();
        assert_eq!(encoded, b"5\r\nHello\r\n7\r\n, World\r\n0\r\n\r\n");

        let mut reader = ChunkedReader::new(std::io::Cursor::new(encoded));
        let mut body = Vec::new();
        reader.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"Hello, World");
    }

    #[tokio::test]
    async fn chunked_writer_emits_trailers() {
        let mut trailers = HeaderMap::new();
        trailers.set(HeaderName::Other("X-Checksum".into()), "42".into());

        let mut writer = ChunkedWriter::new(Vec::new());
        writer.write(b"abc").await.unwrap();
        writer.finish(Some(&trailers)).await.unwrap();
        assert_eq!(writer.into_inner(), b"3\r\nabc\r\n0\r\nX-Checksum: 42\r\n\r\n");
    }

    #[tokio::test]
    async fn chunked_writer_finish_is_single_use() {
        let mut writer = ChunkedWriter::new(Vec::new());
        writer.finish(None).await.unwrap();
        assert!(writer.finish(None).await.is_err());
        assert!(writer.write(b"late").await.is_err());
    }

    #[tokio::test]
    async fn empty_chunked_body() {
        let mut writer = ChunkedWriter::new(Vec::new());
        writer.finish(None).await.unwrap();
        assert_eq!(writer.into_inner(), b"0\r\n\r\n");
    }
}

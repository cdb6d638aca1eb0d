// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::io;

use tokio::io::{
    AsyncBufReadExt,
    AsyncReadExt,
};

use locanda_http::{
    syntax,
    BodyKind,
    Error,
    HeaderMap,
    HeaderName,
    HeaderValue,
    HttpParseError,
    HttpVersion,
    Method,
    Request,
    RequestTarget,
};

use crate::body::{ChunkedReader, LimitedReader};
use crate::MaximumLength;

/// Consume a `U+000D CARRIAGE RETURN` character (CR) and a `U+000A LINE FEED`
/// character (LF) from the stream.
async fn consume_crlf<R>(stream: &mut R) -> Result<(), Error>
        where R: AsyncBufReadExt + Unpin {
    let mut crlf = [0u8; 2];
    stream.read_exact(&mut crlf).await?;
    if &crlf != b"\r\n" {
        return Err(Error::ParseError(HttpParseError::InvalidCRLF));
    }
    Ok(())
}

/// Reads a line from the stream, up to the maximum length.
pub(crate) async fn read_crlf_line<R>(stream: &mut R, maximum_length: MaximumLength) -> Result<String, Error>
        where R: AsyncBufReadExt + Unpin {
    let mut string = String::new();

    while string.len() < maximum_length.0 {
        let byte = stream.read_u8().await?;
        if byte == b'\r' {
            let byte = stream.read_u8().await?;
            if byte == b'\n' {
                return Ok(string);
            }
            return Err(Error::ParseError(HttpParseError::InvalidCRLF));
        }

        string.push(byte as char);
    }

    Err(Error::ParseError(HttpParseError::HeaderTooLarge))
}

/// Skips empty lines before the request-line, which robust servers accept
/// from clients that send an extra CRLF after a request body.
async fn skip_empty_lines<R>(stream: &mut R) -> Result<(), Error>
        where R: AsyncBufReadExt + Unpin {
    loop {
        let buffer = stream.fill_buf().await?;
        if buffer.is_empty() {
            return Err(Error::Other(io::Error::new(io::ErrorKind::UnexpectedEof, "EOF")));
        }
        match buffer[0] {
            b'\r' | b'\n' => stream.consume(1),
            _ => return Ok(()),
        }
    }
}

/// Reads the headers from the stream.
///
/// Repeated fields are merged into a single comma-separated value, and
/// obsolete line folding (a continuation line starting with whitespace) is
/// unfolded into the preceding field. The header block as a whole is capped
/// at [`MaximumLength::HEADER_BLOCK_LINES`] lines.
pub(crate) async fn read_headers<R>(stream: &mut R) -> Result<HeaderMap, Error>
        where R: AsyncBufReadExt + Unpin {
    let mut header_map = HeaderMap::new();
    let mut last_name: Option<HeaderName> = None;

    for _ in 0..MaximumLength::HEADER_BLOCK_LINES.0 {
        let line = read_crlf_line(stream, MaximumLength::HEADER).await?;
        if line.is_empty() {
            return Ok(header_map);
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            let Some(name) = &last_name else {
                return Err(Error::ParseError(HttpParseError::HeaderFoldWithoutPreviousLine));
            };
            let folded = line.trim();
            syntax::validate_field_content(folded.as_bytes())?;
            if let Some(HeaderValue::String(value)) = header_map.get_mut(name) {
                value.push(' ');
                value.push_str(folded);
            }
            continue;
        }

        let Some((name, value)) = line.split_once(':') else {
            return Err(Error::ParseError(HttpParseError::HeaderDoesNotContainColon));
        };
        let name = name.trim().to_string();
        let value = value.trim().to_string();

        syntax::validate_token(&name)?;
        syntax::validate_field_content(value.as_bytes())?;

        let name = HeaderName::from(name);
        match header_map.get_mut(&name) {
            Some(HeaderValue::String(existing)) => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            _ => header_map.append_possible_duplicate(name.clone(), HeaderValue::from(value)),
        }
        last_name = Some(name);
    }

    Err(Error::ParseError(HttpParseError::HeaderBlockTooLong))
}

/// Reads the HTTP version from the stream.
async fn read_http_version<R>(stream: &mut R) -> Result<HttpVersion, Error>
        where R: AsyncBufReadExt + Unpin {
    let mut version_buffer = [0u8; 8];
    stream.read_exact(&mut version_buffer).await?;

    match &version_buffer {
        b"HTTP/1.0" => Ok(HttpVersion::Http10),
        b"HTTP/1.1" => Ok(HttpVersion::Http11),
        _ => Err(Error::ParseError(HttpParseError::InvalidHttpVersion)),
    }
}

/// Reads a string from the stream until the given character is found, or the
/// maximum length is reached.
async fn read_string_until_character<R>(stream: &mut R, char: u8, maximum_length: MaximumLength, length_error: HttpParseError,
        byte_validator: fn(u8) -> Result<(), HttpParseError>) -> Result<String, Error>
        where R: AsyncBufReadExt + Unpin {
    let mut buffer = String::new();

    while buffer.len() < maximum_length.0 {
        let byte = stream.read_u8().await?;
        if byte == char {
            return Ok(buffer);
        }

        byte_validator(byte)?;
        buffer.push(byte as char);
    }

    Err(Error::ParseError(length_error))
}

/// Read the request-line and headers from the stream, without reading the body.
///
/// The body is read separately, under its own timeout, once the request has
/// passed the early checks that don't need it.
pub(crate) async fn read_request_excluding_body<R>(stream: &mut R) -> Result<Request, Error>
        where R: AsyncBufReadExt + Unpin {
    let (method, target, version) = read_request_line(stream).await?;
    let headers = read_headers(stream).await?;
    Ok(Request { method, target, version, headers, body: None })
}

/// Read the request-line from the stream.
///
/// An end of stream before the first byte of the request-line is an I/O
/// error (the caller drops the connection silently, since there is nothing
/// to answer); after that, a truncated line is a malformed request.
async fn read_request_line<R>(stream: &mut R) -> Result<(Method, RequestTarget, HttpVersion), Error>
        where R: AsyncBufReadExt + Unpin {
    skip_empty_lines(stream).await?;

    let result = async {
        let method = read_string_until_character(stream, b' ', MaximumLength::METHOD, HttpParseError::MethodTooLarge,
            |b| if syntax::is_token_character(b) { Ok(()) } else { Err(HttpParseError::InvalidOctetInMethod) }).await?;
        if method.is_empty() {
            return Err(Error::ParseError(HttpParseError::MalformedRequestLine));
        }
        let method = Method::from(method);

        let target = read_request_target(stream).await?;
        let version = read_http_version(stream).await?;

        consume_crlf(stream).await?;

        Ok((method, target, version))
    }.await;

    match result {
        Err(Error::Other(error)) if error.kind() == io::ErrorKind::UnexpectedEof => {
            Err(Error::ParseError(HttpParseError::MalformedRequestLine))
        }
        other => other,
    }
}

/// Reads the request-target from the stream.
///
/// ### References
/// * [RFC 9112, Section 3.2. Request Target](https://www.rfc-editor.org/rfc/rfc9112.html#name-request-target)
async fn read_request_target<R>(stream: &mut R) -> Result<RequestTarget, Error>
        where R: AsyncBufReadExt + Unpin {
    let str = read_string_until_character(stream, b' ', MaximumLength::REQUEST_TARGET,
        HttpParseError::RequestTargetTooLarge,
        |b| if syntax::is_request_target_character(b) { Ok(()) } else { Err(HttpParseError::InvalidOctetInRequestTarget) }).await?;
    if str.is_empty() {
        return Err(Error::ParseError(HttpParseError::MalformedRequestLine));
    }

    RequestTarget::parse(str).ok_or(Error::ParseError(HttpParseError::InvalidRequestTarget))
}

/// Reads the request body from the stream and stores it in the request.
///
/// A `Transfer-Encoding` other than `identity` selects the chunked decoder,
/// whose trailer fields are merged into the request headers afterwards.
/// Otherwise the body length is taken from `Content-Length`, defaulting to
/// zero when absent.
pub(crate) async fn read_request_body<R>(stream: &mut R, request: &mut Request) -> Result<(), Error>
        where R: AsyncBufReadExt + Unpin {
    let transfer_encoding = request.headers.get(&HeaderName::TransferEncoding)
        .and_then(HeaderValue::as_str_no_convert);
    if let Some(encoding) = transfer_encoding {
        if !encoding.eq_ignore_ascii_case("identity") {
            let chunked = locanda_http::header_value::split_elements(encoding)
                .iter()
                .any(|element| element.eq_ignore_ascii_case("chunked"));

            let mut body = Vec::new();
            if chunked {
                let mut reader = ChunkedReader::new(stream);
                reader.read_to_end(&mut body).await?;
                for (name, value) in reader.take_trailers().iter() {
                    request.headers.append_possible_duplicate(name.clone(), value.clone());
                }
            } else {
                // an encoding without framing: the body runs to end of stream
                stream.read_to_end(&mut body).await?;
            }

            // the body is delimited by the encoding, not by Content-Length
            request.headers.remove(&HeaderName::TransferEncoding);
            request.headers.set_content_length(body.len() as u64);

            if !body.is_empty() {
                request.body = Some(BodyKind::Bytes(body));
            }
            return Ok(());
        }
    }

    let content_length = match request.headers.get(&HeaderName::ContentLength) {
        Some(value) => value.parse_number().ok_or(Error::ParseError(HttpParseError::InvalidContentLength))?,
        None => 0,
    };
    if content_length == 0 {
        return Ok(());
    }

    let mut reader = LimitedReader::new(stream, content_length, false);
    let mut body = Vec::with_capacity(content_length.min(1024 * 1024) as usize);
    reader.read_to_end(&mut body).await?;
    if !body.is_empty() {
        request.body = Some(BodyKind::Bytes(body));
    }
    Ok(())
}

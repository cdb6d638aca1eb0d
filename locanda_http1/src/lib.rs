// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! The HTTP/1.1 transport: connection handling, request parsing, response
//! serialization and body transfer.

pub mod body;
mod read;

pub use body::{ChunkedReader, ChunkedWriter, LimitedReader};
pub(crate) use read::*;

use std::io::SeekFrom;
use std::mem::swap;
use std::time::{Duration, SystemTime};
use std::io;

use tokio::io::{
    AsyncBufReadExt,
    AsyncReadExt,
    AsyncSeekExt,
    AsyncWriteExt,
    BufReader,
    BufWriter,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::task;
use tokio::time::timeout;

#[cfg(feature = "rustls")]
use tokio_rustls::TlsAcceptor;

use locanda_http::{
    header_value,
    BodyKind,
    ContentRangeHeaderValue,
    Error,
    HeaderName,
    HeaderValue,
    HttpVersion,
    Method,
    Request,
    Response,
    StatusCode,
    StatusCodeClass,
};
use locanda_http_handling::{
    handle_parse_error,
    handle_request,
    responses,
    LocandaConfig,
    LocandaSettings,
};
use locanda_resources::{ContentCoding, StreamingEncoder};

/// The product token sent in the `Server` header.
const SERVER_NAME: &str = "Locanda";

/// Bodies at or below this size aren't worth compressing.
const COMPRESSION_THRESHOLD: u64 = 300;

/// How long to wait for the client's FIN when tearing a connection down, and
/// how much trailing data to discard while doing so.
const TEARDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);
const TEARDOWN_DRAIN_LIMIT: usize = 64 * 1024;

/// Indicates the maximum length of a certain HTTP entity.
pub(crate) struct MaximumLength(pub usize);

impl MaximumLength {
    /// The maximum length of a method name.
    pub const METHOD: MaximumLength = MaximumLength(16);

    /// The maximum length of a request target, including the query string.
    pub const REQUEST_TARGET: MaximumLength = MaximumLength(1024);

    /// The maximum length of a full HTTP header (name + value), excluding the CRLF.
    pub const HEADER: MaximumLength = MaximumLength(4096);

    /// The maximum number of lines in a header block, folds included.
    pub const HEADER_BLOCK_LINES: MaximumLength = MaximumLength(100);
}

/// The strategy to use for transferring the response body.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferStrategy {
    /// Chunked transfer encoding, optionally compressing on the fly.
    Chunked { coding: Option<ContentCoding> },
    Full,
    /// A single contiguous interval of the body, with an inclusive end.
    Ranges { start: u64, end: u64 },
}

#[derive(Debug)]
pub enum ExchangeError {
    MalformedData,
    TimedOut,
    Io(io::Error),
}

impl From<io::Error> for ExchangeError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Whether the connection may carry another exchange after this one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Persistence {
    KeepAlive,
    Close,
}

/// What the response serializer needs to know about the request it answers.
struct ExchangeContext {
    version: HttpVersion,
    accept_encoding: Option<String>,
    /// A HEAD response carries the headers of the equivalent GET, but no
    /// body.
    discard_body: bool,
}

impl ExchangeContext {
    fn error() -> Self {
        Self {
            version: HttpVersion::Http11,
            accept_encoding: None,
            discard_body: false,
        }
    }
}

/// Reads a single request, handles it and sends the response back to the
/// client.
pub async fn handle_exchange<R, W>(reader: &mut R, writer: &mut W, settings: &LocandaSettings) -> Result<Persistence, ExchangeError>
        where R: AsyncBufReadExt + Unpin,
              W: AsyncWriteExt + Unpin {
    let request = match timeout(settings.read_headers_timeout, read_request_excluding_body(reader)).await {
        Ok(request) => request,
        Err(_) => {
            _ = send_response(writer, responses::request_timeout(), &ExchangeContext::error()).await;
            return Err(ExchangeError::TimedOut);
        }
    };

    let mut request = match request {
        Ok(request) => request,
        Err(Error::ParseError(error)) => {
            send_response(writer, handle_parse_error(&error), &ExchangeContext::error()).await?;
            return Err(ExchangeError::MalformedData);
        }
        Err(Error::Other(error)) => return Err(error.into()),
    };

    if let Some(response) = preprocess_request(writer, &mut request).await? {
        let context = ExchangeContext {
            version: request.version,
            accept_encoding: None,
            discard_body: false,
        };
        send_response(writer, response, &context).await?;
        return Ok(Persistence::Close);
    }

    let body_result = match timeout(settings.read_body_timeout, read_request_body(reader, &mut request)).await {
        Ok(body_result) => body_result,
        // a 408 would mislead here: a request was already received, it just
        // never finished its body
        Err(_) => return Err(ExchangeError::TimedOut),
    };
    if let Err(error) = body_result {
        match error {
            Error::ParseError(error) => {
                send_response(writer, handle_parse_error(&error), &ExchangeContext::error()).await?;
                return Err(ExchangeError::MalformedData);
            }
            Error::Other(error) => return Err(error.into()),
        }
    }

    let context = ExchangeContext {
        version: request.version,
        accept_encoding: request.headers.get(&HeaderName::AcceptEncoding)
            .and_then(HeaderValue::as_str_no_convert)
            .map(str::to_string),
        discard_body: request.method == Method::Head,
    };
    let request_close = request.version != HttpVersion::Http11
        || request.headers.connection_close_requested();

    let mut response = handle_request(&mut request, settings).await;
    tracing::debug!("{} {} => {}", request.method.as_string(), request.target.as_str(), response.status.code());

    if request_close && request.version == HttpVersion::Http11 {
        response.mark_connection_close();
    }
    let persistence = if request_close || response.headers.connection_close_requested() {
        Persistence::Close
    } else {
        Persistence::KeepAlive
    };

    finish_response(&mut response);
    send_response(writer, response, &context).await?;

    Ok(persistence)
}

/// The early checks that run between the header section and the body: the
/// `Host` requirement, `Expect` handling and connection-header hygiene for
/// older clients. Returns the response to reject the request with, if any.
async fn preprocess_request<W>(writer: &mut W, request: &mut Request) -> Result<Option<Response>, ExchangeError>
        where W: AsyncWriteExt + Unpin {
    if request.version == HttpVersion::Http11 && !request.headers.contains(&HeaderName::Host) {
        let mut response = responses::error_page(StatusCode::BadRequest, "Missing 'Host' header");
        response.mark_connection_close();
        return Ok(Some(response));
    }

    if let Some(expect) = request.headers.get(&HeaderName::Expect).and_then(HeaderValue::as_str_no_convert) {
        if expect.eq_ignore_ascii_case("100-continue") && request.version == HttpVersion::Http11 {
            // interim response, sent before the client commits to the body
            writer.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await?;
            writer.flush().await?;
        } else {
            let mut response = responses::error_page_default(StatusCode::ExpectationFailed);
            response.mark_connection_close();
            return Ok(Some(response));
        }
    }

    if request.version != HttpVersion::Http11 {
        // RFC 2616 section 14.10: remove connection headers from older versions
        let named: Vec<String> = request.headers.get(&HeaderName::Connection)
            .and_then(HeaderValue::as_str_no_convert)
            .map(|value| header_value::split_elements(value).iter().map(|element| element.to_string()).collect())
            .unwrap_or_default();
        for name in named {
            request.headers.remove(&HeaderName::from(name));
        }
    }

    Ok(None)
}

/// Stamps the ambient response headers that every response carries.
fn finish_response(response: &mut Response) {
    if !response.headers.contains(&HeaderName::Date) {
        response.headers.set(HeaderName::Date, HeaderValue::DateTime(SystemTime::now()));
    }
    if !response.headers.contains(&HeaderName::Server) {
        response.headers.set(HeaderName::Server, HeaderValue::StaticString(SERVER_NAME));
    }
}

/// Plans out the best `TransferStrategy` for the given response, setting the
/// framing headers accordingly.
fn determine_transfer_strategy(response: &mut Response, context: &ExchangeContext) -> TransferStrategy {
    // some statuses never carry a body, nor framing headers
    if response.status.class() == StatusCodeClass::Informational
            || response.status == StatusCode::NotModified
            || response.status == StatusCode::NoContent {
        return TransferStrategy::Full;
    }

    // a handler that set a Content-Range serves a partial body
    if let Some(HeaderValue::ContentRange(ContentRangeHeaderValue::Range { start, end, .. })) = response.headers.get(&HeaderName::ContentRange) {
        let (start, end) = (*start, *end);
        if response.status == StatusCode::Ok {
            response.status = StatusCode::PartialContent;
        }
        response.headers.set_content_length(end - start + 1);
        return TransferStrategy::Ranges { start, end };
    }

    let Some(body) = &response.body else {
        response.headers.set_content_length(0);
        return TransferStrategy::Full;
    };
    let size = body.size();

    // a handler that framed the body itself is left alone
    if response.headers.contains(&HeaderName::TransferEncoding) {
        return TransferStrategy::Chunked { coding: None };
    }
    if response.headers.contains(&HeaderName::ContentLength) {
        return TransferStrategy::Full;
    }

    if !response.headers.contains(&HeaderName::ContentType) {
        response.headers.set_content_type(locanda_resources::MediaType::OCTET_STREAM);
    }

    // a Last-Modified in the future isn't a valid validator
    if let Some(HeaderValue::DateTime(modified)) = response.headers.get(&HeaderName::LastModified) {
        let now = SystemTime::now();
        if *modified > now {
            response.headers.set(HeaderName::LastModified, HeaderValue::DateTime(now));
        }
    }

    let compressible = response.headers.get(&HeaderName::ContentType)
        .map(|value| value.to_string())
        .is_some_and(|content_type| locanda_resources::is_compressible(&content_type));

    if context.version == HttpVersion::Http11 && compressible {
        response.headers.set(HeaderName::Vary, "Accept-Encoding".into());

        let coding = context.accept_encoding.as_deref().and_then(locanda_resources::negotiate);
        if let Some(coding) = coding {
            if size > COMPRESSION_THRESHOLD {
                response.headers.set(HeaderName::ContentEncoding, HeaderValue::ContentCoding(coding));
                response.headers.set(HeaderName::TransferEncoding, "chunked".into());
                return TransferStrategy::Chunked { coding: Some(coding) };
            }
        }
    }

    response.headers.set_content_length(size);
    TransferStrategy::Full
}

/// Send the response to the client.
async fn send_response<W>(stream: &mut W, mut response: Response, context: &ExchangeContext) -> Result<(), io::Error>
        where W: AsyncWriteExt + Unpin {
    let transfer_strategy = determine_transfer_strategy(&mut response, context);

    let mut response_text = String::with_capacity(1024);
    response_text.push_str(response.version.as_str());
    response_text.push(' ');
    response_text.push_str(&response.status.to_string());
    response_text.push_str("\r\n");

    for (name, value) in response.headers.iter() {
        response_text.push_str(name.to_string_h1());
        response_text.push_str(": ");
        value.append_to_message(&mut response_text);
        response_text.push_str("\r\n");
    }

    response_text.push_str("\r\n");

    stream.write_all(response_text.as_bytes()).await?;

    if !context.discard_body {
        if let Some(body) = response.body {
            transfer_body(stream, body, transfer_strategy).await?;
        }
    }
    stream.flush().await?;
    Ok(())
}

async fn transfer_body<W>(stream: &mut W, body: BodyKind, strategy: TransferStrategy) -> Result<(), io::Error>
        where W: AsyncWriteExt + Unpin {
    match strategy {
        TransferStrategy::Full => match body {
            BodyKind::File { mut handle, .. } => transfer_body_full(stream, &mut handle).await,
            BodyKind::Bytes(bytes) => stream.write_all(&bytes).await,
            BodyKind::StaticString(string) => stream.write_all(string.as_bytes()).await,
            BodyKind::String(string) => stream.write_all(string.as_bytes()).await,
        },
        TransferStrategy::Chunked { coding } => match body {
            BodyKind::File { mut handle, .. } => transfer_body_chunked(stream, &mut handle, coding).await,
            other => {
                let bytes = other.as_bytes().unwrap_or_default().to_vec();
                transfer_body_chunked(stream, &mut std::io::Cursor::new(bytes), coding).await
            }
        },
        TransferStrategy::Ranges { start, end } => match body {
            BodyKind::File { mut handle, .. } => transfer_body_ranges(stream, &mut handle, start, end).await,
            other => {
                let bytes = other.as_bytes().unwrap_or_default();
                let start = start.min(bytes.len() as u64) as usize;
                let end = end.min(bytes.len().saturating_sub(1) as u64) as usize;
                if bytes.is_empty() || start > end {
                    return Ok(());
                }
                stream.write_all(&bytes[start..=end]).await
            }
        },
    }
}

/// Transfer the full body, overlapping the next read with the current write.
async fn transfer_body_full<O, I>(output: &mut O, input: &mut I) -> Result<(), io::Error>
        where O: AsyncWriteExt + Unpin,
              I: AsyncReadExt + Unpin {
    let mut buf1 = [0; 8192];
    let mut buf2 = [0; 8192];

    let mut front_buf = &mut buf1;
    let mut back_buf = &mut buf2;

    let mut len = input.read(front_buf).await?;

    loop {
        if len == 0 {
            break;
        }

        let write_fut = output.write_all(&front_buf[0..len]);
        len = input.read(back_buf).await?;
        write_fut.await?;

        swap(&mut front_buf, &mut back_buf);
    }

    Ok(())
}

/// Transfer the body with the `Transfer-Encoding: chunked` algorithm,
/// compressing on the fly when a content coding was negotiated.
async fn transfer_body_chunked<O, I>(output: &mut O, input: &mut I, coding: Option<ContentCoding>) -> Result<(), io::Error>
        where O: AsyncWriteExt + Unpin,
              I: AsyncReadExt + Unpin {
    let mut writer = ChunkedWriter::new(output);
    let mut buf: [u8; 16384] = [0; 16384];

    match coding {
        None => loop {
            let len = input.read(&mut buf).await?;
            if len == 0 {
                break;
            }
            writer.write(&buf[..len]).await?;
        },
        Some(coding) => {
            let mut encoder = StreamingEncoder::new(coding);
            loop {
                let len = input.read(&mut buf).await?;
                if len == 0 {
                    break;
                }
                encoder.write(&buf[..len])?;
                writer.write(&encoder.take_output()).await?;
            }
            writer.write(&encoder.finish()?).await?;
        }
    }

    writer.finish(None).await
}

/// Transfer the requested interval of the body.
async fn transfer_body_ranges<O, I>(output: &mut O, input: &mut I, start: u64, end: u64) -> Result<(), io::Error>
        where O: AsyncWriteExt + Unpin,
              I: AsyncReadExt + AsyncSeekExt + Unpin {
    let mut buf: [u8; 8192] = [0; 8192];
    input.seek(SeekFrom::Start(start)).await?;
    let mut remaining = (end - start + 1) as usize;
    while remaining > 0 {
        let len = input.read(&mut buf).await?;
        if len == 0 {
            break;
        }
        let len = std::cmp::min(len, remaining);
        output.write_all(&buf[0..len]).await?;
        remaining -= len;
    }
    Ok(())
}

/// Runs the exchange loop over a buffered reader/writer pair until the
/// connection is done, reporting whether teardown should wait for the
/// client.
async fn drive_connection<R, W>(reader: &mut R, writer: &mut W, settings: &LocandaSettings)
        where R: AsyncBufReadExt + Unpin,
              W: AsyncWriteExt + Unpin {
    loop {
        match handle_exchange(reader, writer, settings).await {
            Ok(Persistence::KeepAlive) => continue,
            Ok(Persistence::Close) => return,
            Err(ExchangeError::Io(error)) => {
                // a client closing between requests isn't noteworthy
                if error.kind() != io::ErrorKind::UnexpectedEof {
                    tracing::debug!("connection error: {error}");
                }
                return;
            }
            Err(ExchangeError::TimedOut) => {
                tracing::debug!("connection timed out");
                return;
            }
            Err(ExchangeError::MalformedData) => return,
        }
    }
}

/// Process a single socket connection.
async fn process_socket(stream: TcpStream, config: LocandaConfig) {
    #[cfg(feature = "rustls")]
    if let Some(tls_config) = &config.tls_config {
        let acceptor = TlsAcceptor::from(std::sync::Arc::clone(tls_config));
        let stream = match acceptor.accept(stream).await {
            Ok(stream) => stream,
            Err(_) => return,
        };
        let (reader, writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);
        let mut writer = BufWriter::new(writer);
        drive_connection(&mut reader, &mut writer, &config.settings).await;
        _ = writer.shutdown().await;
        return;
    }

    let (reader, writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut writer = BufWriter::new(writer);

    drive_connection(&mut reader, &mut writer, &config.settings).await;

    // half-close: signal we're done writing, then wait briefly for the
    // client's FIN so it doesn't see a reset before reading our response
    _ = writer.flush().await;
    _ = writer.shutdown().await;
    _ = timeout(TEARDOWN_DRAIN_TIMEOUT, async {
        let mut buffer = [0u8; 8192];
        let mut drained = 0;
        while drained < TEARDOWN_DRAIN_LIMIT {
            match reader.read(&mut buffer).await {
                Ok(0) | Err(_) => break,
                Ok(read) => drained += read,
            }
        }
    }).await;
}

/// Serves connections from the given listener until the process ends.
pub async fn run(listener: TcpListener, config: LocandaConfig) -> io::Result<()> {
    loop {
        let (stream, address) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(error) => {
                tracing::warn!("error accepting connection: {error}");
                task::yield_now().await;
                continue;
            }
        };
        tracing::trace!("accepted connection from {address}");
        let config = config.clone();
        task::spawn(async move {
            process_socket(stream, config).await;
        });
    }
}

/// Start the HTTP/1.1 server on the given address.
pub async fn start(address: &str, config: LocandaConfig) -> io::Result<()> {
    let listener = TcpListener::bind(address).await?;
    tracing::info!("listening on {address}");
    run(listener, config).await
}

#[cfg(test)]
mod tests {
    use locanda_http::{HeaderMap, HttpRangeList, RequestTarget};
    use rstest::rstest;

    use super::*;

    fn context(version: HttpVersion, accept_encoding: Option<&str>) -> ExchangeContext {
        ExchangeContext {
            version,
            accept_encoding: accept_encoding.map(str::to_string),
            discard_body: false,
        }
    }

    fn html_response(body_size: usize) -> Response {
        let mut response = Response::with_status(StatusCode::Ok);
        response.headers.set_content_type(locanda_resources::MediaType::HTML);
        response.body = Some(BodyKind::String("x".repeat(body_size)));
        response
    }

    #[test]
    fn bodyless_response_gets_content_length_zero() {
        let mut response = Response::with_status(StatusCode::Ok);
        let strategy = determine_transfer_strategy(&mut response, &context(HttpVersion::Http11, None));
        assert_eq!(strategy, TransferStrategy::Full);
        assert_eq!(response.headers.get(&HeaderName::ContentLength), Some(&HeaderValue::Size(0)));
    }

    #[test]
    fn not_modified_carries_no_framing_headers() {
        let mut response = Response::with_status(StatusCode::NotModified);
        let strategy = determine_transfer_strategy(&mut response, &context(HttpVersion::Http11, None));
        assert_eq!(strategy, TransferStrategy::Full);
        assert!(!response.headers.contains(&HeaderName::ContentLength));
    }

    #[test]
    fn content_range_rewrites_status_and_length() {
        let mut response = Response::with_status(StatusCode::Ok);
        response.headers.set_content_range(ContentRangeHeaderValue::Range { start: 900, end: 999, complete_length: Some(1000) });
        response.body = Some(BodyKind::Bytes(vec![0; 1000]));

        let strategy = determine_transfer_strategy(&mut response, &context(HttpVersion::Http11, None));
        assert_eq!(strategy, TransferStrategy::Ranges { start: 900, end: 999 });
        assert_eq!(response.status, StatusCode::PartialContent);
        assert_eq!(response.headers.get(&HeaderName::ContentLength), Some(&HeaderValue::Size(100)));
    }

    #[rstest]
    #[case(HttpVersion::Http11, Some("gzip"), 1000, true)]
    // too small to compress
    #[case(HttpVersion::Http11, Some("gzip"), 300, false)]
    // HTTP/1.0 clients don't get chunked bodies
    #[case(HttpVersion::Http10, Some("gzip"), 1000, false)]
    #[case(HttpVersion::Http11, None, 1000, false)]
    #[case(HttpVersion::Http11, Some("br, zstd"), 1000, false)]
    #[test]
    fn compression_negotiation(#[case] version: HttpVersion, #[case] accept: Option<&str>, #[case] size: usize, #[case] compressed: bool) {
        let mut response = html_response(size);
        let strategy = determine_transfer_strategy(&mut response, &context(version, accept));
        if compressed {
            assert_eq!(strategy, TransferStrategy::Chunked { coding: Some(ContentCoding::Gzip) });
            assert!(response.headers.contains(&HeaderName::ContentEncoding));
            assert_eq!(response.headers.get(&HeaderName::TransferEncoding).and_then(HeaderValue::as_str_no_convert), Some("chunked"));
        } else {
            assert_eq!(strategy, TransferStrategy::Full);
            assert!(!response.headers.contains(&HeaderName::ContentEncoding));
            assert_eq!(response.headers.get(&HeaderName::ContentLength), Some(&HeaderValue::Size(size as u64)));
        }
    }

    #[test]
    fn incompressible_content_is_sent_in_full() {
        let mut response = Response::with_status(StatusCode::Ok);
        response.headers.set_content_type(locanda_resources::MediaType::PNG);
        response.body = Some(BodyKind::Bytes(vec![0; 10_000]));
        let strategy = determine_transfer_strategy(&mut response, &context(HttpVersion::Http11, Some("gzip")));
        assert_eq!(strategy, TransferStrategy::Full);
        assert!(!response.headers.contains(&HeaderName::Vary));
    }

    #[test]
    fn future_last_modified_is_clamped() {
        let mut response = Response::with_status(StatusCode::Ok);
        response.body = Some(BodyKind::StaticString("body"));
        let future = SystemTime::now() + Duration::from_secs(86400);
        response.headers.set(HeaderName::LastModified, HeaderValue::DateTime(future));

        determine_transfer_strategy(&mut response, &context(HttpVersion::Http11, None));
        let clamped: SystemTime = response.headers.get(&HeaderName::LastModified).unwrap().try_into().unwrap();
        assert!(clamped <= SystemTime::now());
    }

    #[tokio::test]
    async fn send_response_serializes_status_line_and_headers() {
        let mut response = Response::with_status_and_string_body(StatusCode::Ok, "Hello");
        response.headers.set(HeaderName::Server, HeaderValue::StaticString(SERVER_NAME));

        let mut output = Vec::new();
        send_response(&mut output, response, &context(HttpVersion::Http11, None)).await.unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Server: Locanda\r\n"));
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(text.ends_with("\r\n\r\nHello"));
    }

    #[tokio::test]
    async fn head_response_has_headers_but_no_body() {
        let response = Response::with_status_and_string_body(StatusCode::Ok, "Hello");
        let mut head_context = context(HttpVersion::Http11, None);
        head_context.discard_body = true;

        let mut output = Vec::new();
        send_response(&mut output, response, &head_context).await.unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn range_transfer_from_bytes() {
        let mut output = Vec::new();
        let body = BodyKind::Bytes(b"0123456789".to_vec());
        transfer_body(&mut output, body, TransferStrategy::Ranges { start: 2, end: 5 }).await.unwrap();
        assert_eq!(output, b"2345");
    }

    #[tokio::test]
    async fn range_transfer_from_empty_bytes_writes_nothing() {
        let mut output = Vec::new();
        let body = BodyKind::Bytes(Vec::new());
        transfer_body(&mut output, body, TransferStrategy::Ranges { start: 0, end: 0 }).await.unwrap();
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn range_transfer_clamps_past_the_end_of_bytes() {
        let mut output = Vec::new();
        let body = BodyKind::Bytes(b"0123456789".to_vec());
        transfer_body(&mut output, body, TransferStrategy::Ranges { start: 8, end: 20 }).await.unwrap();
        assert_eq!(output, b"89");
    }

    #[tokio::test]
    async fn missing_host_yields_bad_request() {
        let mut request = Request {
            method: Method::Get,
            target: RequestTarget::parse("/").unwrap(),
            version: HttpVersion::Http11,
            headers: HeaderMap::new(),
            body: None,
        };
        let mut writer = Vec::new();
        let response = preprocess_request(&mut writer, &mut request).await.unwrap();
        assert_eq!(response.map(|response| response.status), Some(StatusCode::BadRequest));
    }

    #[tokio::test]
    async fn expect_100_continue_sends_interim_response() {
        let mut request = Request {
            method: Method::Post,
            target: RequestTarget::parse("/upload").unwrap(),
            version: HttpVersion::Http11,
            headers: HeaderMap::new(),
            body: None,
        };
        request.headers.set(HeaderName::Host, "example.com".into());
        request.headers.set(HeaderName::Expect, "100-continue".into());

        let mut writer = Vec::new();
        let response = preprocess_request(&mut writer, &mut request).await.unwrap();
        assert!(response.is_none());
        assert_eq!(writer, b"HTTP/1.1 100 Continue\r\n\r\n");
    }

    #[tokio::test]
    async fn unknown_expectation_fails() {
        let mut request = Request {
            method: Method::Post,
            target: RequestTarget::parse("/upload").unwrap(),
            version: HttpVersion::Http11,
            headers: HeaderMap::new(),
            body: None,
        };
        request.headers.set(HeaderName::Host, "example.com".into());
        request.headers.set(HeaderName::Expect, "202-accepted".into());

        let mut writer = Vec::new();
        let response = preprocess_request(&mut writer, &mut request).await.unwrap();
        assert_eq!(response.map(|response| response.status), Some(StatusCode::ExpectationFailed));
        assert!(writer.is_empty());
    }

    #[tokio::test]
    async fn old_clients_lose_connection_named_headers() {
        let mut request = Request {
            method: Method::Get,
            target: RequestTarget::parse("/").unwrap(),
            version: HttpVersion::Http10,
            headers: HeaderMap::new(),
            body: None,
        };
        request.headers.set(HeaderName::Connection, "keep-alive".into());
        request.headers.set(HeaderName::KeepAlive, "timeout=5".into());

        let mut writer = Vec::new();
        let response = preprocess_request(&mut writer, &mut request).await.unwrap();
        assert!(response.is_none());
        assert!(!request.headers.contains(&HeaderName::KeepAlive));
    }

    #[tokio::test]
    async fn body_read_timeout_terminates_without_a_response() {
        let settings = LocandaSettings {
            hosts: locanda_http_handling::VirtualHostSet::new(locanda_http_handling::VirtualHost::new(None)),
            read_headers_timeout: Duration::from_secs(5),
            read_body_timeout: Duration::from_millis(50),
        };

        // the head arrives, the five body bytes never do
        let (mut client, server) = tokio::io::duplex(1024);
        client.write_all(b"POST / HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\n\r\n").await.unwrap();

        let mut reader = BufReader::new(server);
        let mut writer = Vec::new();
        let result = handle_exchange(&mut reader, &mut writer, &settings).await;
        assert!(matches!(result, Err(ExchangeError::TimedOut)));
        assert!(writer.is_empty(), "unexpected response: {}", String::from_utf8_lossy(&writer));
    }

    #[test]
    fn resolved_range_is_shared_with_strategy() {
        // the interval the handler resolves is the one the transfer uses
        let list = HttpRangeList::parse("bytes=0-49,900-").unwrap();
        let (start, end) = list.resolve(1000).unwrap();
        let mut response = Response::with_status(StatusCode::Ok);
        response.headers.set_content_range(ContentRangeHeaderValue::Range { start, end, complete_length: Some(1000) });
        response.body = Some(BodyKind::Bytes(vec![0; 1000]));
        let strategy = determine_transfer_strategy(&mut response, &context(HttpVersion::Http11, None));
        assert_eq!(strategy, TransferStrategy::Ranges { start: 0, end: 999 });
    }
}

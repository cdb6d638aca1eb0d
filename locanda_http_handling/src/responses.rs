// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! This module creates complete responses for handling common cases.

use std::borrow::Cow;
use std::hash::{Hash, Hasher};

use locanda_http::{BodyKind, HeaderName, HeaderValue, Response, StatusCode};
use locanda_resources::MediaType;

/// Escapes `&`, `<`, `>`, `"` and `'` for embedding in HTML text.
#[must_use]
pub fn escape_html(text: &str) -> Cow<str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 30);
    for character in text.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '>' => escaped.push_str("&gt;"),
            '<' => escaped.push_str("&lt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(character),
        }
    }
    Cow::Owned(escaped)
}

/// Creates a full response carrying the given HTML string, tagged with a
/// weak ETag derived from the content so clients can revalidate it.
#[must_use]
pub fn page(status: StatusCode, html: String) -> Response {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    html.hash(&mut hasher);
    let etag = format!("W/\"{:x}\"", hasher.finish());

    let mut response = Response::with_status(status);
    response.headers.set_content_type(MediaType::HTML);
    response.headers.set(HeaderName::ETag, HeaderValue::String(etag));
    response.body = Some(BodyKind::String(html));
    response
}

/// Creates an HTML error page for the given status, with the detail text
/// escaped into the body.
#[must_use]
pub fn error_page(status: StatusCode, text: &str) -> Response {
    let code = status.code();
    let reason = status.reason_phrase();
    let html = format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{code} {reason}</title></head>\n<body><h1>{code} {reason}</h1>\n<p>{}</p>\n</body></html>",
        escape_html(text),
    );
    page(status, html)
}

/// The error page with the stock message for the status.
#[must_use]
pub fn error_page_default(status: StatusCode) -> Response {
    let text = if status.code() < 400 { ":)" } else { "sorry it didn't work out :(" };
    error_page(status, text)
}

/// Percent-encodes the bytes of a URL that may not appear verbatim in a
/// header field: everything outside the visible ASCII range.
#[must_use]
fn ascii_url(url: &str) -> Cow<str> {
    if url.bytes().all(|byte| (b'!'..=b'~').contains(&byte)) {
        return Cow::Borrowed(url);
    }

    let mut encoded = String::with_capacity(url.len() + 12);
    for byte in url.bytes() {
        if (b'!'..=b'~').contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    Cow::Owned(encoded)
}

/// Creates a response redirecting the client to the given URL. Some
/// user-agents expect a body, so one is sent.
#[must_use]
pub fn redirect(url: &str, permanent: bool) -> Response {
    let mut response = if permanent {
        error_page(StatusCode::MovedPermanently, &format!("Permanently moved to {url}"))
    } else {
        error_page(StatusCode::Found, &format!("Temporarily moved to {url}"))
    };
    response.headers.set(HeaderName::Location, HeaderValue::String(ascii_url(url).into_owned()));
    response
}

/// Create a response for when the request times out.
#[must_use]
pub fn request_timeout() -> Response {
    let mut response = error_page(StatusCode::RequestTimeout, "Timeout waiting for client request");
    response.mark_connection_close();
    response
}

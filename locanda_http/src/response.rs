// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::borrow::Cow;

use locanda_resources::MediaType;

use crate::{
    BodyKind,
    HeaderMap,
    HeaderName,
    HeaderValue,
    HttpVersion,
    StatusCode,
};

#[derive(Debug)]
pub struct Response {
    pub version: HttpVersion,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Option<BodyKind>,
}

impl Response {
    pub fn with_status(status: StatusCode) -> Self {
        Self {
            version: HttpVersion::Http11,
            status,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_status_and_string_body(status: StatusCode, body: impl Into<Cow<'static, str>>) -> Self {
        let mut headers = HeaderMap::new();
        headers.set(HeaderName::ContentType, HeaderValue::from(MediaType::PLAIN_TEXT));
        Self {
            version: HttpVersion::Http11,
            status,
            headers,
            body: match body.into() {
                Cow::Owned(body) => Some(BodyKind::String(body)),
                Cow::Borrowed(body) => Some(BodyKind::StaticString(body)),
            },
        }
    }

    /// Marks the connection to be closed after this response.
    pub fn mark_connection_close(&mut self) {
        self.headers.set(HeaderName::Connection, "close".into());
    }
}

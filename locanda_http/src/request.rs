// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use hashbrown::HashMap;

use crate::{
    BodyKind,
    HeaderMap,
    HeaderName,
    HttpRangeList,
    HttpVersion,
    Method,
    RequestTarget,
};

/// Form bodies larger than this are not decoded into parameters.
const MAXIMUM_FORM_BODY_LENGTH: usize = 2 * 1024 * 1024;

#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub target: RequestTarget,
    pub version: HttpVersion,
    pub headers: HeaderMap,
    pub body: Option<BodyKind>,
}

impl Request {
    /// The host this request is directed at.
    ///
    /// Precedence: a host embedded in an absolute request URI, then the
    /// `Host` header (port stripped), then the local machine name as a last
    /// resort for HTTP/1.0 clients that don't send a `Host` header.
    #[must_use]
    pub fn host(&self) -> String {
        if let RequestTarget::Absolute(url) = &self.target {
            let rest = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
            let authority = rest.split(['/', '?']).next().unwrap_or(rest);
            if !authority.is_empty() {
                return strip_port(authority).to_string();
            }
        }

        if let Some(host) = self.headers.get(&HeaderName::Host).and_then(|value| value.as_str_no_convert()) {
            return strip_port(host).to_string();
        }

        std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
    }

    /// Resolves the `Range` header to an absolute interval against a
    /// resource of the given length. An absent, malformed, or out-of-order
    /// header yields `None`, which callers must treat as "ignore the header".
    #[must_use]
    pub fn range(&self, length: u64) -> Option<(u64, u64)> {
        self.headers.get(&HeaderName::Range)
            .and_then(|value| value.as_str_no_convert())
            .and_then(HttpRangeList::parse)
            .and_then(|list| list.resolve(length))
    }

    /// Rewrites the request path, collapsing duplicated `/` characters. Used
    /// internally for welcome-file resolution; any routing state derived
    /// from the old path must be re-resolved afterwards.
    pub fn set_path(&mut self, new_path: &str) {
        let query = self.target.query().to_string();
        let mut input = new_path.to_string();
        if !query.is_empty() {
            input.push('?');
            input.push_str(&query);
        }
        if let Some(target) = RequestTarget::parse(input) {
            self.target = target;
        }
    }

    /// All request parameters as name/value pairs, in original order:
    /// URL-decoded pairs from the query string first, then pairs from the
    /// body when it is `application/x-www-form-urlencoded` (up to a 2 MiB
    /// cap). Duplicate names are preserved.
    #[must_use]
    pub fn parameter_list(&self) -> Vec<(String, String)> {
        let mut parameters = decode_form_urlencoded(self.target.query());

        let content_type = self.headers.get(&HeaderName::ContentType)
            .map(|value| value.to_string())
            .unwrap_or_default();
        if content_type.starts_with("application/x-www-form-urlencoded") {
            if let Some(body) = self.body.as_ref().and_then(BodyKind::as_bytes) {
                if body.len() <= MAXIMUM_FORM_BODY_LENGTH {
                    parameters.extend(decode_form_urlencoded(&String::from_utf8_lossy(body)));
                }
            }
        }

        parameters
    }

    /// The request parameters coalesced into a single-valued map; duplicate
    /// names keep only the first occurrence.
    #[must_use]
    pub fn parameter_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for (name, value) in self.parameter_list() {
            map.entry(name).or_insert(value);
        }
        map
    }
}

fn strip_port(host: &str) -> &str {
    host.split_once(':').map(|(host, _)| host).unwrap_or(host)
}

fn decode_form_urlencoded(input: &str) -> Vec<(String, String)> {
    let mut parameters = Vec::new();
    for pair in input.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        let name = urlencoding::decode(name).map(|name| name.into_owned()).unwrap_or_else(|_| name.to_string());
        let value = urlencoding::decode(value).map(|value| value.into_owned()).unwrap_or_else(|_| value.to_string());
        parameters.push((name, value));
    }
    parameters
}

// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use phf::phf_map;
use unicase::UniCase;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Method {
    Other(String),
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
}

impl Method {
    /// Get the method in string form.
    ///
    /// # Notes
    /// Method names are case-sensitive, as per
    /// [RFC 9110 - Section 9.1](https://www.rfc-editor.org/rfc/rfc9110.html#section-9.1-5):
    /// > The method token is case-sensitive because it might be used as a
    /// > gateway to object-based systems with case-sensitive method names. By
    /// > convention, standardized methods are defined in all-uppercase US-ASCII
    /// > letters.
    pub fn as_string(&self) -> &str {
        match self {
            Self::Other(str) => str,
            Self::Connect => "CONNECT",
            Self::Delete => "DELETE",
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Trace => "TRACE",
        }
    }
}

static METHOD_MAP: phf::Map<UniCase<&'static str>, Method> = phf_map!(
    UniCase::ascii("connect") => Method::Connect,
    UniCase::ascii("delete") => Method::Delete,
    UniCase::ascii("get") => Method::Get,
    UniCase::ascii("head") => Method::Head,
    UniCase::ascii("options") => Method::Options,
    UniCase::ascii("patch") => Method::Patch,
    UniCase::ascii("post") => Method::Post,
    UniCase::ascii("put") => Method::Put,
    UniCase::ascii("trace") => Method::Trace,
);

impl From<String> for Method {
    fn from(value: String) -> Self {
        if value != value.to_ascii_uppercase() {
            return Method::Other(value);
        }
        match METHOD_MAP.get(&UniCase::ascii(&value)) {
            Some(method) => method.clone(),
            None => Method::Other(value),
        }
    }
}

impl From<&str> for Method {
    fn from(value: &str) -> Self {
        Method::from(value.to_string())
    }
}

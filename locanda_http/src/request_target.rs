// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::borrow::Cow;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RequestTarget {
    Origin {
        path: String,
        query: String,
    },
    Absolute(String),
    Asterisk,
}

impl RequestTarget {
    pub fn parse<'a>(input: impl Into<Cow<'a, str>>) -> Option<Self> {
        let input = input.into();
        if input == "*" {
            return Some(Self::Asterisk);
        }

        if input.starts_with('/') {
            if let Some((path, query)) = input.split_once('?') {
                return Some(Self::Origin {
                    path: collapse_duplicate_slashes(path),
                    query: query.to_string(),
                });
            }

            return Some(Self::Origin { path: collapse_duplicate_slashes(&input), query: String::new() });
        }

        if input.starts_with("http://") || input.starts_with("https://") {
            return Some(RequestTarget::Absolute(input.into_owned()));
        }

        None
    }

    /// Returns the path component of the request target.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            RequestTarget::Origin { path, .. } => path,
            RequestTarget::Absolute(string) => {
                let rest = string.split_once("://").map(|(_, rest)| rest).unwrap_or(string);
                let rest = rest.split_once('?').map(|(path, _)| path).unwrap_or(rest);
                rest.find('/').map(|index| &rest[index..]).unwrap_or("/")
            }
            RequestTarget::Asterisk => "*",
        }
    }

    /// Returns the query component of the request target, without the `?`.
    #[must_use]
    pub fn query(&self) -> &str {
        match self {
            RequestTarget::Origin { query, .. } => query,
            RequestTarget::Absolute(string) => string.split_once('?').map(|(_, query)| query).unwrap_or(""),
            RequestTarget::Asterisk => "",
        }
    }

    /// Returns the request target as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            RequestTarget::Origin { path, .. } => path,
            RequestTarget::Absolute(string) => string,
            RequestTarget::Asterisk => "*",
        }
    }
}

/// Collapses duplicated `/` characters into a single one. Clients sending
/// such paths are malformed but recoverable.
fn collapse_duplicate_slashes(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    let mut previous_was_slash = false;
    for character in path.chars() {
        if character == '/' && previous_was_slash {
            continue;
        }
        previous_was_slash = character == '/';
        result.push(character);
    }
    result
}

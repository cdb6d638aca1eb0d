// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! This crate contains the HTTP/1.1 data model: methods, status codes,
//! headers, requests, responses and byte ranges.

pub mod error;
pub mod header_map;
pub mod header_name;
pub mod header_value;
pub mod method;
pub mod range;
pub mod request;
pub mod request_target;
pub mod response;
pub mod status;
pub mod syntax;
pub mod version;

pub use error::*;
pub use header_map::*;
pub use header_name::*;
pub use header_value::*;
pub use method::*;
pub use range::*;
pub use request::*;
pub use request_target::*;
pub use response::*;
pub use status::*;
pub use version::*;

#[derive(Debug)]
pub enum BodyKind {
    Bytes(Vec<u8>),
    File {
        handle: tokio::fs::File,
        size: u64,
    },
    StaticString(&'static str),
    String(String),
}

impl BodyKind {
    /// The size of the body in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        match self {
            BodyKind::Bytes(bytes) => bytes.len() as u64,
            BodyKind::File { size, .. } => *size,
            BodyKind::StaticString(string) => string.len() as u64,
            BodyKind::String(string) => string.len() as u64,
        }
    }

    /// Returns the body as a byte slice, unless the body is backed by a file.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            BodyKind::Bytes(bytes) => Some(bytes),
            BodyKind::File { .. } => None,
            BodyKind::StaticString(string) => Some(string.as_bytes()),
            BodyKind::String(string) => Some(string.as_bytes()),
        }
    }
}

impl From<&'static str> for BodyKind {
    fn from(value: &'static str) -> Self {
        Self::StaticString(value)
    }
}

impl From<String> for BodyKind {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<u8>> for BodyKind {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

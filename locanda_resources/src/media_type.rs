// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::io::{self, BufRead};

use hashbrown::HashMap;
use phf::phf_map;
use unicase::UniCase;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MediaType {
    Common(&'static str),
    Custom(String),
}

impl MediaType {
    pub fn as_str(&self) -> &str {
        match self {
            MediaType::Common(s) => s,
            MediaType::Custom(s) => s,
        }
    }
}

impl MediaType {
    //
    // General
    //
    pub const OCTET_STREAM: MediaType = MediaType::Common("application/octet-stream");

    //
    // Text
    //
    pub const CASCADING_STYLE_SHEETS: MediaType = MediaType::Common("text/css; charset=utf-8");
    pub const CSV: MediaType = MediaType::Common("text/csv; charset=utf-8");
    pub const HTML: MediaType = MediaType::Common("text/html; charset=utf-8");
    pub const JAVASCRIPT: MediaType = MediaType::Common("text/javascript; charset=utf-8");
    pub const PLAIN_TEXT: MediaType = MediaType::Common("text/plain; charset=utf-8");

    //
    // Application
    //
    pub const GZIP: MediaType = MediaType::Common("application/gzip");
    pub const JAR: MediaType = MediaType::Common("application/java-archive");
    pub const JSON: MediaType = MediaType::Common("application/json; charset=utf-8");
    pub const MSDOWNLOAD: MediaType = MediaType::Common("application/x-msdownload");
    pub const PDF: MediaType = MediaType::Common("application/pdf");
    pub const SEVEN_ZIP: MediaType = MediaType::Common("application/x-7z-compressed");
    pub const TAR: MediaType = MediaType::Common("application/x-tar");
    pub const XHTML: MediaType = MediaType::Common("application/xhtml+xml");
    pub const XML: MediaType = MediaType::Common("application/xml; charset=utf-8");
    pub const ZIP: MediaType = MediaType::Common("application/zip");

    //
    // Image
    //
    pub const GIF: MediaType = MediaType::Common("image/gif");
    pub const ICO: MediaType = MediaType::Common("image/x-icon");
    pub const JPEG: MediaType = MediaType::Common("image/jpeg");
    pub const PNG: MediaType = MediaType::Common("image/png");
    pub const SVG: MediaType = MediaType::Common("image/svg+xml");

    //
    // Audio
    //
    pub const MP3: MediaType = MediaType::Common("audio/mpeg");

    //
    // Font
    //
    pub const WOFF: MediaType = MediaType::Common("font/woff");
    pub const WOFF2: MediaType = MediaType::Common("font/woff2");

    //
    // Misc
    //
    pub const MESSAGE_HTTP: MediaType = MediaType::Common("message/http");

    /// Returns the built-in media type for the given extension.
    #[must_use]
    pub fn from_extension(extension: &str) -> &'static MediaType {
        MEDIA_TYPE_BY_EXTENSION.get(&UniCase::ascii(extension)).unwrap_or(&MediaType::OCTET_STREAM)
    }
}

static MEDIA_TYPE_BY_EXTENSION: phf::Map<UniCase<&'static str>, MediaType> = phf_map!(
    UniCase::ascii("css") => MediaType::CASCADING_STYLE_SHEETS,
    UniCase::ascii("csv") => MediaType::CSV,
    UniCase::ascii("htm") => MediaType::HTML,
    UniCase::ascii("html") => MediaType::HTML,
    UniCase::ascii("js") => MediaType::JAVASCRIPT,
    UniCase::ascii("log") => MediaType::PLAIN_TEXT,
    UniCase::ascii("text") => MediaType::PLAIN_TEXT,
    UniCase::ascii("txt") => MediaType::PLAIN_TEXT,

    UniCase::ascii("7z") => MediaType::SEVEN_ZIP,
    UniCase::ascii("exe") => MediaType::MSDOWNLOAD,
    UniCase::ascii("gz") => MediaType::GZIP,
    UniCase::ascii("jar") => MediaType::JAR,
    UniCase::ascii("json") => MediaType::JSON,
    UniCase::ascii("pdf") => MediaType::PDF,
    UniCase::ascii("tar") => MediaType::TAR,
    UniCase::ascii("tgz") => MediaType::GZIP,
    UniCase::ascii("xhtml") => MediaType::XHTML,
    UniCase::ascii("xml") => MediaType::XML,
    UniCase::ascii("zip") => MediaType::ZIP,

    UniCase::ascii("gif") => MediaType::GIF,
    UniCase::ascii("ico") => MediaType::ICO,
    UniCase::ascii("jpeg") => MediaType::JPEG,
    UniCase::ascii("jpg") => MediaType::JPEG,
    UniCase::ascii("png") => MediaType::PNG,
    UniCase::ascii("svg") => MediaType::SVG,

    UniCase::ascii("mp3") => MediaType::MP3,

    UniCase::ascii("woff") => MediaType::WOFF,
    UniCase::ascii("woff2") => MediaType::WOFF2,
);

/// A suffix-to-media-type table: the built-in table above, overlaid with
/// entries loaded from `mime.types`-formatted sources at configuration time.
///
/// The registry is populated before the server starts and read concurrently
/// by all workers afterwards.
#[derive(Clone, Debug, Default)]
pub struct MediaTypeRegistry {
    custom: HashMap<String, String>,
}

impl MediaTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a standard `mime.types`-formatted stream and merges its entries
    /// into the registry. Lines are whitespace-separated: a content type
    /// followed by one or more suffixes; blank lines and `#` comments are
    /// ignored. Returns the number of suffixes added.
    pub fn load_mime_types<R: BufRead>(&mut self, reader: R) -> io::Result<usize> {
        let mut added = 0;
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let Some(media_type) = fields.next() else {
                continue;
            };
            for suffix in fields {
                self.custom.insert(suffix.to_ascii_lowercase(), media_type.to_string());
                added += 1;
            }
        }
        Ok(added)
    }

    /// Returns the media type for the given path, preferring loaded entries
    /// over the built-in table.
    #[must_use]
    pub fn lookup(&self, path: &str) -> MediaType {
        let extension = path.rsplit('.').next().unwrap_or("");
        if let Some(media_type) = self.custom.get(&extension.to_ascii_lowercase()) {
            return MediaType::Custom(media_type.clone());
        }
        MediaType::from_extension(extension).clone()
    }
}

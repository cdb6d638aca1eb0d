// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Serving of static files from a directory tree, with validators,
//! conditional requests, byte ranges and generated directory indices.

use std::fmt::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use locanda_http::{
    format_system_time_as_weak_etag,
    BodyKind,
    ContentRangeHeaderValue,
    HeaderName,
    HeaderValue,
    Request,
    Response,
    StatusCode,
};
use locanda_resources::{approximate_size, MediaTypeRegistry};

use crate::conditional::{evaluate_preconditions, resolve_range, RangeDecision};
use crate::handler::{Handler, Outcome};
use crate::responses;

/// Serves files under a root directory. Mounted on a context path; the part
/// of the request path after the context selects the file.
pub struct FileHandler {
    root: PathBuf,
    generate_index: bool,
    media_types: Arc<MediaTypeRegistry>,
}

impl FileHandler {
    #[must_use]
    pub fn new(root: PathBuf, generate_index: bool, media_types: Arc<MediaTypeRegistry>) -> Self {
        Self {
            root,
            generate_index,
            media_types,
        }
    }

    /// Resolves the request path to a file under the root, or the status to
    /// respond with when it doesn't resolve to one.
    async fn resolve(&self, request_path: &str, context_path: &str) -> Result<PathBuf, Outcome> {
        let relative = if context_path == "/" || context_path == "*" {
            request_path
        } else {
            request_path.strip_prefix(context_path).unwrap_or(request_path)
        };
        let relative = urlencoding::decode(relative)
            .map_err(|_| Outcome::Status(StatusCode::BadRequest))?;

        let path = self.root.join(relative.trim_start_matches('/'));
        let path = match tokio::fs::canonicalize(&path).await {
            Ok(path) => path,
            Err(_) => return Err(Outcome::Status(StatusCode::NotFound)),
        };

        // dot-files are never served, and never disclosed to exist
        if is_hidden(&path) {
            return Err(Outcome::Status(StatusCode::NotFound));
        }

        let root = tokio::fs::canonicalize(&self.root).await
            .map_err(|_| Outcome::Status(StatusCode::Forbidden))?;
        if !path.starts_with(&root) {
            return Err(Outcome::Status(StatusCode::Forbidden));
        }

        Ok(path)
    }

    /// Serves the contents of a regular file, honoring the conditional and
    /// range headers of the request.
    async fn serve_file(&self, request: &Request, path: &Path) -> Result<Outcome, anyhow::Error> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(_) => return Ok(Outcome::Status(StatusCode::Forbidden)),
        };
        let length = metadata.len();
        let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
        let etag = format_system_time_as_weak_etag(modified);

        let range = request.range(length);
        match resolve_range(&request.headers, range, length, modified, &etag) {
            RangeDecision::Unsatisfiable => {
                let mut response = Response::with_status(StatusCode::RangeNotSatisfiable);
                response.headers.set_content_range(ContentRangeHeaderValue::Unsatisfied { complete_length: length });
                Ok(response.into())
            }
            RangeDecision::Evaluate(range) => {
                match evaluate_preconditions(&request.headers, &request.method, modified, &etag) {
                    StatusCode::NotModified => {
                        // no other headers or body allowed
                        let mut response = Response::with_status(StatusCode::NotModified);
                        response.headers.set(HeaderName::ETag, HeaderValue::String(etag));
                        response.headers.set(HeaderName::Vary, "Accept-Encoding".into());
                        response.headers.set(HeaderName::LastModified, HeaderValue::DateTime(modified));
                        Ok(response.into())
                    }
                    StatusCode::PreconditionFailed => {
                        // failed preconditions get a bare status, not an error page
                        Ok(Response::with_status(StatusCode::PreconditionFailed).into())
                    }
                    _ => self.send_file(path, length, modified, etag, range).await,
                }
            }
            RangeDecision::Serve(range) => self.send_file(path, length, modified, etag, range).await,
        }
    }

    async fn send_file(&self, path: &Path, length: u64, modified: SystemTime, etag: String, range: Option<(u64, u64)>) -> Result<Outcome, anyhow::Error> {
        let handle = match tokio::fs::File::open(path).await {
            Ok(handle) => handle,
            Err(_) => return Ok(Outcome::Status(StatusCode::Forbidden)),
        };

        let mut response = Response::with_status(StatusCode::Ok);
        response.headers.set(HeaderName::ETag, HeaderValue::String(etag));
        response.headers.set(HeaderName::LastModified, HeaderValue::DateTime(modified));
        response.headers.set(HeaderName::AcceptRanges, "bytes".into());
        response.headers.set_content_type(self.media_types.lookup(&path.to_string_lossy()));
        if let Some((start, end)) = range {
            response.headers.set_content_range(ContentRangeHeaderValue::Range {
                start,
                end,
                complete_length: Some(length),
            });
        }
        response.body = Some(BodyKind::File { handle, size: length });
        Ok(response.into())
    }

    /// Serves the contents of a directory as an HTML file index.
    async fn serve_index(&self, path: &Path, display_path: &str) -> Result<Outcome, anyhow::Error> {
        let mut display_path = display_path.to_string();
        if !display_path.ends_with('/') {
            display_path.push('/');
        }

        let mut entries = Vec::new();
        let mut reader = tokio::fs::read_dir(path).await?;
        while let Some(entry) = reader.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let metadata = entry.metadata().await?;
            entries.push((name, metadata));
        }
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));

        // calculate name column width, minimum 21, with room for an added
        // slash and space
        let width = entries.iter()
            .map(|(name, _)| name.len())
            .chain(std::iter::once(21))
            .max()
            .unwrap_or(21) + 2;

        // Apache's format, for a consistent user experience
        let mut html = format!(
            "<!DOCTYPE html>\n<html><head><title>Index of {display_path}</title></head>\n<body><h1>Index of {display_path}</h1>\n<pre> Name{:pad$} Last modified      Size<hr>",
            "", pad = width - 5,
        );
        if display_path.len() > 1 {
            let parent = parent_of(&display_path);
            let _ = write!(html, " <a href=\"{parent}/\">Parent Directory</a>{:pad$}-\n", "", pad = width + 5);
        }
        for (name, metadata) in entries {
            let display_name = if metadata.is_dir() { format!("{name}/") } else { name.clone() };
            let size = if metadata.is_dir() {
                "- ".to_string()
            } else {
                approximate_size(metadata.len())
            };
            let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
            let link = format!("{display_path}{}{}", urlencoding::encode(&name), if metadata.is_dir() { "/" } else { "" });
            let _ = write!(
                html,
                " <a href=\"{link}\">{display_name}</a>{:pad$}&#8206;{}{:>6}\n",
                "", index_date(modified), size,
                pad = width - display_name.len(),
            );
        }
        html.push_str("</pre></body></html>");

        Ok(responses::page(StatusCode::Ok, html).into())
    }
}

#[async_trait]
impl Handler for FileHandler {
    async fn handle(&self, request: &mut Request, context_path: &str) -> Result<Outcome, anyhow::Error> {
        let request_path = request.target.path().to_string();
        let path = match self.resolve(&request_path, context_path).await {
            Ok(path) => path,
            Err(outcome) => return Ok(outcome),
        };

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(_) => return Ok(Outcome::Status(StatusCode::Forbidden)),
        };

        if metadata.is_dir() {
            if !request_path.ends_with('/') {
                // redirect so relative links work
                let url = format!("http://{}{}/", request.host(), request_path);
                return Ok(responses::redirect(&url, true).into());
            }
            if self.generate_index {
                return self.serve_index(&path, &request_path).await;
            }
            return Ok(Outcome::Status(StatusCode::Forbidden));
        }

        if request_path.ends_with('/') {
            // a directory path that names a regular file
            return Ok(Outcome::Status(StatusCode::NotFound));
        }

        self.serve_file(request, &path).await
    }
}

fn is_hidden(path: &Path) -> bool {
    path.components().any(|component| match component {
        Component::Normal(name) => name.to_string_lossy().starts_with('.'),
        _ => false,
    })
}

fn parent_of(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => "",
        Some(index) => &trimmed[..index],
    }
}

/// Formats a timestamp like `06-Nov-1994 08:49`, as seen in Apache-style
/// directory listings.
fn index_date(time: SystemTime) -> String {
    // IMF-fixdate has fixed-width fields: "Sun, 06 Nov 1994 08:49:37 GMT"
    let formatted = httpdate::fmt_http_date(time);
    format!("{}-{}-{} {}", &formatted[5..7], &formatted[8..11], &formatted[12..16], &formatted[17..22])
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use locanda_http::{HeaderMap, HttpVersion, Method, RequestTarget};

    use super::*;

    fn media_types() -> Arc<MediaTypeRegistry> {
        Arc::new(MediaTypeRegistry::new())
    }

    fn get(target: &str) -> Request {
        Request {
            method: Method::Get,
            target: RequestTarget::parse(target).unwrap(),
            version: HttpVersion::Http11,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    async fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("hello.txt"), b"Hello, World!").await.unwrap();
        tokio::fs::write(dir.path().join(".secret"), b"hidden").await.unwrap();
        tokio::fs::create_dir(dir.path().join("sub")).await.unwrap();
        tokio::fs::write(dir.path().join("sub").join("page.html"), b"<html></html>").await.unwrap();
        dir
    }

    fn expect_response(outcome: Outcome) -> Response {
        match outcome {
            Outcome::Response(response) => response,
            Outcome::Status(status) => panic!("expected a full response, got status {status:?}"),
        }
    }

    #[tokio::test]
    async fn serves_a_file_with_validators() {
        let dir = tree().await;
        let handler = FileHandler::new(dir.path().to_path_buf(), false, media_types());

        let mut request = get("/hello.txt");
        let response = expect_response(handler.handle(&mut request, "/").await.unwrap());
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(response.body.as_ref().map(BodyKind::size), Some(13));
        assert_eq!(response.headers.get(&HeaderName::ContentType).and_then(HeaderValue::as_str_no_convert), Some("text/plain; charset=utf-8"));
        assert!(response.headers.get(&HeaderName::ETag).and_then(HeaderValue::as_str_no_convert).is_some_and(|etag| etag.starts_with("W/\"")));
        assert!(response.headers.contains(&HeaderName::LastModified));
    }

    #[tokio::test]
    async fn missing_and_hidden_files_are_not_found() {
        let dir = tree().await;
        let handler = FileHandler::new(dir.path().to_path_buf(), false, media_types());

        let outcome = handler.handle(&mut get("/nope.txt"), "/").await.unwrap();
        assert!(matches!(outcome, Outcome::Status(StatusCode::NotFound)));

        let outcome = handler.handle(&mut get("/.secret"), "/").await.unwrap();
        assert!(matches!(outcome, Outcome::Status(StatusCode::NotFound)));
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let dir = tree().await;
        let handler = FileHandler::new(dir.path().join("sub"), false, media_types());

        let outcome = handler.handle(&mut get("/../hello.txt"), "/").await.unwrap();
        assert!(matches!(outcome, Outcome::Status(StatusCode::Forbidden | StatusCode::NotFound)));
    }

    #[tokio::test]
    async fn directory_without_slash_redirects() {
        let dir = tree().await;
        let handler = FileHandler::new(dir.path().to_path_buf(), false, media_types());

        let mut request = get("/sub");
        request.headers.set(HeaderName::Host, "example.com".into());
        let response = expect_response(handler.handle(&mut request, "/").await.unwrap());
        assert_eq!(response.status, StatusCode::MovedPermanently);
        assert_eq!(response.headers.get(&HeaderName::Location).and_then(HeaderValue::as_str_no_convert), Some("http://example.com/sub/"));
    }

    #[tokio::test]
    async fn directory_with_slash_forbidden_without_index() {
        let dir = tree().await;
        let handler = FileHandler::new(dir.path().to_path_buf(), false, media_types());

        let outcome = handler.handle(&mut get("/sub/"), "/").await.unwrap();
        assert!(matches!(outcome, Outcome::Status(StatusCode::Forbidden)));
    }

    #[tokio::test]
    async fn directory_index_lists_visible_entries() {
        let dir = tree().await;
        let handler = FileHandler::new(dir.path().to_path_buf(), true, media_types());

        let response = expect_response(handler.handle(&mut get("/"), "/").await.unwrap());
        assert_eq!(response.status, StatusCode::Ok);
        let body = String::from_utf8(response.body.unwrap().as_bytes().unwrap().to_vec()).unwrap();
        assert!(body.contains("<h1>Index of /</h1>"));
        assert!(body.contains("<a href=\"/hello.txt\">hello.txt</a>"));
        assert!(body.contains("<a href=\"/sub/\">sub/</a>"));
        assert!(!body.contains(".secret"));
        // the root has no parent link
        assert!(!body.contains("Parent Directory"));

        let response = expect_response(handler.handle(&mut get("/sub/"), "/").await.unwrap());
        let body = String::from_utf8(response.body.unwrap().as_bytes().unwrap().to_vec()).unwrap();
        assert!(body.contains("Parent Directory"));
    }

    #[tokio::test]
    async fn conditional_get_with_matching_etag() {
        let dir = tree().await;
        let handler = FileHandler::new(dir.path().to_path_buf(), false, media_types());

        let mut request = get("/hello.txt");
        let response = expect_response(handler.handle(&mut request, "/").await.unwrap());
        let etag = response.headers.get(&HeaderName::ETag).and_then(HeaderValue::as_str_no_convert).unwrap().to_string();

        let mut request = get("/hello.txt");
        request.headers.set(HeaderName::IfNoneMatch, HeaderValue::String(etag));
        let response = expect_response(handler.handle(&mut request, "/").await.unwrap());
        assert_eq!(response.status, StatusCode::NotModified);
        assert!(response.body.is_none());
        assert!(response.headers.contains(&HeaderName::ETag));
        assert!(response.headers.contains(&HeaderName::LastModified));
    }

    #[tokio::test]
    async fn failed_precondition_yields_bare_412() {
        let dir = tree().await;
        let handler = FileHandler::new(dir.path().to_path_buf(), false, media_types());

        let mut request = get("/hello.txt");
        request.headers.set(HeaderName::IfMatch, "\"other\"".into());
        let response = expect_response(handler.handle(&mut request, "/").await.unwrap());
        assert_eq!(response.status, StatusCode::PreconditionFailed);
        assert!(response.body.is_none());
    }

    #[tokio::test]
    async fn range_request_carries_content_range() {
        let dir = tree().await;
        let handler = FileHandler::new(dir.path().to_path_buf(), false, media_types());

        let mut request = get("/hello.txt");
        request.headers.set(HeaderName::Range, "bytes=0-4".into());
        let response = expect_response(handler.handle(&mut request, "/").await.unwrap());
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(
            response.headers.get(&HeaderName::ContentRange),
            Some(&HeaderValue::ContentRange(ContentRangeHeaderValue::Range { start: 0, end: 4, complete_length: Some(13) })),
        );
    }

    #[tokio::test]
    async fn unsatisfiable_range_yields_416() {
        let dir = tree().await;
        let handler = FileHandler::new(dir.path().to_path_buf(), false, media_types());

        let mut request = get("/hello.txt");
        request.headers.set(HeaderName::Range, "bytes=100-200".into());
        let response = expect_response(handler.handle(&mut request, "/").await.unwrap());
        assert_eq!(response.status, StatusCode::RangeNotSatisfiable);
        assert_eq!(
            response.headers.get(&HeaderName::ContentRange),
            Some(&HeaderValue::ContentRange(ContentRangeHeaderValue::Unsatisfied { complete_length: 13 })),
        );
    }

    #[tokio::test]
    async fn context_prefix_is_stripped() {
        let dir = tree().await;
        let handler = FileHandler::new(dir.path().to_path_buf(), false, media_types());

        let mut request = get("/static/hello.txt");
        let response = expect_response(handler.handle(&mut request, "/static").await.unwrap());
        assert_eq!(response.status, StatusCode::Ok);
    }

    #[test]
    fn weak_etag_format() {
        let time = UNIX_EPOCH + Duration::from_millis(0x18AB_CDEF);
        assert_eq!(format_system_time_as_weak_etag(time), "W/\"18ABCDEF\"");
    }
}

// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! This crate turns parsed requests into responses: virtual-host and
//! context resolution, the built-in method handlers (OPTIONS, TRACE, HEAD),
//! conditional requests and static file serving.

use std::sync::Arc;

use itertools::Itertools;

use locanda_http::{
    BodyKind,
    HeaderName,
    HeaderValue,
    HttpParseError,
    Method,
    Request,
    RequestTarget,
    Response,
    StatusCode,
};
use locanda_resources::MediaType;

pub mod conditional;
pub mod config;
pub mod files;
pub mod handler;
pub mod responses;
pub mod vhost;

pub use config::{LocandaConfig, LocandaSettings};
pub use files::FileHandler;
pub use handler::{FnHandler, Handler, Outcome};
pub use vhost::{ContextInfo, VirtualHost, VirtualHostSet};

/// Handles a request according to its method, producing the response to
/// serialize.
///
/// GET must always be served, so it goes straight to the context handler
/// (which yields a 404 when nothing is mounted). Registered handlers take
/// precedence over the built-in HEAD, TRACE and OPTIONS behaviors.
pub async fn handle_request(request: &mut Request, settings: &LocandaSettings) -> Response {
    let host = settings.hosts.resolve(&request.host());
    let context = host.context(request.target.path());

    if request.method == Method::Get || context.handler(&request.method).is_some() {
        return serve(request, host).await;
    }

    if request.method == Method::Head {
        // identical to a GET; the connection driver discards the body
        request.method = Method::Get;
        return serve(request, host).await;
    }

    if request.method == Method::Trace {
        return handle_trace(request);
    }

    // built-in methods first, then what's mounted here
    let mut methods = vec!["GET", "HEAD", "TRACE", "OPTIONS"];
    // "*" is a special server-wide (no-context) request supported by OPTIONS
    let server_wide = matches!(request.target, RequestTarget::Asterisk) && request.method == Method::Options;
    let mounted = if server_wide { host.allowed_methods() } else { context.allowed_methods() };
    for method in mounted {
        if !methods.contains(&method.as_string()) {
            methods.push(method.as_string());
        }
    }
    let allow = HeaderValue::String(methods.iter().join(", "));

    if request.method == Method::Options {
        let mut response = Response::with_status(StatusCode::Ok);
        response.headers.set(HeaderName::Allow, allow);
        response.headers.set_content_length(0);
        return response;
    }

    if host.accepts_method(&request.method) {
        // supported by the server, but not this context (nor built-in)
        let mut response = Response::with_status(StatusCode::MethodNotAllowed);
        response.headers.set(HeaderName::Allow, allow);
        return response;
    }

    let mut response = responses::error_page_default(StatusCode::NotImplemented);
    response.headers.set(HeaderName::Allow, allow);
    response
}

/// Serves a request through the context handler mounted for its path and
/// method. A request for a directory first retries with the host's welcome
/// file appended.
async fn serve(request: &mut Request, host: &vhost::VirtualHost) -> Response {
    let path = request.target.path().to_string();
    let context = host.context(&path);
    let Some(handler) = context.handler(&request.method) else {
        return responses::error_page_default(StatusCode::NotFound);
    };
    let handler = Arc::clone(handler);
    let context_path = context.path().to_string();

    if path.ends_with('/') && !host.welcome_file.is_empty() {
        request.set_path(&format!("{path}{}", host.welcome_file));
        let outcome = invoke(&handler, request, &context_path).await;
        request.set_path(&path);
        if !matches!(outcome, Outcome::Status(StatusCode::NotFound)) {
            return finish(outcome);
        }
    }

    finish(invoke(&handler, request, &context_path).await)
}

async fn invoke(handler: &Arc<dyn Handler>, request: &mut Request, context_path: &str) -> Outcome {
    match handler.handle(request, context_path).await {
        Ok(outcome) => outcome,
        Err(error) => {
            tracing::error!("handler for \"{context_path}\" failed: {error:#}");
            // the handler may have left the exchange in an unknown state
            let mut response = responses::error_page_default(StatusCode::InternalServerError);
            response.mark_connection_close();
            Outcome::Response(response)
        }
    }
}

fn finish(outcome: Outcome) -> Response {
    match outcome {
        Outcome::Response(response) => response,
        Outcome::Status(status) => responses::error_page_default(status),
    }
}

/// Echoes the request back as a `message/http` body.
fn handle_trace(request: &Request) -> Response {
    let mut body = format!("TRACE {} {}\r\n", request.target.as_str(), request.version.as_str());
    for (name, value) in request.headers.iter() {
        body.push_str(name.to_string_h1());
        body.push_str(": ");
        body.push_str(&value.to_string());
        body.push_str("\r\n");
    }
    body.push_str("\r\n");
    let mut body = body.into_bytes();
    if let Some(bytes) = request.body.as_ref().and_then(BodyKind::as_bytes) {
        body.extend_from_slice(bytes);
    }

    let mut response = Response::with_status(StatusCode::Ok);
    response.headers.set_content_type(MediaType::MESSAGE_HTTP);
    response.body = Some(BodyKind::Bytes(body));
    response
}

/// Creates the error response for a request that could not be parsed. The
/// connection is no longer in a known state afterwards, so it is always
/// marked for closure.
#[must_use]
pub fn handle_parse_error(error: &HttpParseError) -> Response {
    let status = match error {
        HttpParseError::HeaderTooLarge => StatusCode::ContentTooLarge,
        HttpParseError::MethodTooLarge => StatusCode::NotImplemented,
        HttpParseError::RequestTargetTooLarge => StatusCode::URITooLong,
        _ => StatusCode::BadRequest,
    };
    let mut response = responses::error_page(status, error.as_ref());
    response.mark_connection_close();
    response
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use locanda_http::{HeaderMap, HttpVersion};

    use super::*;

    struct StaticPage(&'static str);

    #[async_trait]
    impl Handler for StaticPage {
        async fn handle(&self, request: &mut Request, _context_path: &str) -> Result<Outcome, anyhow::Error> {
            if request.target.path().ends_with("index.html") {
                return Ok(Outcome::Status(StatusCode::NotFound));
            }
            Ok(Response::with_status_and_string_body(StatusCode::Ok, self.0).into())
        }
    }

    struct Failing;

    #[async_trait]
    impl Handler for Failing {
        async fn handle(&self, _request: &mut Request, _context_path: &str) -> Result<Outcome, anyhow::Error> {
            anyhow::bail!("database unavailable")
        }
    }

    fn settings_with_host(host: VirtualHost) -> LocandaSettings {
        LocandaSettings {
            hosts: VirtualHostSet::new(host),
            ..LocandaSettings::default()
        }
    }

    fn request(method: Method, target: &str) -> Request {
        Request {
            method,
            target: RequestTarget::parse(target).unwrap(),
            version: HttpVersion::Http11,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn get_without_handler_is_not_found() {
        let settings = settings_with_host(VirtualHost::new(None));
        let response = handle_request(&mut request(Method::Get, "/missing"), &settings).await;
        assert_eq!(response.status, StatusCode::NotFound);
    }

    #[tokio::test]
    async fn registered_method_elsewhere_yields_method_not_allowed() {
        let mut host = VirtualHost::new(None);
        host.register("/api", &[Method::Post], Arc::new(StaticPage("api")));
        let settings = settings_with_host(host);

        let response = handle_request(&mut request(Method::Post, "/other"), &settings).await;
        assert_eq!(response.status, StatusCode::MethodNotAllowed);
        assert!(response.headers.contains(&HeaderName::Allow));
    }

    #[tokio::test]
    async fn unknown_method_yields_not_implemented() {
        let settings = settings_with_host(VirtualHost::new(None));
        let response = handle_request(&mut request(Method::Other("BREW".to_string()), "/"), &settings).await;
        assert_eq!(response.status, StatusCode::NotImplemented);
    }

    #[tokio::test]
    async fn server_wide_options_lists_all_methods() {
        let mut host = VirtualHost::new(None);
        host.register("/api", &[Method::Post], Arc::new(StaticPage("api")));
        let settings = settings_with_host(host);

        let mut request = request(Method::Options, "*");
        let response = handle_request(&mut request, &settings).await;
        assert_eq!(response.status, StatusCode::Ok);
        let allow = response.headers.get(&HeaderName::Allow).unwrap().to_string();
        assert!(allow.starts_with("GET, HEAD, TRACE, OPTIONS"));
        assert!(allow.contains("POST"));
        assert_eq!(response.headers.get(&HeaderName::ContentLength), Some(&HeaderValue::Size(0)));
    }

    #[tokio::test]
    async fn head_is_served_as_get() {
        let mut host = VirtualHost::new(None);
        host.register_get("/page", Arc::new(StaticPage("content")));
        let settings = settings_with_host(host);

        let response = handle_request(&mut request(Method::Head, "/page"), &settings).await;
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(response.body.as_ref().map(BodyKind::size), Some(7));
    }

    #[tokio::test]
    async fn trace_echoes_the_request() {
        let settings = settings_with_host(VirtualHost::new(None));

        let mut request = request(Method::Trace, "/echo/path");
        request.headers.set(HeaderName::Host, "example.com".into());
        let response = handle_request(&mut request, &settings).await;

        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(response.headers.get(&HeaderName::ContentType).and_then(HeaderValue::as_str_no_convert), Some("message/http"));
        let body = String::from_utf8(response.body.unwrap().as_bytes().unwrap().to_vec()).unwrap();
        assert!(body.starts_with("TRACE /echo/path HTTP/1.1\r\n"));
        assert!(body.contains("Host: example.com\r\n"));
    }

    #[tokio::test]
    async fn welcome_file_retry_falls_back_to_the_directory() {
        // the handler 404s the welcome file, so the directory itself is
        // served on the second attempt
        let mut host = VirtualHost::new(None);
        host.register_get("/", Arc::new(StaticPage("listing")));
        let settings = settings_with_host(host);

        let response = handle_request(&mut request(Method::Get, "/docs/"), &settings).await;
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(response.body.as_ref().map(BodyKind::size), Some(7));
    }

    #[tokio::test]
    async fn failing_handler_yields_internal_server_error() {
        let mut host = VirtualHost::new(None);
        host.register_get("/boom", Arc::new(Failing));
        let settings = settings_with_host(host);

        let response = handle_request(&mut request(Method::Get, "/boom"), &settings).await;
        assert_eq!(response.status, StatusCode::InternalServerError);
        assert!(response.headers.connection_close_requested());
    }

    #[test]
    fn parse_errors_close_the_connection() {
        let response = handle_parse_error(&HttpParseError::HeaderDoesNotContainColon);
        assert_eq!(response.status, StatusCode::BadRequest);
        assert!(response.headers.connection_close_requested());

        let response = handle_parse_error(&HttpParseError::RequestTargetTooLarge);
        assert_eq!(response.status, StatusCode::URITooLong);
    }
}

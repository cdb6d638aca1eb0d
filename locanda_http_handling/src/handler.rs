// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use async_trait::async_trait;

use locanda_http::{Request, Response, StatusCode};

/// What a [`Handler`] produced for a request.
///
/// `Status` is a shorthand for "render the standard error page for this
/// status"; handlers that want full control over the message return
/// `Response` instead.
#[derive(Debug)]
pub enum Outcome {
    Response(Response),
    Status(StatusCode),
}

impl From<Response> for Outcome {
    fn from(response: Response) -> Self {
        Outcome::Response(response)
    }
}

impl From<StatusCode> for Outcome {
    fn from(status: StatusCode) -> Self {
        Outcome::Status(status)
    }
}

/// Application code that turns requests into responses.
///
/// Handlers are registered on a [`crate::VirtualHost`] under a context path
/// and shared between connections, so they hold their own state behind
/// `Arc`s. The `context_path` argument is the path prefix the handler was
/// resolved under, which lets one handler instance serve several contexts.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: &mut Request, context_path: &str) -> Result<Outcome, anyhow::Error>;
}

/// Wraps a plain async function as a [`Handler`].
pub struct FnHandler<F> {
    function: F,
}

impl<F> FnHandler<F> {
    pub fn new(function: F) -> Self {
        Self { function }
    }
}

#[async_trait]
impl<F> Handler for FnHandler<F>
        where F: Fn(&mut Request) -> Result<Outcome, anyhow::Error> + Send + Sync {
    async fn handle(&self, request: &mut Request, _context_path: &str) -> Result<Outcome, anyhow::Error> {
        (self.function)(request)
    }
}

// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::sync::Arc;

use locanda_http::{Method, Request, Response, StatusCode};
use locanda_http_handling::{FnHandler, Outcome, VirtualHost};

fn ping_test(request: &mut Request) -> Result<Outcome, anyhow::Error> {
    tracing::debug!("ping: {:#?}", request.target);
    Ok(Response::with_status_and_string_body(StatusCode::Ok, "pong").into())
}

pub fn register(host: &mut VirtualHost) {
    host.register("/test-ping", &[Method::Get, Method::Post], Arc::new(FnHandler::new(ping_test)));
}

// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::borrow::Cow;

/// RFC 9110: https://httpwg.org/specs/rfc9110.html#status.codes
/// IANA: https://www.iana.org/assignments/http-status-codes/http-status-codes.xhtml
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum StatusCode {
    Continue = 100,

    Ok = 200,
    NoContent = 204,
    PartialContent = 206,

    MovedPermanently = 301,
    Found = 302,
    NotModified = 304,
    TemporaryRedirect = 307,

    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    RequestTimeout = 408,
    PreconditionFailed = 412,
    ContentTooLarge = 413,
    URITooLong = 414,
    RangeNotSatisfiable = 416,
    ExpectationFailed = 417,

    InternalServerError = 500,
    NotImplemented = 501,
    BadGateway = 502,
    ServiceUnavailable = 503,
    GatewayTimeout = 504,
}

impl StatusCode {
    /// Returns the class of this status code.
    #[must_use]
    pub fn class(&self) -> StatusCodeClass {
        match *self as u16 {
            100..=199 => StatusCodeClass::Informational,
            200..=299 => StatusCodeClass::Success,
            300..=399 => StatusCodeClass::Redirection,
            400..=499 => StatusCodeClass::ClientError,
            500..=599 => StatusCodeClass::ServerError,
            _ => unreachable!(),
        }
    }

    /// The numeric code, e.g. `404`.
    #[must_use]
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// The reason phrase, e.g. `Not Found`.
    #[must_use]
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Continue => "Continue",

            StatusCode::Ok => "OK",
            StatusCode::NoContent => "No Content",
            StatusCode::PartialContent => "Partial Content",

            StatusCode::MovedPermanently => "Moved Permanently",
            StatusCode::Found => "Found",
            StatusCode::NotModified => "Not Modified",
            StatusCode::TemporaryRedirect => "Temporary Redirect",

            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::RequestTimeout => "Request Timeout",
            StatusCode::PreconditionFailed => "Precondition Failed",
            StatusCode::ContentTooLarge => "Request Entity Too Large",
            StatusCode::URITooLong => "Request-URI Too Long",
            StatusCode::RangeNotSatisfiable => "Requested Range Not Satisfiable",
            StatusCode::ExpectationFailed => "Expectation Failed",

            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::BadGateway => "Bad Gateway",
            StatusCode::ServiceUnavailable => "Service Unavailable",
            StatusCode::GatewayTimeout => "Gateway Time-out",
        }
    }

    /// The status-line form, e.g. `404 Not Found`.
    #[must_use]
    pub fn to_string<'a>(&self) -> Cow<'a, str> {
        Cow::Owned(format!("{} {}", self.code(), self.reason_phrase()))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatusCodeClass {
    Informational,
    Success,
    Redirection,
    ClientError,
    ServerError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StatusCode::Continue, StatusCodeClass::Informational)]
    #[case(StatusCode::Ok, StatusCodeClass::Success)]
    #[case(StatusCode::NotModified, StatusCodeClass::Redirection)]
    #[case(StatusCode::RangeNotSatisfiable, StatusCodeClass::ClientError)]
    #[case(StatusCode::GatewayTimeout, StatusCodeClass::ServerError)]
    #[test]
    fn status_code_class(#[case] status: StatusCode, #[case] expected: StatusCodeClass) {
        assert_eq!(status.class(), expected);
    }

    #[test]
    fn status_line_form() {
        assert_eq!(StatusCode::Ok.to_string(), "200 OK");
        assert_eq!(StatusCode::RangeNotSatisfiable.to_string(), "416 Requested Range Not Satisfiable");
        assert_eq!(StatusCode::GatewayTimeout.to_string(), "504 Gateway Time-out");
    }
}

//! Wire response helpers. Every response the relay emits carries the
//! permissive CORS origin, so all building funnels through here.

use axum::body::Body;
use axum::http::{StatusCode, header};
use axum::response::Response;

pub fn ok_text(message: impl Into<String>) -> Response {
    text(StatusCode::OK, message.into())
}

pub fn bad_request(message: impl Into<String>) -> Response {
    let mut body = message.into();
    body.push('\n');
    text(StatusCode::BAD_REQUEST, body)
}

pub fn internal_error(message: impl Into<String>) -> Response {
    let mut body = message.into();
    body.push('\n');
    text(StatusCode::INTERNAL_SERVER_ERROR, body)
}

pub fn method_not_allowed() -> Response {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header(header::ALLOW, "GET, HEAD, POST, PUT, OPTIONS")
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .body(Body::empty())
        .unwrap()
}

/// CORS preflight answer, identical for every path, reserved or not.
pub fn preflight() -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            "GET, HEAD, POST, PUT, OPTIONS",
        )
        .header(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            "Content-Type, Content-Disposition, X-Piping",
        )
        .header(header::ACCESS_CONTROL_MAX_AGE, "86400")
        .body(Body::empty())
        .unwrap()
}

fn text(status: StatusCode, body: String) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .body(Body::from(body))
        .unwrap()
}

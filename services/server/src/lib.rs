//! Router assembly for the relay server.
//!
//! Every request funnels through one fallback handler: the wire contract
//! is a fixed-order classification over method, path, and headers rather
//! than a route table.

pub mod http;
pub mod state;

pub use state::AppState;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::{Method, header};
use axum::response::Response;
use percent_encoding::percent_decode_str;

use crate::http::{relay, reserved, response};

pub fn build_router(state: AppState) -> Router {
    Router::new().fallback(route).with_state(state)
}

async fn route(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method().clone();
    if !matches!(
        method,
        Method::GET | Method::HEAD | Method::POST | Method::PUT | Method::OPTIONS
    ) {
        return response::method_not_allowed();
    }
    if method == Method::OPTIONS {
        return response::preflight();
    }

    let path = percent_decode_str(request.uri().path())
        .decode_utf8_lossy()
        .into_owned();
    let query = request.uri().query().map(ToOwned::to_owned);
    let is_upload = method == Method::POST || method == Method::PUT;

    if reserved::is_reserved(&path) {
        if is_upload {
            return response::bad_request(format!("cannot send to the reserved path '{path}'"));
        }
        let host = request
            .headers()
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);
        return reserved::serve(&method, &path, query.as_deref(), host.as_deref());
    }

    if method == Method::GET
        && request
            .headers()
            .get("service-worker")
            .is_some_and(|value| value.as_bytes().eq_ignore_ascii_case(b"script"))
    {
        return response::bad_request("cannot register a service worker from a relay path");
    }
    if is_upload && request.headers().contains_key(header::CONTENT_RANGE) {
        return response::bad_request("content-range uploads are not supported");
    }

    let n = match relay_core::params::receiver_count(query.as_deref()) {
        Ok(n) => n,
        Err(refusal) => return response::bad_request(refusal.to_string()),
    };

    if is_upload {
        relay::send(&state, &path, n, request).await
    } else {
        relay::receive(&state, &path, n, method == Method::HEAD).await
    }
}

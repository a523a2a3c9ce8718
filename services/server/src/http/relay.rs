//! Sender and receiver sides of a relay path.

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::Response;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use relay_core::pump;
use relay_core::registry::ReceiverStart;

use crate::http::response;
use crate::state::AppState;

/// POST/PUT: seats the sender, waits for the receiver set, then multicasts
/// the body. The 200 is sent only once every receiver has the full stream.
pub async fn send(state: &AppState, path: &str, n: u32, request: Request) -> Response {
    let kind = match pump::classify(request.headers()) {
        Ok(kind) => kind,
        Err(refusal) => return response::bad_request(refusal.to_string()),
    };
    let mut ticket = match state.registry.attach_sender(path, n) {
        Ok(ticket) => ticket,
        Err(refusal) => {
            warn!(path = %path, n, %refusal, "sender refused");
            return response::bad_request(refusal.to_string());
        }
    };
    info!(path = %path, n, "sender waiting for receivers");

    let gates = match ticket.ready().await {
        Ok(gates) => gates,
        Err(_) => return response::internal_error("rendezvous dissolved before streaming"),
    };
    info!(path = %path, n, "streaming");

    let request_headers = request.headers().clone();
    let body = request.into_body().into_data_stream();
    let outcome = pump::relay(kind, &request_headers, body, gates).await;
    // The record must be gone before any response reaches the sender.
    drop(ticket);
    match outcome {
        Ok(bytes) => {
            info!(path = %path, bytes, "stream complete");
            response::ok_text(format!("[INFO] Sent to {n} receiver(s).\n"))
        }
        Err(error) => {
            warn!(path = %path, %error, "stream aborted");
            response::internal_error(error.to_string())
        }
    }
}

/// GET/HEAD: seats a receiver and answers with the projected headers once
/// the stream opens. HEAD suppresses the body and drains its copy in the
/// background so the sender still completes against all `n` slots.
pub async fn receive(state: &AppState, path: &str, n: u32, head_only: bool) -> Response {
    let mut ticket = match state.registry.attach_receiver(path, n) {
        Ok(ticket) => ticket,
        Err(refusal) => {
            warn!(path = %path, n, %refusal, "receiver refused");
            return response::bad_request(refusal.to_string());
        }
    };
    info!(path = %path, n, "receiver waiting for stream");

    let ReceiverStart { headers, body } = match ticket.started().await {
        Ok(start) => start,
        Err(_) => return response::internal_error("sender aborted before streaming"),
    };

    let mut builder = Response::builder().status(StatusCode::OK);
    if let Some(response_headers) = builder.headers_mut() {
        response_headers.extend(headers);
    }
    let body = if head_only {
        let mut feed = body;
        tokio::spawn(async move { while feed.recv().await.is_some() {} });
        Body::empty()
    } else {
        Body::from_stream(ReceiverStream::new(body))
    };
    match builder.body(body) {
        Ok(started) => started,
        Err(error) => response::internal_error(error.to_string()),
    }
}

//! Source resolution and the multicast pump.

use std::convert::Infallible;

use bytes::Bytes;
use futures_util::{Stream, StreamExt, pin_mut};
use http::HeaderMap;
use http::header::CONTENT_TYPE;
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::{BadMultipart, BoxError, RelayError};
use crate::headers;
use crate::registry::{Chunk, ReceiverGate};

/// How the upload body maps onto the relayed stream.
pub enum SourceKind {
    /// Body bytes relayed as-is; headers projected from the request.
    Raw,
    /// `multipart/form-data`: the first part's bytes and headers are the
    /// stream.
    Multipart { boundary: String },
}

/// Classifies the upload from its request headers. A multipart upload
/// with an unusable boundary is refused here, before the sender can take
/// the path's slot.
pub fn classify(request_headers: &HeaderMap) -> Result<SourceKind, BadMultipart> {
    let Some(content_type) = request_headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return Ok(SourceKind::Raw);
    };
    let media_end = content_type.find(';').unwrap_or(content_type.len());
    if !content_type[..media_end]
        .trim()
        .eq_ignore_ascii_case("multipart/form-data")
    {
        return Ok(SourceKind::Raw);
    }
    let boundary = multer::parse_boundary(content_type).map_err(|_| BadMultipart)?;
    Ok(SourceKind::Multipart { boundary })
}

/// Streams the sender's upload to every receiver and returns the number
/// of relayed bytes.
///
/// Each chunk is cloned into every receiver's bounded pipe in turn, so
/// the next read from the sender happens only after the slowest receiver
/// has accepted the previous chunk.
pub async fn relay<S, E>(
    kind: SourceKind,
    request_headers: &HeaderMap,
    body: S,
    gates: Vec<ReceiverGate>,
) -> Result<u64, RelayError>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    match kind {
        SourceKind::Raw => {
            let projected = headers::project(request_headers);
            multicast(projected, body, gates).await
        }
        SourceKind::Multipart { boundary } => {
            let mut parts = multer::Multipart::new(body, boundary);
            match parts.next_field().await {
                Ok(Some(part)) => {
                    let projected = headers::project(part.headers());
                    multicast(projected, part, gates).await
                }
                Ok(None) => {
                    // A multipart body with no parts relays an empty stream.
                    let projected = headers::project(&HeaderMap::new());
                    let empty = futures_util::stream::empty::<Result<Bytes, Infallible>>();
                    multicast(projected, empty, gates).await
                }
                Err(error) => {
                    warn!(%error, "multipart prologue failed");
                    Err(RelayError::SenderBody(error.to_string()))
                }
            }
        }
    }
}

async fn multicast<S, E>(
    projected: HeaderMap,
    body: S,
    gates: Vec<ReceiverGate>,
) -> Result<u64, RelayError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    let mut pipes = Vec::with_capacity(gates.len());
    for gate in gates {
        match gate.open(projected.clone()) {
            Ok(pipe) => pipes.push(pipe),
            Err(error) => {
                abort(&pipes, &RelayError::TornDown).await;
                return Err(error);
            }
        }
    }

    pin_mut!(body);
    let mut relayed: u64 = 0;
    while let Some(read) = body.next().await {
        let chunk = match read {
            Ok(chunk) => chunk,
            Err(cause) => {
                let error = RelayError::SenderBody(cause.into().to_string());
                abort(&pipes, &error).await;
                return Err(error);
            }
        };
        if chunk.is_empty() {
            continue;
        }
        relayed += chunk.len() as u64;
        for (index, pipe) in pipes.iter().enumerate() {
            if pipe.send(Ok(chunk.clone())).await.is_err() {
                warn!(receiver = index, "receiver pipe closed mid-stream");
                abort(&pipes, &RelayError::TornDown).await;
                return Err(RelayError::ReceiverGone);
            }
        }
    }
    Ok(relayed)
}

/// Delivers the teardown marker to every pipe that still has a live
/// receiver, so those transports abort instead of reporting a clean end
/// of body. Pipes whose receivers are already gone are skipped.
async fn abort(pipes: &[mpsc::Sender<Chunk>], error: &RelayError) {
    for pipe in pipes {
        let _ = pipe.send(Err(error.clone())).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn content_type(value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(CONTENT_TYPE, HeaderValue::from_str(value).unwrap());
        map
    }

    #[test]
    fn plain_uploads_classify_as_raw() {
        assert!(matches!(classify(&HeaderMap::new()), Ok(SourceKind::Raw)));
        assert!(matches!(
            classify(&content_type("text/plain")),
            Ok(SourceKind::Raw)
        ));
    }

    #[test]
    fn multipart_boundary_is_extracted() {
        let kind = classify(&content_type("multipart/form-data; boundary=xyz")).unwrap();
        match kind {
            SourceKind::Multipart { boundary } => assert_eq!(boundary, "xyz"),
            SourceKind::Raw => panic!("expected multipart"),
        }
    }

    #[test]
    fn multipart_without_boundary_is_refused() {
        assert!(classify(&content_type("multipart/form-data")).is_err());
    }
}

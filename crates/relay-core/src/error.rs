use thiserror::Error;

/// Boxed transport error produced by a sender's body stream.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why the registry refused to seat a participant. The `Display` strings
/// are sent back verbatim as the 400 response body.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttachError {
    #[error("another sender is connecting on this path")]
    SenderConflict,
    #[error("receiver count mismatch: this path expects n={expected}, request declared n={declared}")]
    ReceiverCountMismatch { expected: u32, declared: u32 },
    #[error("too many receivers are connecting on this path")]
    ReceiverOverflow,
}

/// What tore an in-flight stream down.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("sender body failed: {0}")]
    SenderBody(String),
    #[error("a receiver disconnected during streaming")]
    ReceiverGone,
    #[error("the rendezvous was torn down")]
    TornDown,
}

/// Refusal for an `n` query parameter that is not a positive integer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid query parameter: n must be an integer of 1 or more")]
pub struct BadReceiverCount;

/// Refusal for a multipart/form-data upload without a usable boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid multipart/form-data content type: missing or malformed boundary")]
pub struct BadMultipart;

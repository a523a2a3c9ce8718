//! Rendezvous engine for an ephemeral, path-addressed byte relay.
//!
//! A path pairs exactly one sender with `n` receivers; the sender's bytes
//! are multicast to every receiver with the read paced by the slowest one.
//! Nothing is buffered beyond one in-flight chunk per receiver and nothing
//! survives the rendezvous.

pub mod error;
pub mod headers;
pub mod params;
pub mod pump;
pub mod registry;

pub use error::{AttachError, BadMultipart, BadReceiverCount, RelayError};
pub use registry::{ReceiverStart, ReceiverTicket, Registry, SenderTicket};

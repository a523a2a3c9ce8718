//! Process-wide path registry and the per-path rendezvous state machine.
//!
//! A rendezvous binds one sender and `n` receivers on a path. The map lock
//! guards nothing but map and record mutation; participants wait on the
//! oneshot gates handed out here, never on the lock.

use std::collections::HashMap;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use http::HeaderMap;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::{AttachError, RelayError};

/// Bounded depth of each receiver pipe. One in-flight chunk per receiver
/// keeps the sender read paced by the slowest receiver.
const PIPE_DEPTH: usize = 1;

/// One item on a receiver pipe. `Err` makes the transport abort the
/// receiver's connection instead of ending the body as a normal EOF.
pub type Chunk = Result<Bytes, RelayError>;

/// Handed to a receiver once streaming begins: the projected response
/// headers and the read end of its private body pipe.
#[derive(Debug)]
pub struct ReceiverStart {
    pub headers: HeaderMap,
    pub body: mpsc::Receiver<Chunk>,
}

/// Write side of one receiver slot, released to the sender's pump when the
/// set completes.
#[derive(Debug)]
pub struct ReceiverGate {
    start: oneshot::Sender<ReceiverStart>,
}

impl ReceiverGate {
    /// Opens the receiver's response with the projected headers, returning
    /// the pipe that feeds its body. Fails if the receiver disconnected
    /// after the set completed but before streaming reached it.
    pub fn open(self, headers: HeaderMap) -> Result<mpsc::Sender<Chunk>, RelayError> {
        let (pipe, body) = mpsc::channel(PIPE_DEPTH);
        self.start
            .send(ReceiverStart { headers, body })
            .map_err(|_| RelayError::ReceiverGone)?;
        Ok(pipe)
    }
}

#[derive(Debug)]
enum SenderSlot {
    Vacant,
    Waiting(oneshot::Sender<Vec<ReceiverGate>>),
    Released,
}

#[derive(Debug)]
struct ReceiverSeat {
    key: u64,
    gate: Option<ReceiverGate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Gathering,
    Streaming,
}

#[derive(Debug)]
struct Rendezvous {
    id: u64,
    n: u32,
    phase: Phase,
    sender: SenderSlot,
    receivers: Vec<ReceiverSeat>,
}

impl Rendezvous {
    fn receivers_full(&self) -> bool {
        self.receivers.len() as u32 == self.n
    }

    fn complete(&self) -> bool {
        matches!(self.sender, SenderSlot::Waiting(_)) && self.receivers_full()
    }

    fn empty(&self) -> bool {
        matches!(self.sender, SenderSlot::Vacant) && self.receivers.is_empty()
    }

    /// Flips the record to Streaming and releases the gates to the sender.
    /// False means the sender vanished in the attach/release window; the
    /// caller must drop the record.
    fn release(&mut self) -> bool {
        let gates = self
            .receivers
            .iter_mut()
            .filter_map(|seat| seat.gate.take())
            .collect();
        let SenderSlot::Waiting(go) = mem::replace(&mut self.sender, SenderSlot::Released) else {
            return false;
        };
        self.phase = Phase::Streaming;
        go.send(gates).is_ok()
    }
}

/// Map of live rendezvous records, keyed by the percent-decoded request
/// path.
#[derive(Debug)]
pub struct Registry {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    next_token: u64,
    records: HashMap<String, Rendezvous>,
}

impl Inner {
    fn token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_token: 0,
                records: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("registry lock poisoned")
    }

    /// Seats a sender on `path`, creating the rendezvous when the path is
    /// fresh. The ticket resolves once every receiver slot is filled;
    /// dropping it detaches the sender, which before streaming frees the
    /// slot and after streaming closes the whole rendezvous.
    pub fn attach_sender(
        self: &Arc<Self>,
        path: &str,
        n: u32,
    ) -> Result<SenderTicket, AttachError> {
        let mut inner = self.lock();
        let (go, ready) = oneshot::channel();
        let record_id = match inner.records.get_mut(path) {
            None => {
                let id = inner.token();
                inner.records.insert(
                    path.to_owned(),
                    Rendezvous {
                        id,
                        n,
                        phase: Phase::Gathering,
                        sender: SenderSlot::Waiting(go),
                        receivers: Vec::new(),
                    },
                );
                id
            }
            Some(record) => {
                if record.n != n {
                    return Err(AttachError::ReceiverCountMismatch {
                        expected: record.n,
                        declared: n,
                    });
                }
                if !matches!(record.sender, SenderSlot::Vacant) {
                    return Err(AttachError::SenderConflict);
                }
                record.sender = SenderSlot::Waiting(go);
                let id = record.id;
                if record.complete() && !record.release() {
                    inner.records.remove(path);
                }
                id
            }
        };
        debug!(path = %path, n, "sender attached");
        Ok(SenderTicket {
            ready,
            _guard: SenderGuard {
                registry: Arc::clone(self),
                path: path.to_owned(),
                record_id,
            },
        })
    }

    /// Seats a receiver on `path`, creating the rendezvous when the path
    /// is fresh. The ticket resolves with the projected headers and body
    /// pipe once streaming begins; dropping it before then frees the slot
    /// for a later receiver.
    pub fn attach_receiver(
        self: &Arc<Self>,
        path: &str,
        n: u32,
    ) -> Result<ReceiverTicket, AttachError> {
        let mut inner = self.lock();
        let (start, started) = oneshot::channel();
        let seat_key = inner.token();
        let seat = ReceiverSeat {
            key: seat_key,
            gate: Some(ReceiverGate { start }),
        };
        let record_id = match inner.records.get_mut(path) {
            None => {
                let id = inner.token();
                inner.records.insert(
                    path.to_owned(),
                    Rendezvous {
                        id,
                        n,
                        phase: Phase::Gathering,
                        sender: SenderSlot::Vacant,
                        receivers: vec![seat],
                    },
                );
                id
            }
            Some(record) => {
                if record.n != n {
                    return Err(AttachError::ReceiverCountMismatch {
                        expected: record.n,
                        declared: n,
                    });
                }
                if record.receivers_full() {
                    return Err(AttachError::ReceiverOverflow);
                }
                record.receivers.push(seat);
                let id = record.id;
                if record.complete() && !record.release() {
                    inner.records.remove(path);
                }
                id
            }
        };
        debug!(path = %path, n, "receiver attached");
        Ok(ReceiverTicket {
            started,
            _guard: ReceiverGuard {
                registry: Arc::clone(self),
                path: path.to_owned(),
                record_id,
                seat_key,
            },
        })
    }

    fn detach_sender(&self, path: &str, record_id: u64) {
        let mut inner = self.lock();
        let Some(record) = inner.records.get_mut(path) else {
            return;
        };
        if record.id != record_id {
            return;
        }
        match record.phase {
            Phase::Gathering => {
                record.sender = SenderSlot::Vacant;
                if record.empty() {
                    inner.records.remove(path);
                    debug!(path = %path, "path released");
                } else {
                    debug!(path = %path, "sender detached before streaming");
                }
            }
            Phase::Streaming => {
                inner.records.remove(path);
                debug!(path = %path, "rendezvous closed");
            }
        }
    }

    fn detach_receiver(&self, path: &str, record_id: u64, seat_key: u64) {
        let mut inner = self.lock();
        let Some(record) = inner.records.get_mut(path) else {
            return;
        };
        if record.id != record_id || record.phase != Phase::Gathering {
            return;
        }
        record.receivers.retain(|seat| seat.key != seat_key);
        if record.empty() {
            inner.records.remove(path);
            debug!(path = %path, "path released");
        } else {
            debug!(path = %path, "receiver detached before streaming");
        }
    }
}

/// A seated sender. Holds the rendezvous open until dropped.
#[derive(Debug)]
pub struct SenderTicket {
    ready: oneshot::Receiver<Vec<ReceiverGate>>,
    _guard: SenderGuard,
}

impl SenderTicket {
    /// Waits until every receiver slot on the path is filled.
    pub async fn ready(&mut self) -> Result<Vec<ReceiverGate>, RelayError> {
        (&mut self.ready).await.map_err(|_| RelayError::TornDown)
    }
}

#[derive(Debug)]
struct SenderGuard {
    registry: Arc<Registry>,
    path: String,
    record_id: u64,
}

impl Drop for SenderGuard {
    fn drop(&mut self) {
        self.registry.detach_sender(&self.path, self.record_id);
    }
}

/// A seated receiver. Before streaming the slot is freed on drop; once
/// streaming has begun the body pipe speaks for the connection instead.
#[derive(Debug)]
pub struct ReceiverTicket {
    started: oneshot::Receiver<ReceiverStart>,
    _guard: ReceiverGuard,
}

impl ReceiverTicket {
    /// Waits until the sender's headers are known and streaming begins.
    pub async fn started(&mut self) -> Result<ReceiverStart, RelayError> {
        (&mut self.started).await.map_err(|_| RelayError::TornDown)
    }
}

#[derive(Debug)]
struct ReceiverGuard {
    registry: Arc<Registry>,
    path: String,
    record_id: u64,
    seat_key: u64,
}

impl Drop for ReceiverGuard {
    fn drop(&mut self) {
        self.registry
            .detach_receiver(&self.path, self.record_id, self.seat_key);
    }
}

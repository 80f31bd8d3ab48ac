//! Registry of connected SSE clients

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::sse::{HEARTBEAT_FRAME, SseEvent};

pub type ConnectionId = u64;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to one open SSE response
#[derive(Debug, Clone)]
pub struct SseConnection {
    id: ConnectionId,
    session_id: Option<String>,
    sender: mpsc::Sender<Bytes>,
    /// Set once a frame was dropped on a full queue
    lagged: Arc<AtomicBool>,
}

impl SseConnection {
    pub fn new(session_id: Option<String>, sender: mpsc::Sender<Bytes>) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            session_id,
            sender,
            lagged: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// False once the response body has been dropped or a frame was lost
    /// to a full queue.
    pub fn is_alive(&self) -> bool {
        !self.sender.is_closed() && !self.lagged.load(Ordering::Acquire)
    }

    /// Queue one frame without waiting.
    ///
    /// A full queue loses the frame and marks the connection dead, so cleanup
    /// ends the stream and the client resumes with `Last-Event-ID`.
    pub fn try_send(&self, frame: Bytes) -> bool {
        match self.sender.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                if !self.lagged.swap(true, Ordering::AcqRel) {
                    warn!(
                        connection_id = self.id,
                        session_id = ?self.session_id,
                        "SSE client queue full; dropping frame and closing stream"
                    );
                }
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

struct Slots {
    slots: Vec<Option<SseConnection>>,
    count: usize,
}

/// Growable slot array of SSE connections.
///
/// `count` always equals the number of occupied slots. A full array doubles.
pub struct ClientRegistry {
    inner: Mutex<Slots>,
}

impl ClientRegistry {
    pub fn new(initial_capacity: usize) -> Self {
        let capacity = initial_capacity.max(1);
        Self {
            inner: Mutex::new(Slots {
                slots: (0..capacity).map(|_| None).collect(),
                count: 0,
            }),
        }
    }

    /// Place `connection` in the first free slot; returns the slot index.
    pub fn add(&self, connection: SseConnection) -> usize {
        let mut inner = self.inner.lock();
        let slot = match inner.slots.iter().position(Option::is_none) {
            Some(slot) => slot,
            None => {
                let old_len = inner.slots.len();
                inner.slots.resize_with(old_len * 2, || None);
                debug!("Client registry grown to {} slots", old_len * 2);
                old_len
            }
        };
        debug!(connection_id = connection.id, slot, "SSE client registered");
        inner.slots[slot] = Some(connection);
        inner.count += 1;
        slot
    }

    pub fn remove(&self, id: ConnectionId) -> bool {
        let mut inner = self.inner.lock();
        let found = inner
            .slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|c| c.id == id));
        match found {
            Some(slot) => {
                inner.slots[slot] = None;
                inner.count -= 1;
                debug!(connection_id = id, "SSE client removed");
                true
            }
            None => false,
        }
    }

    /// Drop every connection bound to `session_id`; their streams end.
    pub fn remove_session(&self, session_id: &str) -> usize {
        self.remove_where(|c| c.session_id() == Some(session_id))
    }

    /// Distinct sessions with at least one open stream
    pub fn session_ids(&self) -> Vec<String> {
        let inner = self.inner.lock();
        let mut ids: Vec<String> = inner
            .slots
            .iter()
            .flatten()
            .filter_map(|c| c.session_id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn count(&self) -> usize {
        self.inner.lock().count
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().slots.len()
    }

    /// Free slots whose client has gone away.
    pub fn cleanup(&self) -> usize {
        let removed = self.remove_where(|c| !c.is_alive());
        if removed > 0 {
            debug!("Cleaned up {} dead SSE clients", removed);
        }
        removed
    }

    /// Drop every connection.
    pub fn clear(&self) -> usize {
        self.remove_where(|_| true)
    }

    /// Send `event` to every live client; returns successful sends.
    pub fn broadcast(&self, event: &SseEvent) -> usize {
        self.send_frame(event.to_bytes(), |_| true)
    }

    /// Send `event` only to clients bound to `session_id`.
    pub fn broadcast_to_session(&self, session_id: &str, event: &SseEvent) -> usize {
        self.send_frame(event.to_bytes(), |c| c.session_id() == Some(session_id))
    }

    pub fn broadcast_heartbeat(&self) -> usize {
        self.send_frame(Bytes::from_static(HEARTBEAT_FRAME.as_bytes()), |_| true)
    }

    fn send_frame<F>(&self, frame: Bytes, filter: F) -> usize
    where
        F: Fn(&SseConnection) -> bool,
    {
        let inner = self.inner.lock();
        let sent = inner
            .slots
            .iter()
            .flatten()
            .filter(|c| filter(c))
            .filter(|c| c.try_send(frame.clone()))
            .count();
        trace!("Frame delivered to {} SSE clients", sent);
        sent
    }

    fn remove_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&SseConnection) -> bool,
    {
        let mut inner = self.inner.lock();
        let mut removed = 0;
        for slot in inner.slots.iter_mut() {
            if slot.as_ref().is_some_and(&predicate) {
                *slot = None;
                removed += 1;
            }
        }
        inner.count -= removed;
        removed
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new(8)
    }
}

//! Bounded SSE event buffer with `Last-Event-ID` replay

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use crate::sse::SseEvent;

struct Ring {
    slots: Vec<Option<SseEvent>>,
    /// Slot of the oldest stored event
    head: usize,
    len: usize,
    next_event_id: u64,
    last_event_id: Option<String>,
    index: HashMap<String, usize>,
}

impl Ring {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Age rank of `slot`: 0 is the oldest event
    fn offset_of(&self, slot: usize) -> usize {
        (slot + self.capacity() - self.head) % self.capacity()
    }

    fn slot_at(&self, offset: usize) -> usize {
        (self.head + offset) % self.capacity()
    }

    fn push(&mut self, id: Option<String>, event_type: Option<String>, data: String) -> SseEvent {
        let id = match id {
            Some(id) => id,
            None => {
                let generated = self.next_event_id;
                self.next_event_id += 1;
                generated.to_string()
            }
        };
        let event = SseEvent::new(Some(id.clone()), event_type, data);

        let slot = if self.len == self.capacity() {
            let slot = self.head;
            if let Some(evicted) = self.slots[slot].take() {
                if let Some(evicted_id) = evicted.id {
                    if self.index.get(&evicted_id) == Some(&slot) {
                        self.index.remove(&evicted_id);
                    }
                }
            }
            self.head = (self.head + 1) % self.capacity();
            slot
        } else {
            let slot = self.slot_at(self.len);
            self.len += 1;
            slot
        };

        self.slots[slot] = Some(event.clone());
        self.index.insert(id.clone(), slot);
        self.last_event_id = Some(id);
        event
    }

    fn events_after(&self, last_event_id: Option<&str>) -> Vec<SseEvent> {
        let start = match last_event_id {
            None => 0,
            Some(id) => match self.index.get(id) {
                Some(&slot) => self.offset_of(slot) + 1,
                None => {
                    debug!(last_event_id = %id, "Last-Event-ID not held; replaying nothing");
                    return Vec::new();
                }
            },
        };
        (start..self.len)
            .filter_map(|offset| self.slots[self.slot_at(offset)].clone())
            .collect()
    }
}

/// Circular buffer of recent events for one stream scope.
///
/// Every stored event has an id. Ids generated here are strictly increasing;
/// callers may supply their own. When full, the oldest event is dropped and
/// its id leaves the index.
pub struct SseStreamContext {
    ring: Mutex<Ring>,
}

impl SseStreamContext {
    pub fn new(max_events: usize) -> Self {
        let capacity = max_events.max(1);
        Self {
            ring: Mutex::new(Ring {
                slots: (0..capacity).map(|_| None).collect(),
                head: 0,
                len: 0,
                next_event_id: 1,
                last_event_id: None,
                index: HashMap::new(),
            }),
        }
    }

    /// Store an event, assigning the next numeric id when `id` is `None`.
    pub fn store(&self, id: Option<String>, event_type: Option<String>, data: impl Into<String>) -> SseEvent {
        let mut ring = self.ring.lock();
        ring.push(id, event_type, data.into())
    }

    /// Store an event and run `deliver` on it before any other store or
    /// replay on this context can observe the ring.
    pub fn store_with<R, F>(
        &self,
        id: Option<String>,
        event_type: Option<String>,
        data: impl Into<String>,
        deliver: F,
    ) -> (SseEvent, R)
    where
        F: FnOnce(&SseEvent) -> R,
    {
        let mut ring = self.ring.lock();
        let event = ring.push(id, event_type, data.into());
        let delivered = deliver(&event);
        (event, delivered)
    }

    /// Events stored after `last_event_id`, oldest first.
    ///
    /// With `None`, every stored event. An id no longer (or never) held
    /// replays nothing.
    pub fn replay(&self, last_event_id: Option<&str>) -> Vec<SseEvent> {
        self.ring.lock().events_after(last_event_id)
    }

    /// Snapshot the replay and run `attach` under the same lock, so an event
    /// stored through [`Self::store_with`] reaches the caller exactly once:
    /// in the snapshot or through whatever `attach` registered.
    pub fn replay_and_attach<R, F>(&self, last_event_id: Option<&str>, attach: F) -> (Vec<SseEvent>, R)
    where
        F: FnOnce() -> R,
    {
        let ring = self.ring.lock();
        let events = ring.events_after(last_event_id);
        (events, attach())
    }

    /// Feed replayed events to `sink`, stopping at the first refusal.
    pub fn replay_into<F>(&self, last_event_id: Option<&str>, mut sink: F) -> usize
    where
        F: FnMut(&SseEvent) -> bool,
    {
        let mut sent = 0;
        for event in self.replay(last_event_id) {
            if !sink(&event) {
                break;
            }
            sent += 1;
        }
        sent
    }

    pub fn contains(&self, event_id: &str) -> bool {
        self.ring.lock().index.contains_key(event_id)
    }

    pub fn last_event_id(&self) -> Option<String> {
        self.ring.lock().last_event_id.clone()
    }

    pub fn len(&self) -> usize {
        self.ring.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.ring.lock().capacity()
    }

    pub fn clear(&self) {
        let mut ring = self.ring.lock();
        ring.slots.iter_mut().for_each(|slot| *slot = None);
        ring.head = 0;
        ring.len = 0;
        ring.last_event_id = None;
        ring.index.clear();
    }
}

impl std::fmt::Debug for SseStreamContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ring = self.ring.lock();
        f.debug_struct("SseStreamContext")
            .field("capacity", &ring.capacity())
            .field("len", &ring.len)
            .field("last_event_id", &ring.last_event_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(events: &[SseEvent]) -> Vec<String> {
        events.iter().filter_map(|e| e.id.clone()).collect()
    }

    #[test]
    fn test_generated_ids_increase() {
        let ctx = SseStreamContext::new(8);
        let a = ctx.store(None, None, "a");
        let b = ctx.store(None, Some("message".into()), "b");
        let c = ctx.store(None, None, "c");
        assert_eq!(ids(&[a, b, c]), vec!["1", "2", "3"]);
        assert_eq!(ctx.last_event_id().as_deref(), Some("3"));
    }

    #[test]
    fn test_replay_suffix_after_id() {
        let ctx = SseStreamContext::new(8);
        for data in ["one", "two", "three"] {
            ctx.store(None, None, data);
        }
        let replayed = ctx.replay(Some("2"));
        assert_eq!(ids(&replayed), vec!["3"]);
        assert_eq!(replayed[0].data, "three");

        assert_eq!(ctx.replay(None).len(), 3);
        assert!(ctx.replay(Some("3")).is_empty());
    }

    #[test]
    fn test_unknown_id_replays_nothing() {
        let ctx = SseStreamContext::new(4);
        ctx.store(None, None, "x");
        assert!(ctx.replay(Some("99")).is_empty());
    }

    #[test]
    fn test_overflow_drops_oldest_and_index_entry() {
        let ctx = SseStreamContext::new(3);
        for i in 0..5 {
            ctx.store(None, None, format!("e{}", i));
        }
        assert_eq!(ctx.len(), 3);
        assert!(!ctx.contains("1"));
        assert!(!ctx.contains("2"));
        assert!(ctx.contains("3"));
        assert_eq!(ids(&ctx.replay(None)), vec!["3", "4", "5"]);
        assert_eq!(ids(&ctx.replay(Some("3"))), vec!["4", "5"]);
        // the evicted id is gone, so it replays nothing
        assert!(ctx.replay(Some("2")).is_empty());
    }

    #[test]
    fn test_caller_ids_and_sink() {
        let ctx = SseStreamContext::new(4);
        ctx.store(Some("evt-a".into()), None, "a");
        ctx.store(Some("evt-b".into()), None, "b");
        ctx.store(None, None, "c");
        assert_eq!(ids(&ctx.replay(Some("evt-a"))), vec!["evt-b", "1"]);

        let mut seen = Vec::new();
        let sent = ctx.replay_into(None, |event| {
            seen.push(event.data.clone());
            seen.len() < 2
        });
        assert_eq!(sent, 1);
        assert_eq!(seen, vec!["a", "b"]);
    }

    #[test]
    fn test_replay_and_attach_delivers_each_event_once() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let ctx = Arc::new(SseStreamContext::new(1000));
        let attached = Arc::new(AtomicBool::new(false));
        let live = Arc::new(Mutex::new(Vec::new()));

        let writer = {
            let (ctx, attached, live) = (ctx.clone(), attached.clone(), live.clone());
            std::thread::spawn(move || {
                for i in 0..500 {
                    ctx.store_with(None, None, format!("e{}", i), |event| {
                        if attached.load(Ordering::SeqCst) {
                            live.lock().push(event.id.clone().unwrap_or_default());
                        }
                    });
                }
            })
        };

        std::thread::yield_now();
        let (replayed, ()) = ctx.replay_and_attach(None, || attached.store(true, Ordering::SeqCst));
        writer.join().unwrap();

        let mut seen = ids(&replayed);
        seen.extend(live.lock().iter().cloned());
        let expected: Vec<String> = (1..=500).map(|i| i.to_string()).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_clear() {
        let ctx = SseStreamContext::new(2);
        ctx.store(None, None, "a");
        ctx.clear();
        assert!(ctx.is_empty());
        assert!(ctx.last_event_id().is_none());
        assert!(ctx.replay(None).is_empty());
    }
}

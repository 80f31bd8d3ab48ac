//! Resource response cache with TTL, LRU eviction and single-flight fills

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{McpError, McpResult};
use crate::model::ContentItem;

pub const DEFAULT_CACHE_CAPACITY: usize = 128;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
/// TTL for results that carry JSON or binary items
pub const EXTENDED_CACHE_TTL: Duration = Duration::from_secs(3600);

/// One cached read result
#[derive(Debug, Clone)]
pub struct CachedResource {
    pub fingerprint: String,
    pub content: Vec<ContentItem>,
    pub expires_at: Instant,
    pub last_used: Instant,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Handler invocations made on behalf of a miss
    pub fills: u64,
}

#[derive(Debug, Clone)]
enum FlightState {
    Pending,
    Done(Vec<ContentItem>),
    Failed(McpError),
}

/// One in-progress handler invocation for a URI
struct Flight {
    state: watch::Sender<FlightState>,
    /// Set by the single waiter that retries after a failed fill
    promoted: AtomicBool,
}

impl Flight {
    fn new() -> Self {
        let (state, _) = watch::channel(FlightState::Pending);
        Self {
            state,
            promoted: AtomicBool::new(false),
        }
    }
}

enum Step {
    Lead(Arc<Flight>),
    Wait(Arc<Flight>),
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, CachedResource>,
    in_flight: HashMap<String, Arc<Flight>>,
    stats: CacheStats,
}

impl CacheInner {
    fn lookup(&mut self, uri: &str, now: Instant) -> Option<Vec<ContentItem>> {
        match self.entries.get_mut(uri) {
            Some(entry) if entry.expires_at > now => {
                entry.last_used = now;
                self.stats.hits += 1;
                Some(entry.content.clone())
            }
            Some(_) => {
                self.entries.remove(uri);
                self.stats.misses += 1;
                None
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    fn make_room(&mut self, capacity: usize, now: Instant) {
        if self.entries.len() < capacity {
            return;
        }
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        self.stats.evictions += (before - self.entries.len()) as u64;

        while self.entries.len() >= capacity {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(uri, _)| uri.clone())
            else {
                break;
            };
            self.entries.remove(&oldest);
            self.stats.evictions += 1;
            debug!(uri = %oldest, "Evicted least recently used resource");
        }
    }

    /// Drop the in-flight marker only if it is still `flight`.
    fn finish_flight(&mut self, uri: &str, flight: &Arc<Flight>) {
        if self
            .in_flight
            .get(uri)
            .is_some_and(|current| Arc::ptr_eq(current, flight))
        {
            self.in_flight.remove(uri);
        }
    }
}

/// URI-keyed cache of resource read results.
///
/// Concurrent misses for the same URI collapse into one handler call; see
/// [`ResourceCache::get_or_fetch`].
pub struct ResourceCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
    default_ttl: Duration,
    extended_ttl: Duration,
}

impl ResourceCache {
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            capacity: capacity.max(1),
            default_ttl,
            extended_ttl: EXTENDED_CACHE_TTL.max(default_ttl),
        }
    }

    pub fn with_extended_ttl(mut self, ttl: Duration) -> Self {
        self.extended_ttl = ttl;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// TTL for `content`: the default for all-text results, the extended TTL otherwise.
    pub fn ttl_for(&self, content: &[ContentItem]) -> Duration {
        if content.iter().all(ContentItem::is_text) {
            self.default_ttl
        } else {
            self.extended_ttl
        }
    }

    /// Clone of the stored content if present and not expired.
    pub fn get(&self, uri: &str) -> Option<Vec<ContentItem>> {
        self.inner.lock().lookup(uri, Instant::now())
    }

    pub fn put(&self, uri: &str, content: Vec<ContentItem>) {
        let ttl = self.ttl_for(&content);
        self.put_with_ttl(uri, content, ttl);
    }

    pub fn put_with_ttl(&self, uri: &str, content: Vec<ContentItem>, ttl: Duration) {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        if !inner.entries.contains_key(uri) {
            inner.make_room(self.capacity, now);
        }
        inner.entries.insert(
            uri.to_string(),
            CachedResource {
                fingerprint: uri.to_string(),
                content,
                expires_at: now + ttl,
                last_used: now,
            },
        );
    }

    pub fn remove(&self, uri: &str) -> bool {
        self.inner.lock().entries.remove(uri).is_some()
    }

    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            entries: inner.entries.len(),
            ..inner.stats
        }
    }

    /// Return cached content for `uri`, calling `fetch` on a miss.
    ///
    /// While one caller runs `fetch`, others asking for the same URI wait and
    /// receive its result. If the fill fails, exactly one waiter retries and
    /// the rest get a clone of the error.
    pub async fn get_or_fetch<F, Fut>(&self, uri: &str, fetch: F) -> McpResult<Vec<ContentItem>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = McpResult<Vec<ContentItem>>>,
    {
        loop {
            let step = {
                let mut inner = self.inner.lock();
                if let Some(content) = inner.lookup(uri, Instant::now()) {
                    return Ok(content);
                }
                match inner.in_flight.get(uri) {
                    Some(flight) => Step::Wait(flight.clone()),
                    None => {
                        let flight = Arc::new(Flight::new());
                        inner.in_flight.insert(uri.to_string(), flight.clone());
                        inner.stats.fills += 1;
                        Step::Lead(flight)
                    }
                }
            };
            let waiting_on = match step {
                Step::Lead(flight) => return self.fill(uri, flight, &fetch).await,
                Step::Wait(flight) => flight,
            };

            let mut rx = waiting_on.state.subscribe();
            let outcome = match rx
                .wait_for(|state| !matches!(state, FlightState::Pending))
                .await
            {
                Ok(state) => state.clone(),
                Err(_) => FlightState::Failed(McpError::internal("resource fill abandoned")),
            };

            match outcome {
                FlightState::Done(content) => return Ok(content),
                FlightState::Failed(err) => {
                    if waiting_on
                        .promoted
                        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        debug!(uri = %uri, "Retrying failed resource fill");
                        continue;
                    }
                    return Err(err);
                }
                FlightState::Pending => continue,
            }
        }
    }

    async fn fill<F, Fut>(&self, uri: &str, flight: Arc<Flight>, fetch: &F) -> McpResult<Vec<ContentItem>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = McpResult<Vec<ContentItem>>>,
    {
        let mut guard = FlightGuard {
            cache: self,
            uri,
            flight: flight.clone(),
            armed: true,
        };

        let result = fetch().await;
        guard.armed = false;

        let state = match &result {
            Ok(content) => {
                self.put(uri, content.clone());
                FlightState::Done(content.clone())
            }
            Err(err) => {
                debug!(uri = %uri, "Resource fill failed: {}", err);
                FlightState::Failed(err.clone())
            }
        };
        self.inner.lock().finish_flight(uri, &flight);
        flight.state.send_replace(state);
        result
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL)
    }
}

/// Fails the flight if the filling future is dropped mid-call.
struct FlightGuard<'a> {
    cache: &'a ResourceCache,
    uri: &'a str,
    flight: Arc<Flight>,
    armed: bool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!(uri = %self.uri, "Resource fill cancelled");
            self.cache.inner.lock().finish_flight(self.uri, &self.flight);
            self.flight.state.send_replace(FlightState::Failed(McpError::internal(
                "resource fill cancelled",
            )));
        }
    }
}

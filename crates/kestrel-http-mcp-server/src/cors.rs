//! CORS (Cross-Origin Resource Sharing) support

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE,
};
use http::{HeaderMap, HeaderName, HeaderValue};
use parking_lot::Mutex;
use tracing::warn;

/// Number of distinct header blocks kept at once
const CORS_CACHE_SLOTS: usize = 4;

/// The CORS options of a transport
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorsSettings {
    pub allow_origin: String,
    pub allow_methods: String,
    pub allow_headers: String,
    pub max_age: u64,
}

impl CorsSettings {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    fn build(&self) -> Vec<(HeaderName, HeaderValue)> {
        let max_age = self.max_age.to_string();
        let fields = [
            (ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.as_str()),
            (ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.as_str()),
            (ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.as_str()),
            (ACCESS_CONTROL_EXPOSE_HEADERS, "Mcp-Session-Id"),
            (ACCESS_CONTROL_MAX_AGE, max_age.as_str()),
        ];
        fields
            .into_iter()
            .filter_map(|(name, value)| match HeaderValue::from_str(value) {
                Ok(value) => Some((name, value)),
                Err(_) => {
                    warn!("Skipping invalid CORS header value for {}: {:?}", name, value);
                    None
                }
            })
            .collect()
    }
}

/// Pre-built CORS header blocks keyed by a hash of the settings
#[derive(Default)]
pub struct CorsHeaderCache {
    blocks: Mutex<HashMap<u64, Arc<Vec<(HeaderName, HeaderValue)>>>>,
}

impl CorsHeaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(&self, settings: &CorsSettings) -> Arc<Vec<(HeaderName, HeaderValue)>> {
        let key = settings.fingerprint();
        let mut blocks = self.blocks.lock();
        if let Some(block) = blocks.get(&key) {
            return Arc::clone(block);
        }
        if blocks.len() >= CORS_CACHE_SLOTS {
            blocks.clear();
        }
        let block = Arc::new(settings.build());
        blocks.insert(key, Arc::clone(&block));
        block
    }

    /// Apply CORS headers to a response
    pub fn apply(&self, settings: &CorsSettings, headers: &mut HeaderMap) {
        for (name, value) in self.headers(settings).iter() {
            headers.insert(name.clone(), value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

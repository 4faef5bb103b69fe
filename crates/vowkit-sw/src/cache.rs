//! Versioned cache generations.
//!
//! Each generation is a named key-value store of frozen response
//! snapshots for one request class. Generation names derive from a single
//! version constant, so the three names can never drift apart.

use hashbrown::HashMap;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::SwError;
use vowkit_net::{Request, RequestId, Response};

/// Request class a generation serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheClass {
    /// Build-time shell assets.
    Static,
    /// Rendered pages.
    Dynamic,
    /// JSON API responses.
    Api,
}

impl CacheClass {
    /// All classes, in activation order.
    pub const ALL: [CacheClass; 3] = [CacheClass::Static, CacheClass::Dynamic, CacheClass::Api];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheClass::Static => "static",
            CacheClass::Dynamic => "dynamic",
            CacheClass::Api => "api",
        }
    }
}

/// Derive a generation name from the version constant.
///
/// `generation_name("vowkit", Static, "3.2.5")` → `"vowkit-static-v3.2.5"`.
pub fn generation_name(prefix: &str, class: CacheClass, version: &str) -> String {
    format!("{}-{}-v{}", prefix, class.as_str(), version)
}

/// Canonical cache key for a request: `"METHOD url"`.
///
/// Only GETs are ever cached, so the method prefix is constant in
/// practice, but keeping it in the key makes the GET-only invariant
/// visible in stored keys.
pub fn entry_key(method: &Method, url: &Url) -> String {
    format!("{} {}", method, url)
}

/// A cached request/response pair, frozen at fetch time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEntry {
    /// Canonical cache key.
    pub key: String,

    /// Request URL.
    pub url: String,

    /// Response status.
    pub status: u16,

    /// Response headers.
    pub headers: HashMap<String, String>,

    /// Response body.
    pub body: Vec<u8>,

    /// Cached at timestamp (ms since epoch).
    pub cached_at: u64,
}

impl CachedEntry {
    /// Snapshot a response for storage.
    pub fn from_response(request: &Request, response: &Response) -> Self {
        let mut headers = HashMap::new();
        for (name, value) in response.headers.iter() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.as_str().to_string(), v.to_string());
            }
        }

        Self {
            key: entry_key(&request.method, &request.url),
            url: request.url.to_string(),
            status: response.status.as_u16(),
            headers,
            body: response.body.to_vec(),
            cached_at: now_ms(),
        }
    }

    /// Replay the snapshot as a response.
    pub fn to_response(&self) -> Result<Response, SwError> {
        let url = Url::parse(&self.url).map_err(|e| SwError::InvalidUrl(e.to_string()))?;
        let status =
            StatusCode::from_u16(self.status).map_err(|e| SwError::Cache(e.to_string()))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            if let (Ok(n), Ok(v)) = (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                headers.insert(n, v);
            }
        }

        Ok(Response {
            request_id: RequestId::new(),
            url,
            status,
            headers,
            body: self.body.clone().into(),
        })
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// One cache generation.
#[derive(Debug, Default)]
pub struct Cache {
    /// Generation name.
    pub name: String,

    /// Cached entries by canonical key.
    entries: HashMap<String, CachedEntry>,
}

impl Cache {
    /// Create a new generation.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: HashMap::new(),
        }
    }

    /// Look up an entry by canonical key.
    pub fn match_key(&self, key: &str) -> Option<&CachedEntry> {
        self.entries.get(key)
    }

    /// Store an entry. Overwrites any previous entry for the same key.
    pub fn put(&mut self, entry: CachedEntry) {
        self.entries.insert(entry.key.clone(), entry);
    }

    /// Delete an entry.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// All canonical keys.
    pub fn keys(&self) -> Vec<&str> {
        self.entries.keys().map(|s| s.as_str()).collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// All cache generations, current and stale.
#[derive(Debug, Default)]
pub struct CacheStorage {
    caches: HashMap<String, Cache>,
}

impl CacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a generation (creates it if absent).
    pub fn open(&mut self, name: &str) -> &mut Cache {
        self.caches
            .entry(name.to_string())
            .or_insert_with(|| Cache::new(name))
    }

    /// Check if a generation exists.
    pub fn has(&self, name: &str) -> bool {
        self.caches.contains_key(name)
    }

    /// Delete a whole generation. The only eviction mechanism.
    pub fn delete(&mut self, name: &str) -> bool {
        self.caches.remove(name).is_some()
    }

    /// All generation names.
    pub fn keys(&self) -> Vec<String> {
        self.caches.keys().cloned().collect()
    }

    /// Look up a key in a specific generation.
    pub fn match_in(&self, name: &str, key: &str) -> Option<&CachedEntry> {
        self.caches.get(name).and_then(|c| c.match_key(key))
    }

    /// Look up a key across all generations.
    pub fn match_any(&self, key: &str) -> Option<&CachedEntry> {
        self.caches.values().find_map(|c| c.match_key(key))
    }
}

//! Rendered page cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::render::document::{PageData, ReloadBootstrap, ScriptTag, StyleTag};
use crate::routing::route::MetaTag;

/// Seconds since the Unix epoch.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Expiry timestamp `ttl` from now.
pub fn expires_in(ttl: Duration) -> i64 {
    unix_now().saturating_add(ttl.as_secs() as i64)
}

/// A fully rendered page, keyed by request path.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub title: String,
    pub description: String,
    pub favicon: String,
    pub meta_tags: Vec<MetaTag>,
    pub css_links: Vec<StyleTag>,
    pub js_links: Vec<ScriptTag>,
    pub head_extra: Vec<String>,
    /// Markup produced by the server bundle.
    pub body: String,
    pub css: String,
    pub js: String,
    /// Expiry timestamp (seconds since epoch).
    pub expires_at: i64,
}

impl CacheEntry {
    /// Check if the entry may still be served at `now`.
    pub fn is_fresh_at(&self, now: i64) -> bool {
        now < self.expires_at
    }

    /// Template data for this entry. The reload script is decided per
    /// request and never cached.
    pub fn to_page_data(&self, reload: Option<ReloadBootstrap>) -> PageData {
        PageData {
            title: self.title.clone(),
            description: self.description.clone(),
            favicon: self.favicon.clone(),
            meta_tags: self.meta_tags.clone(),
            css_links: self.css_links.clone(),
            js_links: self.js_links.clone(),
            head_extra: self.head_extra.clone(),
            css: self.css.clone(),
            js: self.js.clone(),
            markup: self.body.clone(),
            reload,
        }
    }
}

/// A thread-safe TTL cache for rendered pages.
///
/// Readers take the shared lock; `put`, `evict_expired` and `clear` take the
/// exclusive lock. Entries are replaced wholesale, never mutated.
///
/// Every `clear` starts a new generation. A render that began before the
/// clear stores through [`PageCache::put_if_current`] and is discarded.
#[derive(Debug, Default)]
pub struct PageCache {
    entries: RwLock<HashMap<String, Arc<CacheEntry>>>,
    generation: AtomicU64,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `path` if present and not expired.
    pub fn get(&self, path: &str) -> Option<Arc<CacheEntry>> {
        self.get_at(path, unix_now())
    }

    fn get_at(&self, path: &str, now: i64) -> Option<Arc<CacheEntry>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(path)
            .filter(|entry| entry.is_fresh_at(now))
            .cloned()
    }

    /// Insert or replace the entry for its key. Last writer wins.
    pub fn put(&self, entry: CacheEntry) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(entry.key.clone(), Arc::new(entry));
    }

    /// Current generation, read before starting work that will be cached.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Insert `entry` only if no `clear` happened since `generation` was
    /// read. Returns whether the entry was stored.
    pub fn put_if_current(&self, entry: CacheEntry, generation: u64) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if self.generation.load(Ordering::Acquire) != generation {
            return false;
        }
        entries.insert(entry.key.clone(), Arc::new(entry));
        true
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn evict_expired(&self) -> usize {
        let now = unix_now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh_at(now));
        before - entries.len()
    }

    /// Drop every entry, returning how many were dropped.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let dropped = entries.len();
        entries.clear();
        self.generation.fetch_add(1, Ordering::AcqRel);
        dropped
    }

    /// Number of stored entries, expired ones included until evicted.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

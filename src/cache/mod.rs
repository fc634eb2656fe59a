//! Content-hash memoization and generation-keyed query caching
//!
//! Two small caches with explicit, testable state:
//!
//! - [`MemoCache`] memoizes hosted-model responses (transcriptions, image
//!   descriptions) by SHA-256 of the input bytes, with a TTL.
//! - [`QueryCache`] holds aggregate query results tagged with the ledger's
//!   write generation; any write makes the tag stale, so a cached total can
//!   never outlive the data it summarizes.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

/// Hex SHA-256 of a byte slice, used as a memo key.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

struct MemoEntry {
    inserted_at: Instant,
    value: String,
}

/// TTL-bounded memo table keyed by content hash.
pub struct MemoCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, MemoEntry>>,
}

impl MemoCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a memoized value; expired entries are treated as absent.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: String, value: String) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key,
            MemoEntry {
                inserted_at: Instant::now(),
                value,
            },
        );
    }

    /// Drop a single entry.
    pub fn invalidate(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
    }

    /// Drop everything.
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct QueryEntry {
    generation: u64,
    inserted_at: Instant,
    value: String,
}

/// Cache for serialized aggregate query results, keyed by query name and
/// tagged with the ledger generation at compute time.
pub struct QueryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, QueryEntry>>,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return a cached result only if it was computed at `generation` and
    /// has not aged past the TTL.
    pub fn get(&self, key: &str, generation: u64) -> Option<String> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(entry)
                if entry.generation == generation && entry.inserted_at.elapsed() < self.ttl =>
            {
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: String, generation: u64, value: String) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key,
            QueryEntry {
                generation,
                inserted_at: Instant::now(),
                value,
            },
        );
    }

    /// Explicit invalidation hook for write paths.
    pub fn purge(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }
}

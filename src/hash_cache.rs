//! Hashing cache — `(st_dev, st_ino, algo_key) -> (digest, st_ctime)`.
//!
//! Process-wide, mutex-guarded. A hit requires the stored `st_ctime` to equal
//! the current stat's `st_ctime`, so a hardlink re-touched since the cached
//! entry was written correctly misses and gets re-hashed.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    pub dev: u64,
    pub ino: u64,
    pub algo_key: String,
}

#[derive(Debug, Clone)]
pub struct CacheValue {
    pub digest: String,
    pub ctime: f64,
}

#[derive(Default)]
pub struct HashCache {
    inner: Mutex<HashMap<CacheKey, CacheValue>>,
}

impl HashCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached digest; returns `None` on miss or stale `ctime`.
    pub fn get(&self, key: &CacheKey, current_ctime: f64) -> Option<String> {
        let guard = self.inner.lock().expect("hash cache mutex poisoned");
        guard.get(key).and_then(|v| {
            if v.ctime == current_ctime {
                Some(v.digest.clone())
            } else {
                None
            }
        })
    }

    pub fn insert(&self, key: CacheKey, digest: String, ctime: f64) {
        let mut guard = self.inner.lock().expect("hash cache mutex poisoned");
        guard.insert(key, CacheValue { digest, ctime });
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("hash cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

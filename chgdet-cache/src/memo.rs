use std::collections::HashMap;
use std::collections::hash_map::{DefaultHasher, Entry};
use std::hash::Hasher;
use std::io;

use serde::Serialize;
use tracing::debug;

use crate::intern::Atom;

/// Identity of a memoized computation: the session and everything it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub session: Atom,
    pub fingerprint: u64,
}

impl CacheKey {
    pub fn new<P: Serialize + ?Sized>(session: &str, inputs: &P) -> Self {
        Self {
            session: Atom::from(session),
            fingerprint: fingerprint(inputs),
        }
    }
}

/// Feeds serialized bytes straight into a hasher.
struct HashWriter<'a>(&'a mut DefaultHasher);

impl io::Write for HashWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Stable-within-process hash of any serializable value.
///
/// Values are hashed through their JSON form so that configs and traces holding floats can take
/// part. Serialization is streamed into the hasher, so large inputs are never buffered.
pub fn fingerprint<P: Serialize + ?Sized>(params: &P) -> u64 {
    let mut hasher = DefaultHasher::new();
    if let Err(err) = serde_json::to_writer(HashWriter(&mut hasher), params) {
        debug!(%err, "fingerprint input failed to serialize");
    }
    hasher.finish()
}

/// Explicit memoization table.
///
/// Nothing is computed behind the caller's back: values enter through
/// [`MemoCache::get_or_insert_with`] and leave through [`MemoCache::invalidate`] or
/// [`MemoCache::clear`].
#[derive(Debug)]
pub struct MemoCache<V> {
    entries: HashMap<CacheKey, V>,
    hits: u64,
    misses: u64,
}

impl<V> Default for MemoCache<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }
}

impl<V> MemoCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: CacheKey, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    pub fn get_or_insert_with<F: FnOnce() -> V>(&mut self, key: CacheKey, compute: F) -> &V {
        match self.entries.entry(key) {
            Entry::Occupied(e) => {
                self.hits += 1;
                e.into_mut()
            }
            Entry::Vacant(e) => {
                self.misses += 1;
                debug!(session = %e.key().session, fingerprint = e.key().fingerprint, "computing cache entry");
                e.insert(compute())
            }
        }
    }

    /// Like [`MemoCache::get_or_insert_with`], but a failed computation leaves the cache untouched.
    pub fn try_get_or_insert_with<E, F>(&mut self, key: CacheKey, compute: F) -> Result<&V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        match self.entries.entry(key) {
            Entry::Occupied(e) => {
                self.hits += 1;
                Ok(e.into_mut())
            }
            Entry::Vacant(e) => {
                self.misses += 1;
                debug!(session = %e.key().session, fingerprint = e.key().fingerprint, "computing cache entry");
                let value = compute()?;
                Ok(e.insert(value))
            }
        }
    }

    pub fn invalidate(&mut self, key: &CacheKey) -> Option<V> {
        self.entries.remove(key)
    }

    /// Drop every entry belonging to `session`, returning how many were removed.
    pub fn invalidate_session(&mut self, session: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| &*k.session != session);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

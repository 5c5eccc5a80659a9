use std::collections::HashMap;
use std::time::{Duration, Instant};

/// One remembered lookup result. `data: None` is a cached negative
/// answer; `expires_at: None` means the entry lives until tidy.
#[derive(Debug, Clone)]
struct CachedItem {
    data: Option<String>,
    expires_at: Option<Instant>,
    opts: Option<String>,
}

impl CachedItem {
    fn is_fresh(&self, now: Instant) -> bool {
        match self.expires_at {
            None => true,
            Some(expiry) => expiry > now,
        }
    }

    fn opts_match(&self, opts: Option<&str>) -> bool {
        self.opts.as_deref() == opts
    }
}

/// Per-handle cache of previous results, keyed by the exact query string.
///
/// A stale or fingerprint-mismatched entry is left in place; the next
/// insert for its key overwrites it.
#[derive(Debug, Default)]
pub(crate) struct ItemCache {
    entries: HashMap<String, CachedItem>,
}

impl ItemCache {
    /// Probe for a result. Hits require a fresh entry whose options
    /// fingerprint byte-matches the current options.
    pub(crate) fn probe(&self, key: &str, opts: Option<&str>, now: Instant) -> Option<&Option<String>> {
        self.entries
            .get(key)
            .filter(|item| item.is_fresh(now) && item.opts_match(opts))
            .map(|item| &item.data)
    }

    /// Install or replace the entry for `key`.
    pub(crate) fn insert(
        &mut self,
        key: String,
        data: Option<String>,
        ttl: Option<Duration>,
        opts: Option<&str>,
        now: Instant,
    ) {
        self.entries.insert(
            key,
            CachedItem {
                data,
                expires_at: ttl.map(|ttl| now + ttl),
                opts: opts.map(str::to_string),
            },
        );
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

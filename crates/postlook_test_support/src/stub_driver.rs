use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use postlook_core::{
    CacheTtl, DriverCapabilities, DriverMetadata, DriverState, LookupDriver, LookupError,
    QueryStyle,
};

/// Metadata for the single-key personality: file-backed and
/// partial-capable, like a flat-file driver.
pub static STUB_FILE_METADATA: DriverMetadata = DriverMetadata {
    name: "stubfile",
    description: "Scriptable single-key test driver",
    style: QueryStyle::SingleKeyFile,
    capabilities: DriverCapabilities::FILE_BACKED.union(DriverCapabilities::PARTIAL_MATCH),
};

/// Metadata for the query personality: no filename, with a quoting
/// convention, like an SQL driver.
pub static STUB_QUERY_METADATA: DriverMetadata = DriverMetadata {
    name: "stubquery",
    description: "Scriptable query-style test driver",
    style: QueryStyle::Query,
    capabilities: DriverCapabilities::QUOTING,
};

/// Call counts and per-resource open/close logs, snapshotted by
/// [`StubDriver::stats`].
#[derive(Debug, Clone, Default)]
pub struct StubStats {
    pub open_calls: usize,
    pub find_calls: usize,
    pub close_calls: usize,
    pub tidy_calls: usize,
    /// Filenames passed to open, in order ("" for query style).
    pub open_log: Vec<String>,
    /// Filenames of connections passed to close, in order.
    pub close_log: Vec<String>,
}

#[derive(Default)]
struct StubState {
    entries: RwLock<HashMap<String, String>>,
    ttl_overrides: RwLock<HashMap<String, CacheTtl>>,
    defer_keys: RwLock<HashSet<String>>,
    open_error: RwLock<Option<String>>,
    open_calls: AtomicUsize,
    find_calls: AtomicUsize,
    close_calls: AtomicUsize,
    tidy_calls: AtomicUsize,
    open_log: Mutex<Vec<String>>,
    close_log: Mutex<Vec<String>>,
}

struct StubConnection {
    filename: String,
    state: Arc<StubState>,
}

/// A scriptable lookup driver that counts every hook invocation, so tests
/// can observe exactly when the dispatcher goes to the backend and when a
/// cache answered instead.
#[derive(Clone)]
pub struct StubDriver {
    metadata: &'static DriverMetadata,
    state: Arc<StubState>,
}

impl StubDriver {
    /// Single-key, file-backed, partial-capable personality.
    pub fn file_backed() -> Self {
        Self {
            metadata: &STUB_FILE_METADATA,
            state: Arc::new(StubState::default()),
        }
    }

    /// Query-style personality with a quoting convention.
    pub fn query_style() -> Self {
        Self {
            metadata: &STUB_QUERY_METADATA,
            state: Arc::new(StubState::default()),
        }
    }

    pub fn with_entry(self, key: impl Into<String>, data: impl Into<String>) -> Self {
        rwlock_write(&self.state.entries).insert(key.into(), data.into());
        self
    }

    pub fn with_ttl(self, key: impl Into<String>, ttl: CacheTtl) -> Self {
        rwlock_write(&self.state.ttl_overrides).insert(key.into(), ttl);
        self
    }

    pub fn with_defer(self, key: impl Into<String>) -> Self {
        rwlock_write(&self.state.defer_keys).insert(key.into());
        self
    }

    pub fn with_open_error(self, message: impl Into<String>) -> Self {
        *rwlock_write(&self.state.open_error) = Some(message.into());
        self
    }

    /// Change an entry after the fact, e.g. to prove a cached result is
    /// served instead of the live one.
    pub fn set_entry(&self, key: impl Into<String>, data: impl Into<String>) {
        rwlock_write(&self.state.entries).insert(key.into(), data.into());
    }

    pub fn remove_entry(&self, key: &str) {
        rwlock_write(&self.state.entries).remove(key);
    }

    pub fn stats(&self) -> StubStats {
        StubStats {
            open_calls: self.state.open_calls.load(Ordering::Relaxed),
            find_calls: self.state.find_calls.load(Ordering::Relaxed),
            close_calls: self.state.close_calls.load(Ordering::Relaxed),
            tidy_calls: self.state.tidy_calls.load(Ordering::Relaxed),
            open_log: mutex_lock(&self.state.open_log).clone(),
            close_log: mutex_lock(&self.state.close_log).clone(),
        }
    }

    pub fn as_driver_arc(self) -> Arc<dyn LookupDriver> {
        Arc::new(self)
    }
}

impl LookupDriver for StubDriver {
    fn metadata(&self) -> &'static DriverMetadata {
        self.metadata
    }

    fn open(&self, filename: Option<&Path>) -> Result<DriverState, LookupError> {
        self.state.open_calls.fetch_add(1, Ordering::Relaxed);
        let filename = filename
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        mutex_lock(&self.state.open_log).push(filename.clone());
        if let Some(message) = rwlock_read(&self.state.open_error).clone() {
            return Err(LookupError::open_failed(message));
        }
        Ok(Box::new(StubConnection {
            filename,
            state: Arc::clone(&self.state),
        }))
    }

    fn find(
        &self,
        _state: &mut DriverState,
        _filename: Option<&Path>,
        key: &str,
        _opts: Option<&str>,
        ttl: &mut CacheTtl,
    ) -> Result<Option<String>, LookupError> {
        self.state.find_calls.fetch_add(1, Ordering::Relaxed);
        if rwlock_read(&self.state.defer_keys).contains(key) {
            return Err(LookupError::deferred(format!(
                "stub backend unavailable for \"{key}\""
            )));
        }
        if let Some(override_ttl) = rwlock_read(&self.state.ttl_overrides).get(key) {
            *ttl = *override_ttl;
        }
        Ok(rwlock_read(&self.state.entries).get(key).cloned())
    }

    fn close(&self, state: DriverState) {
        self.state.close_calls.fetch_add(1, Ordering::Relaxed);
        if let Ok(connection) = state.downcast::<StubConnection>() {
            mutex_lock(&connection.state.close_log).push(connection.filename.clone());
        }
    }

    fn tidy(&self) {
        self.state.tidy_calls.fetch_add(1, Ordering::Relaxed);
    }

    fn quote(&self, value: &str, _opts: Option<&str>) -> Option<String> {
        if !self.metadata.supports_quoting() {
            return None;
        }
        Some(format!("'{}'", value.replace('\'', "''")))
    }
}

fn rwlock_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn rwlock_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

fn mutex_lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(|e| e.into_inner())
}

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, warn};

use crate::handle_cache::{HandleCache, HandleKey, Slot};
use crate::{
    CacheTtl, DispatcherConfig, DriverIndex, FileConstraints, LookupError, Registry, TaintPolicy,
    Text, TypeSpec,
};

/// An opaque reference to a cached open resource.
///
/// Handles stay valid across LRU eviction — the resource is reopened
/// transparently on the next lookup — and are invalidated only by
/// [`Dispatcher::tidy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handle {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

/// The lookup dispatcher: one value owning the driver registry, both
/// cache levels, and the open-file budget.
///
/// The surrounding system keeps one dispatcher per worker process and
/// calls it from one thread; nothing here is shared or locked.
pub struct Dispatcher {
    registry: Registry,
    config: DispatcherConfig,
    cache: HandleCache,
    generation: u32,
}

impl Dispatcher {
    pub fn new(registry: Registry, config: DispatcherConfig) -> Self {
        Self {
            registry,
            config,
            cache: HandleCache::default(),
            generation: 0,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Convenience wrapper over [`crate::parse_type`] using the owned
    /// registry.
    pub fn parse_type(&self, text: &str) -> Result<TypeSpec, LookupError> {
        crate::parse_type(&self.registry, text)
    }

    /// Number of file-backed handles currently open.
    pub fn open_file_count(&self) -> usize {
        self.cache.open_filecount
    }

    /// Number of slots in the handle cache, evicted ones included.
    pub fn cached_handle_count(&self) -> usize {
        self.cache.len()
    }

    /// Open (or reuse) the resource behind `(driver, filename)`.
    ///
    /// Tainted filenames are refused outright. A slot whose connection
    /// was evicted is revived through the same admission path as a fresh
    /// open, and keeps the item cache it accumulated earlier: the driver
    /// identity is unchanged, so those results are still good.
    pub fn open(
        &mut self,
        driver: DriverIndex,
        filename: Option<&Text>,
        constraints: &FileConstraints,
    ) -> Result<Handle, LookupError> {
        if let Some(name) = filename {
            if name.is_tainted() {
                error!("[LOOKUP] refusing tainted filename \"{name}\"");
                return Err(LookupError::TaintedFilename(name.as_str().to_string()));
            }
        }

        let filename = filename.map(Text::as_str);
        let key = HandleKey::new(driver, filename);
        let index = match self.cache.lookup(&key) {
            Some(index) => {
                if self.cache.slots[index].connection.is_some() {
                    debug!(
                        "[CACHE] handle hit for {} \"{}\"",
                        self.registry.name(driver),
                        filename.unwrap_or("")
                    );
                    return Ok(self.handle(index));
                }
                // Evicted slot: refresh the constraints and reopen below.
                self.cache.slots[index].constraints = constraints.clone();
                index
            }
            None => self
                .cache
                .insert(key, Slot::new(driver, filename, constraints)),
        };

        self.ensure_open(index)?;
        Ok(self.handle(index))
    }

    /// Close every cached handle, run each driver's process-wide tidy
    /// hook, and drop both cache levels. Outstanding handles go stale.
    pub fn tidy(&mut self) {
        for index in 0..self.cache.slots.len() {
            if let Some(connection) = self.cache.slots[index].connection.take() {
                let driver = Arc::clone(self.registry.driver(self.cache.slots[index].driver));
                driver.close(connection);
            }
        }
        self.cache.clear();
        for driver in self.registry.drivers() {
            driver.tidy();
        }
        self.generation = self.generation.wrapping_add(1);
        debug!("[CACHE] lookup caches tidied");
    }

    /// Run a value through a driver's quote hook, marking the result as
    /// quoted for that driver. Taint is preserved: quoting makes a value
    /// safe to embed, not trusted.
    pub fn quote(
        &self,
        driver: DriverIndex,
        value: &Text,
        opts: Option<&str>,
    ) -> Result<Text, LookupError> {
        let d = self.registry.driver(driver);
        let name = d.metadata().name;
        match d.quote(value.as_str(), opts) {
            Some(quoted) => Ok(value.derive(quoted).mark_quoted_for(name)),
            None => Err(LookupError::NotSupported(format!(
                "lookup type \"{name}\" has no quoting convention"
            ))),
        }
    }

    fn handle(&self, index: usize) -> Handle {
        Handle {
            index,
            generation: self.generation,
        }
    }

    pub(crate) fn slot_checked(&self, handle: Handle) -> Result<usize, LookupError> {
        if handle.generation != self.generation || handle.index >= self.cache.slots.len() {
            return Err(LookupError::StaleHandle);
        }
        Ok(handle.index)
    }

    /// Splice a live file-backed slot to the head of the LRU chain.
    pub(crate) fn promote(&mut self, index: usize) {
        let slot = &self.cache.slots[index];
        if slot.connection.is_some() && self.registry.metadata(slot.driver).is_file_backed() {
            self.cache.promote(index);
        }
    }

    /// Make sure the slot has a live connection, reopening after LRU
    /// eviction. File-backed opens go through admission: at the cap, the
    /// least recently used handle is closed first.
    fn ensure_open(&mut self, index: usize) -> Result<(), LookupError> {
        if self.cache.slots[index].connection.is_some() {
            return Ok(());
        }

        let driver = Arc::clone(self.registry.driver(self.cache.slots[index].driver));
        let metadata = driver.metadata();

        if metadata.is_file_backed() && self.cache.open_filecount >= self.config.max_open_files {
            self.evict_lru_tail();
        }

        let filename = self.cache.slots[index].filename.clone();
        let path = filename.as_deref().map(Path::new);
        debug!(
            "[LOOKUP] opening {} \"{}\"",
            metadata.name,
            filename.as_deref().unwrap_or("")
        );
        let mut connection = driver.open(path)?;

        let constraints = self.cache.slots[index].constraints.clone();
        if let Err(err) = driver.check(&mut connection, path, &constraints) {
            driver.close(connection);
            return Err(err);
        }

        self.cache.slots[index].connection = Some(connection);
        if metadata.is_file_backed() {
            self.cache.push_front(index);
            self.cache.open_filecount += 1;
        }
        Ok(())
    }

    /// Close the least recently used file-backed handle. Its slot and
    /// item cache survive; only the connection goes. An empty chain while
    /// the count is at the cap means the cap cannot be honoured right
    /// now; that is logged and the open proceeds regardless.
    fn evict_lru_tail(&mut self) {
        match self.cache.lru_tail() {
            Some(tail) => {
                let driver = Arc::clone(self.registry.driver(self.cache.slots[tail].driver));
                debug!(
                    "[LRU] closing {} \"{}\"",
                    driver.metadata().name,
                    self.cache.slots[tail].filename.as_deref().unwrap_or("")
                );
                if let Some(connection) = self.cache.slots[tail].connection.take() {
                    driver.close(connection);
                }
                self.cache.unlink(tail);
                self.cache.open_filecount -= 1;
            }
            None => warn!(
                "[LRU] {} lookup files open but none are evictable; opening another",
                self.cache.open_filecount
            ),
        }
    }

    /// One lookup attempt against one exact key, through the item cache.
    ///
    /// An empty key misses immediately without touching the driver. The
    /// cache write policy follows the TTL the driver leaves behind:
    /// `Forever` and `Seconds` install the result (negative answers
    /// included), `InvalidateAll` drops everything cached for the handle
    /// and caches nothing.
    pub(crate) fn internal_find(
        &mut self,
        index: usize,
        filename: Option<&str>,
        key: &Text,
        cache_read: bool,
        opts: Option<&str>,
    ) -> Result<Option<String>, LookupError> {
        if key.as_str().is_empty() {
            return Ok(None);
        }

        let driver = Arc::clone(self.registry.driver(self.cache.slots[index].driver));
        let metadata = driver.metadata();

        if key.is_tainted()
            && metadata.style.is_query()
            && metadata.supports_quoting()
            && !key.is_quoted_for(metadata.name)
        {
            match self.config.taint_policy {
                TaintPolicy::Warn => warn!(
                    "[TAINT] tainted search query not quoted for {}: \"{key}\"",
                    metadata.name
                ),
                TaintPolicy::Enforce => {
                    return Err(LookupError::unquoted_key(metadata.name, key.as_str()));
                }
            }
        }

        let now = Instant::now();
        if cache_read {
            if let Some(data) = self.cache.slots[index].items.probe(key.as_str(), opts, now) {
                debug!("[CACHE] cached data used for lookup of \"{key}\"");
                return Ok(data.clone());
            }
        }

        self.ensure_open(index)?;
        debug!("[LOOKUP] internal search of \"{key}\" in {}", metadata.name);

        let mut ttl = CacheTtl::Forever;
        let slot = &mut self.cache.slots[index];
        let connection = slot
            .connection
            .as_mut()
            .expect("connection is live after ensure_open");
        let data = driver.find(
            connection,
            filename.map(Path::new),
            key.as_str(),
            opts,
            &mut ttl,
        )?;

        let slot = &mut self.cache.slots[index];
        match ttl {
            CacheTtl::InvalidateAll => {
                debug!("[CACHE] driver signalled a write; dropping cached results");
                slot.items.clear();
            }
            CacheTtl::Forever => {
                slot.items
                    .insert(key.as_str().to_string(), data.clone(), None, opts, now);
            }
            CacheTtl::Seconds(secs) => {
                slot.items.insert(
                    key.as_str().to_string(),
                    data.clone(),
                    Some(Duration::from_secs(secs)),
                    opts,
                    now,
                );
            }
        }
        Ok(data)
    }

    /// Number of results cached for a handle, for inspection and tests.
    pub fn cached_item_count(&self, handle: Handle) -> Result<usize, LookupError> {
        let index = self.slot_checked(handle)?;
        Ok(self.cache.slots[index].items.len())
    }
}

use indexmap::IndexMap;

use crate::DriverIndex;
use crate::item_cache::ItemCache;
use crate::traits::{DriverState, FileConstraints};

/// Longest resource-name prefix kept in a handle-cache key. Two resources
/// whose names agree past this length share a slot, which keeps keys
/// bounded without affecting any real filesystem path.
const MAX_KEYED_RESOURCE: usize = 254;

/// Composite key for the handle cache: driver index plus resource name.
/// The resource is the filename for file-backed drivers and empty for
/// query-style drivers, so all of a query driver's lookups share one
/// logical handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct HandleKey {
    driver: usize,
    resource: String,
}

impl HandleKey {
    pub(crate) fn new(driver: DriverIndex, resource: Option<&str>) -> Self {
        let mut resource = resource.unwrap_or("").to_string();
        if resource.len() > MAX_KEYED_RESOURCE {
            let mut end = MAX_KEYED_RESOURCE;
            while !resource.is_char_boundary(end) {
                end -= 1;
            }
            resource.truncate(end);
        }
        Self {
            driver: driver.0,
            resource,
        }
    }
}

/// One cached handle.
///
/// Slots persist until tidy: LRU pressure only drops the connection,
/// leaving the filename, constraints, and item cache in place so a later
/// lookup can reopen transparently and keep its cached results.
pub(crate) struct Slot {
    pub(crate) driver: DriverIndex,
    pub(crate) filename: Option<String>,
    pub(crate) constraints: FileConstraints,
    pub(crate) connection: Option<DriverState>,
    pub(crate) items: ItemCache,
    pub(crate) older: Option<usize>,
    pub(crate) newer: Option<usize>,
}

impl Slot {
    pub(crate) fn new(
        driver: DriverIndex,
        filename: Option<&str>,
        constraints: &FileConstraints,
    ) -> Self {
        Self {
            driver,
            filename: filename.map(str::to_string),
            constraints: constraints.clone(),
            connection: None,
            items: ItemCache::default(),
            older: None,
            newer: None,
        }
    }
}

/// Keyed store of handles plus the LRU chain over the file-backed ones.
///
/// The chain is intrusive: `older`/`newer` are slot indices into the
/// arena, the order is most-recently-used first, and its length always
/// equals `open_filecount`. A file-backed slot is linked exactly while
/// its connection is live.
#[derive(Default)]
pub(crate) struct HandleCache {
    pub(crate) slots: Vec<Slot>,
    by_key: IndexMap<HandleKey, usize>,
    lru_head: Option<usize>,
    lru_tail: Option<usize>,
    pub(crate) open_filecount: usize,
}

impl HandleCache {
    pub(crate) fn lookup(&self, key: &HandleKey) -> Option<usize> {
        self.by_key.get(key).copied()
    }

    pub(crate) fn insert(&mut self, key: HandleKey, slot: Slot) -> usize {
        let index = self.slots.len();
        self.slots.push(slot);
        self.by_key.insert(key, index);
        index
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn lru_tail(&self) -> Option<usize> {
        self.lru_tail
    }

    /// Unlink a chained slot. Callers guarantee the slot is on the chain.
    pub(crate) fn unlink(&mut self, index: usize) {
        let older = self.slots[index].older.take();
        let newer = self.slots[index].newer.take();
        match newer {
            Some(newer) => self.slots[newer].older = older,
            None => self.lru_head = older,
        }
        match older {
            Some(older) => self.slots[older].newer = newer,
            None => self.lru_tail = newer,
        }
    }

    /// Link a slot at the most-recently-used end.
    pub(crate) fn push_front(&mut self, index: usize) {
        self.slots[index].older = self.lru_head;
        self.slots[index].newer = None;
        if let Some(head) = self.lru_head {
            self.slots[head].newer = Some(index);
        }
        self.lru_head = Some(index);
        if self.lru_tail.is_none() {
            self.lru_tail = Some(index);
        }
    }

    /// Move a chained slot to the head unless it is already there.
    pub(crate) fn promote(&mut self, index: usize) {
        if self.lru_head == Some(index) {
            return;
        }
        self.unlink(index);
        self.push_front(index);
    }

    /// Drop every slot and reset the chain. Item caches go with the
    /// slots; connections must already have been closed.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.by_key.clear();
        self.lru_head = None;
        self.lru_tail = None;
        self.open_filecount = 0;
    }

    /// Chain order from most to least recently used, for inspection.
    #[cfg(test)]
    fn chain(&self) -> Vec<usize> {
        let mut order = Vec::new();
        let mut cursor = self.lru_head;
        while let Some(index) = cursor {
            order.push(index);
            cursor = self.slots[index].older;
        }
        order
    }
}

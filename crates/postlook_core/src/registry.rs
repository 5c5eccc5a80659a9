use std::sync::Arc;

use crate::{DriverMetadata, LookupDriver, LookupError};

/// Index of a driver in the registry. Only produced by
/// [`Registry::find_by_name`], so holding one implies the driver is
/// registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DriverIndex(pub(crate) usize);

/// Every lookup type name the wider system knows about, sorted. A name in
/// this list resolves to "not available in this binary" until a binary
/// actually registers the driver, which is a different failure from a
/// name nobody has heard of.
pub const KNOWN_DRIVER_NAMES: &[&str] = &[
    "cdb", "dbm", "dbmjz", "dbmnz", "dnsdb", "dsearch", "ldap", "lsearch", "mysql", "nis",
    "passwd", "pgsql", "redis", "sqlite",
];

struct RegistryEntry {
    name: &'static str,
    driver: Option<Arc<dyn LookupDriver>>,
}

/// Sorted table of lookup drivers, resolved by binary search.
///
/// Note that `str` ordering already ranks a proper prefix below any longer
/// name starting with it, so a registry holding both `dbm` and `dbmjz`
/// resolves each name exactly.
pub struct Registry {
    entries: Vec<RegistryEntry>,
}

impl Registry {
    /// A registry pre-seeded with [`KNOWN_DRIVER_NAMES`], none of them
    /// available yet.
    pub fn new() -> Self {
        Self {
            entries: KNOWN_DRIVER_NAMES
                .iter()
                .map(|&name| RegistryEntry { name, driver: None })
                .collect(),
        }
    }

    /// Register a driver under its metadata name, keeping the table
    /// sorted. Registering twice replaces the earlier driver.
    pub fn register(&mut self, driver: Arc<dyn LookupDriver>) {
        let name = driver.metadata().name;
        match self.entries.binary_search_by(|e| e.name.cmp(name)) {
            Ok(i) => self.entries[i].driver = Some(driver),
            Err(i) => self.entries.insert(
                i,
                RegistryEntry {
                    name,
                    driver: Some(driver),
                },
            ),
        }
    }

    /// Resolve a lookup type name to a driver index.
    pub fn find_by_name(&self, name: &str) -> Result<DriverIndex, LookupError> {
        match self.entries.binary_search_by(|e| e.name.cmp(name)) {
            Ok(i) => match self.entries[i].driver {
                Some(_) => Ok(DriverIndex(i)),
                None => Err(LookupError::DriverUnavailable(name.to_string())),
            },
            Err(_) => Err(LookupError::UnknownDriver(name.to_string())),
        }
    }

    /// The driver behind an index produced by [`Registry::find_by_name`].
    pub fn driver(&self, index: DriverIndex) -> &Arc<dyn LookupDriver> {
        self.entries[index.0]
            .driver
            .as_ref()
            .expect("driver indexes are only produced for registered drivers")
    }

    /// The metadata of a registered driver.
    pub fn metadata(&self, index: DriverIndex) -> &'static DriverMetadata {
        self.driver(index).metadata()
    }

    /// The registry name of a registered driver.
    pub fn name(&self, index: DriverIndex) -> &'static str {
        self.entries[index.0].name
    }

    /// All registered drivers, in name order.
    pub fn drivers(&self) -> impl Iterator<Item = &Arc<dyn LookupDriver>> {
        self.entries.iter().filter_map(|e| e.driver.as_ref())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

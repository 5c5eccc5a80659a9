use bitflags::bitflags;

bitflags! {
    /// What a lookup driver can do, declared once in its static metadata.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DriverCapabilities: u32 {
        /// The driver's tables may hold wildcarded keys, so partial
        /// matching of dotted keys makes sense.
        const PARTIAL_MATCH = 1 << 0;
        /// Opening consumes a file descriptor that counts against the
        /// open-file budget and can be reclaimed by LRU eviction.
        const FILE_BACKED = 1 << 1;
        /// The driver has a quote hook for embedding untrusted data in
        /// its query syntax.
        const QUOTING = 1 << 2;
    }
}

/// How call sites hand a driver its resource and key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStyle {
    /// `(file, key)` pairs: the search argument names a file, opened once
    /// and searched for a separately supplied key. lsearch, dbm, cdb.
    SingleKeyFile,
    /// A query string that may carry its own absolute filename, either as
    /// a leading `/path` token or a `file=` option. sqlite.
    AbsFileQuery,
    /// A self-contained query string; there is no filename and all
    /// queries share one logical handle per driver. mysql, ldap, dnsdb.
    Query,
}

impl QueryStyle {
    /// The query-style class. These drivers interpret the whole query
    /// themselves, so partial matching and star defaults are meaningless
    /// for them and are rejected at type-parse time.
    pub fn is_query(self) -> bool {
        !matches!(self, QueryStyle::SingleKeyFile)
    }
}

/// Static descriptor every driver exposes: its registry name, the shape
/// of its queries, and its capability bits. Drivers declare one of these
/// as a `static` and hand out references.
#[derive(Debug)]
pub struct DriverMetadata {
    pub name: &'static str,
    pub description: &'static str,
    pub style: QueryStyle,
    pub capabilities: DriverCapabilities,
}

impl DriverMetadata {
    pub fn is_file_backed(&self) -> bool {
        self.capabilities.contains(DriverCapabilities::FILE_BACKED)
    }

    pub fn supports_partial(&self) -> bool {
        self.capabilities.contains(DriverCapabilities::PARTIAL_MATCH)
    }

    pub fn supports_quoting(&self) -> bool {
        self.capabilities.contains(DriverCapabilities::QUOTING)
    }
}

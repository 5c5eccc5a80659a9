use thiserror::Error;

/// Lookup dispatch errors.
///
/// Every public dispatcher operation reports failures through this type.
/// A driver that cannot answer *now* (backend down, timeout) defers rather
/// than fails; `is_defer` separates that class so call sites can queue the
/// message instead of bouncing it. A clean "key not found" is not an error
/// at all — lookups return `Ok(None)` for those.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The lookup type name is not one the registry has ever heard of.
    #[error("lookup type \"{0}\" is not recognised")]
    UnknownDriver(String),

    /// The name is known but its driver is not linked into this binary.
    #[error("lookup type \"{0}\" is not available in this binary")]
    DriverUnavailable(String),

    /// The decorated lookup-type string is malformed.
    #[error("{0}")]
    BadType(String),

    /// A tainted string was offered as a lookup filename.
    #[error("tainted filename for lookup: \"{0}\"")]
    TaintedFilename(String),

    /// The driver's open hook failed.
    #[error("{0}")]
    OpenFailed(String),

    /// The opened file failed the ownership or mode checks.
    #[error("{0}")]
    CheckFailed(String),

    /// The lookup could not be completed now; try again later.
    #[error("lookup deferred: {0}")]
    Deferred(String),

    /// A tainted key reached a quoting driver without being quoted for it.
    #[error("tainted search query was not quoted for {driver}: \"{key}\"")]
    UnquotedKey { driver: String, key: String },

    /// The operation makes no sense for this driver.
    #[error("operation not supported: {0}")]
    NotSupported(String),

    /// The handle predates the last tidy and no longer refers to a slot.
    #[error("lookup handle is stale (caches have been tidied)")]
    StaleHandle,

    /// The configuration file is unreadable as a config.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LookupError {
    pub fn bad_type(msg: impl Into<String>) -> Self {
        Self::BadType(msg.into())
    }

    pub fn open_failed(msg: impl Into<String>) -> Self {
        Self::OpenFailed(msg.into())
    }

    pub fn check_failed(msg: impl Into<String>) -> Self {
        Self::CheckFailed(msg.into())
    }

    pub fn deferred(msg: impl Into<String>) -> Self {
        Self::Deferred(msg.into())
    }

    pub fn unquoted_key(driver: impl Into<String>, key: impl Into<String>) -> Self {
        Self::UnquotedKey {
            driver: driver.into(),
            key: key.into(),
        }
    }

    /// Whether this failure is a defer (temporary, retry later) as opposed
    /// to a hard failure.
    pub fn is_defer(&self) -> bool {
        matches!(self, Self::Deferred(_) | Self::UnquotedKey { .. })
    }
}

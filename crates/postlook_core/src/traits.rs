use std::any::Any;
use std::path::Path;

use crate::{DriverMetadata, LookupError};

/// Driver-supplied time-to-live for one lookup result.
///
/// The dispatcher initialises the value to `Forever` before calling the
/// find hook; the driver may lower it. `InvalidateAll` signals that the
/// lookup mutated the backing store: every result previously cached for
/// the handle is dropped and the current one is not cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTtl {
    /// Cache until tidy.
    Forever,
    /// Cache for this many seconds.
    Seconds(u64),
    /// Forget everything cached for this handle.
    InvalidateAll,
}

/// Ownership and mode requirements applied to file-backed resources at
/// open time. The defaults accept anything.
#[derive(Debug, Clone, Default)]
pub struct FileConstraints {
    /// Permission bits that must NOT be set, e.g. `0o002` to refuse
    /// world-writable files. Zero accepts any mode.
    pub mode_mask: u32,
    /// Acceptable owning uids; `None` accepts any owner.
    pub owners: Option<Vec<u32>>,
    /// Acceptable owning gids; `None` accepts any group.
    pub groups: Option<Vec<u32>>,
}

impl FileConstraints {
    /// Require that none of `mode_mask`'s bits are set on the file.
    pub fn with_mode_mask(mut self, mode_mask: u32) -> Self {
        self.mode_mask = mode_mask;
        self
    }

    /// Restrict the acceptable owning uids.
    pub fn with_owners(mut self, owners: Vec<u32>) -> Self {
        self.owners = Some(owners);
        self
    }

    /// Restrict the acceptable owning gids.
    pub fn with_groups(mut self, groups: Vec<u32>) -> Self {
        self.groups = Some(groups);
        self
    }

    /// Verify a file against the constraints.
    #[cfg(unix)]
    pub fn verify(&self, path: &Path) -> Result<(), LookupError> {
        use std::os::unix::fs::MetadataExt;

        let meta = std::fs::metadata(path)?;
        let mode = meta.mode();
        if mode & self.mode_mask != 0 {
            return Err(LookupError::check_failed(format!(
                "{}: mode {:o} has forbidden bits {:o}",
                path.display(),
                mode & 0o7777,
                mode & self.mode_mask
            )));
        }
        if let Some(owners) = &self.owners {
            if !owners.contains(&meta.uid()) {
                return Err(LookupError::check_failed(format!(
                    "{}: wrong owner (uid {})",
                    path.display(),
                    meta.uid()
                )));
            }
        }
        if let Some(groups) = &self.groups {
            if !groups.contains(&meta.gid()) {
                return Err(LookupError::check_failed(format!(
                    "{}: wrong group (gid {})",
                    path.display(),
                    meta.gid()
                )));
            }
        }
        Ok(())
    }

    /// Ownership metadata is unavailable off Unix; accept the file.
    #[cfg(not(unix))]
    pub fn verify(&self, _path: &Path) -> Result<(), LookupError> {
        Ok(())
    }
}

/// Opaque backend state returned by a driver's open hook. The dispatcher
/// stores it in the handle cache and hands it back to the driver on every
/// find; only the driver knows the concrete type.
pub type DriverState = Box<dyn Any + Send>;

/// A pluggable lookup back-end.
///
/// Drivers are registered once at startup and shared behind `Arc`; all
/// per-resource state lives in the [`DriverState`] returned by `open`.
/// The dispatcher guarantees `find` is only called on state produced by
/// this driver's own `open`.
pub trait LookupDriver: Send + Sync {
    /// Static descriptor: name, query style, capability bits.
    fn metadata(&self) -> &'static DriverMetadata;

    /// Open the backend resource. `filename` is present for single-key
    /// and absfile styles, absent for query style.
    fn open(&self, filename: Option<&Path>) -> Result<DriverState, LookupError>;

    /// Validate the opened resource. The default applies the file
    /// constraints to the filename when there is one.
    fn check(
        &self,
        state: &mut DriverState,
        filename: Option<&Path>,
        constraints: &FileConstraints,
    ) -> Result<(), LookupError> {
        let _ = state;
        match filename {
            Some(path) => constraints.verify(path),
            None => Ok(()),
        }
    }

    /// Look up one key. `Ok(Some(_))` is a match, `Ok(None)` a clean
    /// miss; any error defers the lookup. `ttl` arrives as
    /// [`CacheTtl::Forever`] and may be lowered.
    fn find(
        &self,
        state: &mut DriverState,
        filename: Option<&Path>,
        key: &str,
        opts: Option<&str>,
        ttl: &mut CacheTtl,
    ) -> Result<Option<String>, LookupError>;

    /// Release the backend state. Drivers with bookkeeping of their own
    /// override this; the default drop is enough for most.
    fn close(&self, state: DriverState) {
        drop(state);
    }

    /// Process-wide cleanup, called once per driver from tidy.
    fn tidy(&self) {}

    /// Quote a value for safe embedding in this driver's query syntax.
    /// `None` means the driver has no quoting convention; drivers that
    /// return `Some` must also set [`crate::DriverCapabilities::QUOTING`].
    fn quote(&self, value: &str, opts: Option<&str>) -> Option<String> {
        let _ = (value, opts);
        None
    }
}

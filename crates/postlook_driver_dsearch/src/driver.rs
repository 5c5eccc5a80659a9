use std::path::{Path, PathBuf};

use postlook_core::{
    CacheTtl, DriverCapabilities, DriverMetadata, DriverState, LookupDriver, LookupError,
    QueryStyle,
};

/// dsearch driver metadata.
pub static METADATA: DriverMetadata = DriverMetadata {
    name: "dsearch",
    description: "Lookup of a name in a directory",
    style: QueryStyle::SingleKeyFile,
    capabilities: DriverCapabilities::FILE_BACKED,
};

/// What kind of directory entry a `filter=` option accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryFilter {
    Any,
    File,
    Dir,
    Subdir,
}

/// Directory driver: the "file" is a directory and a key matches when the
/// directory contains an entry of that name.
///
/// Keys naming anything outside the directory (`/`, `.` and `..`) fail
/// without touching the filesystem. Options: `filter=file|dir|subdir`
/// restricts the entry type (`subdir` also excludes `.` and `..`, which
/// `dir` would accept), and `ret=full` returns the full path instead of
/// the bare name.
pub struct DsearchDriver;

impl DsearchDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DsearchDriver {
    fn default() -> Self {
        Self::new()
    }
}

struct DsearchDir {
    dir: PathBuf,
}

impl LookupDriver for DsearchDriver {
    fn metadata(&self) -> &'static DriverMetadata {
        &METADATA
    }

    fn open(&self, filename: Option<&Path>) -> Result<DriverState, LookupError> {
        let path = filename
            .ok_or_else(|| LookupError::open_failed("dsearch lookup needs a directory name"))?;
        let meta = std::fs::metadata(path).map_err(|e| {
            LookupError::open_failed(format!("failed to open {}: {e}", path.display()))
        })?;
        if !meta.is_dir() {
            return Err(LookupError::open_failed(format!(
                "{} is not a directory",
                path.display()
            )));
        }
        log::debug!("[DSEARCH] opened {}", path.display());
        Ok(Box::new(DsearchDir {
            dir: path.to_path_buf(),
        }))
    }

    fn find(
        &self,
        state: &mut DriverState,
        _filename: Option<&Path>,
        key: &str,
        opts: Option<&str>,
        _ttl: &mut CacheTtl,
    ) -> Result<Option<String>, LookupError> {
        let state = state
            .downcast_mut::<DsearchDir>()
            .ok_or_else(|| LookupError::deferred("dsearch handle is not a directory"))?;

        let (filter, ret_full) = parse_options(opts)?;

        // Only names directly inside the directory can match.
        if key.contains('/') || key.is_empty() {
            return Ok(None);
        }
        if filter == EntryFilter::Subdir && (key == "." || key == "..") {
            return Ok(None);
        }

        let candidate = state.dir.join(key);
        let meta = match std::fs::symlink_metadata(&candidate) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(LookupError::deferred(format!(
                    "error scanning {}: {e}",
                    state.dir.display()
                )));
            }
        };

        let matches = match filter {
            EntryFilter::Any => true,
            EntryFilter::File => meta.is_file(),
            EntryFilter::Dir | EntryFilter::Subdir => meta.is_dir(),
        };
        if !matches {
            return Ok(None);
        }

        Ok(Some(if ret_full {
            candidate.to_string_lossy().into_owned()
        } else {
            key.to_string()
        }))
    }
}

fn parse_options(opts: Option<&str>) -> Result<(EntryFilter, bool), LookupError> {
    let mut filter = EntryFilter::Any;
    let mut ret_full = false;
    if let Some(opts) = opts {
        for opt in opts.split(',') {
            match opt.trim() {
                "" => {}
                "ret=full" => ret_full = true,
                "ret=name" => ret_full = false,
                "filter=file" => filter = EntryFilter::File,
                "filter=dir" => filter = EntryFilter::Dir,
                "filter=subdir" => filter = EntryFilter::Subdir,
                other => {
                    return Err(LookupError::deferred(format!(
                        "unknown dsearch option \"{other}\""
                    )));
                }
            }
        }
    }
    Ok((filter, ret_full))
}

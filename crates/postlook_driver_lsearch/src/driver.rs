use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

use postlook_core::{
    CacheTtl, DriverCapabilities, DriverMetadata, DriverState, LookupDriver, LookupError,
    QueryStyle,
};

/// lsearch driver metadata.
pub static METADATA: DriverMetadata = DriverMetadata {
    name: "lsearch",
    description: "Linear search of a flat key:value file",
    style: QueryStyle::SingleKeyFile,
    capabilities: DriverCapabilities::FILE_BACKED.union(DriverCapabilities::PARTIAL_MATCH),
};

/// Flat-file driver: every lookup rewinds the file and scans it line by
/// line for a matching key.
///
/// File format: `key: value` lines. A `#` in column one starts a comment;
/// blank lines are ignored. A key containing colons or spaces can be
/// written in double quotes with `\"` and `\\` escapes. Data continues on
/// following lines that start with white space. Keys match
/// case-insensitively.
pub struct LsearchDriver;

impl LsearchDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LsearchDriver {
    fn default() -> Self {
        Self::new()
    }
}

struct LsearchFile {
    file: File,
}

impl LookupDriver for LsearchDriver {
    fn metadata(&self) -> &'static DriverMetadata {
        &METADATA
    }

    fn open(&self, filename: Option<&Path>) -> Result<DriverState, LookupError> {
        let path = filename
            .ok_or_else(|| LookupError::open_failed("lsearch lookup needs a filename"))?;
        let file = File::open(path)
            .map_err(|e| LookupError::open_failed(format!("failed to open {}: {e}", path.display())))?;
        log::debug!("[LSEARCH] opened {}", path.display());
        Ok(Box::new(LsearchFile { file }))
    }

    fn find(
        &self,
        state: &mut DriverState,
        filename: Option<&Path>,
        key: &str,
        _opts: Option<&str>,
        _ttl: &mut CacheTtl,
    ) -> Result<Option<String>, LookupError> {
        let display = filename.map(Path::display);
        let defer = |e: std::io::Error| {
            LookupError::deferred(match &display {
                Some(name) => format!("error reading {name}: {e}"),
                None => format!("error reading lsearch file: {e}"),
            })
        };

        let state = state
            .downcast_mut::<LsearchFile>()
            .ok_or_else(|| LookupError::deferred("lsearch handle is not an lsearch file"))?;
        state.file.seek(SeekFrom::Start(0)).map_err(defer)?;

        let reader = BufReader::new(&mut state.file);
        let mut found: Option<String> = None;
        for line in reader.lines() {
            let line = line.map_err(defer)?;

            if let Some(data) = &mut found {
                if line.starts_with([' ', '\t']) {
                    data.push(' ');
                    data.push_str(line.trim());
                    continue;
                }
                break;
            }

            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            // Continuation of a key we are not interested in.
            if line.starts_with([' ', '\t']) {
                continue;
            }

            if let Some(data) = match_line(&line, key) {
                found = Some(data);
            }
        }
        Ok(found.map(|data| data.trim_end().to_string()))
    }
}

/// Match one key line, returning the start of its data on success.
fn match_line(line: &str, key: &str) -> Option<String> {
    let (file_key, rest) = if let Some(quoted) = line.strip_prefix('"') {
        parse_quoted_key(quoted)?
    } else {
        let colon = line.find(':')?;
        (line[..colon].trim_end().to_string(), &line[colon + 1..])
    };

    if file_key.eq_ignore_ascii_case(key) {
        Some(rest.trim_start().to_string())
    } else {
        None
    }
}

/// Parse a double-quoted key, `quoted` starting just past the opening
/// quote. Returns the unescaped key and the text after the colon.
fn parse_quoted_key(quoted: &str) -> Option<(String, &str)> {
    let mut key = String::new();
    let mut chars = quoted.char_indices();
    let after_quote = loop {
        let (i, c) = chars.next()?;
        match c {
            '"' => break &quoted[i + 1..],
            '\\' => {
                let (_, escaped) = chars.next()?;
                key.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
            }
            other => key.push(other),
        }
    };
    let rest = after_quote.trim_start();
    let rest = rest.strip_prefix(':')?;
    Some((key, rest))
}

use crate::{DriverMetadata, QueryStyle};

/// A raw search argument split into the pieces the open and find hooks
/// want. `query` is `None` for single-key styles, where the key travels
/// separately from the file it is searched in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitArgs {
    pub filename: Option<String>,
    pub query: Option<String>,
}

/// Split a user-supplied search argument into filename and query,
/// according to the driver's style. Leading whitespace is consumed first.
///
/// For the absfile style the filename can arrive three ways: a `file=`
/// option wins, otherwise a query starting with `/` donates its leading
/// whitespace-terminated token, otherwise there is no filename at all.
pub fn split_args(metadata: &DriverMetadata, raw: &str, opts: Option<&str>) -> SplitArgs {
    let raw = raw.trim_start();
    match metadata.style {
        QueryStyle::SingleKeyFile => SplitArgs {
            filename: Some(raw.to_string()),
            query: None,
        },
        QueryStyle::Query => SplitArgs {
            filename: None,
            query: Some(raw.to_string()),
        },
        QueryStyle::AbsFileQuery => {
            if let Some(path) = opts.and_then(file_option) {
                return SplitArgs {
                    filename: Some(path),
                    query: Some(raw.to_string()),
                };
            }
            if raw.starts_with('/') {
                let (filename, query) = match raw.find(char::is_whitespace) {
                    Some(i) => (&raw[..i], raw[i..].trim_start()),
                    None => (raw, ""),
                };
                SplitArgs {
                    filename: Some(filename.to_string()),
                    query: Some(query.to_string()),
                }
            } else {
                SplitArgs {
                    filename: None,
                    query: Some(raw.to_string()),
                }
            }
        }
    }
}

fn file_option(opts: &str) -> Option<String> {
    opts.split(',')
        .find_map(|opt| opt.trim().strip_prefix("file=").map(str::to_string))
}

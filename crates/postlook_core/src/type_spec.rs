use bitflags::bitflags;

use crate::{DriverIndex, LookupError, Registry};

bitflags! {
    /// Last-resort default lookups requested by the call site.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StarFlags: u8 {
        /// Try the literal key `*` if everything else missed.
        const STAR = 1 << 0;
        /// For keys of the form `local@domain`, also try `*@domain`
        /// before falling back to `*`.
        const STAR_AT = 1 << 1;
    }
}

/// Wildcard fallback settings parsed from a `partial…` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialSpec {
    /// Minimum number of non-wild components that must survive trimming.
    pub min_components: u32,
    /// Literal prefix tried in front of each trimmed key; `*.` unless the
    /// type spec supplied its own in parentheses.
    pub affix: String,
}

/// A parsed lookup-type string.
#[derive(Debug, Clone)]
pub struct TypeSpec {
    pub driver: DriverIndex,
    pub partial: Option<PartialSpec>,
    pub star: StarFlags,
    pub opts: Option<String>,
}

impl TypeSpec {
    /// Rebuild the canonical decorated string this spec parses from.
    pub fn canonical(&self, registry: &Registry) -> String {
        let mut out = String::new();
        if let Some(p) = &self.partial {
            out.push_str("partial");
            out.push_str(&p.min_components.to_string());
            if p.affix == "*." {
                out.push('-');
            } else {
                out.push('(');
                out.push_str(&p.affix);
                out.push(')');
            }
        }
        out.push_str(registry.name(self.driver));
        if self.star.contains(StarFlags::STAR_AT) {
            out.push_str("*@");
        } else if self.star.contains(StarFlags::STAR) {
            out.push('*');
        }
        if let Some(opts) = &self.opts {
            out.push(',');
            out.push_str(opts);
        }
        out
    }
}

/// Parse a decorated lookup type such as `lsearch`, `partial2-lsearch*@`
/// or `dsearch,ret=full,filter=file`.
///
/// Grammar, left to right: an optional `partial` prefix with an optional
/// digit count and either `-` (default `*.` affix) or a parenthesised
/// affix of punctuation characters; the driver name; at most one of `*`
/// or `*@`; and everything after the first comma as raw options. Partial
/// matching and star defaults only make sense for single-key drivers and
/// are rejected for the query styles.
pub fn parse_type(registry: &Registry, text: &str) -> Result<TypeSpec, LookupError> {
    let bytes = text.as_bytes();
    let mut pos = 0;
    let mut partial = None;

    if text.starts_with("partial") {
        pos = "partial".len();
        let digits_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        let min_components = if pos > digits_start {
            text[digits_start..pos]
                .parse::<u32>()
                .map_err(|_| LookupError::bad_type(format!("unusable partial count in \"{text}\"")))?
        } else {
            2
        };
        let affix = match bytes.get(pos) {
            Some(b'-') => {
                pos += 1;
                "*.".to_string()
            }
            Some(b'(') => {
                pos += 1;
                let affix_start = pos;
                while pos < bytes.len() && bytes[pos] != b')' {
                    if !bytes[pos].is_ascii_punctuation() {
                        return Err(LookupError::bad_type(format!(
                            "non-punctuation character in lookup affix in \"{text}\""
                        )));
                    }
                    pos += 1;
                }
                if pos == bytes.len() {
                    return Err(LookupError::bad_type(format!(
                        "missing \")\" after lookup affix in \"{text}\""
                    )));
                }
                let affix = text[affix_start..pos].to_string();
                pos += 1;
                affix
            }
            _ => {
                return Err(LookupError::bad_type(format!(
                    "incomplete \"partial\" prefix in \"{text}\""
                )));
            }
        };
        partial = Some(PartialSpec {
            min_components,
            affix,
        });
    }

    let name_start = pos;
    while pos < bytes.len() && bytes[pos] != b'*' && bytes[pos] != b',' {
        pos += 1;
    }
    let name = &text[name_start..pos];
    if name.is_empty() {
        return Err(LookupError::bad_type(format!(
            "missing lookup type name in \"{text}\""
        )));
    }

    let mut star = StarFlags::empty();
    if bytes.get(pos) == Some(&b'*') {
        if bytes.get(pos + 1) == Some(&b'@') {
            star = StarFlags::STAR_AT;
            pos += 2;
        } else {
            star = StarFlags::STAR;
            pos += 1;
        }
    }

    let opts = match bytes.get(pos) {
        None => None,
        Some(b',') => Some(text[pos + 1..].to_string()),
        Some(_) => {
            return Err(LookupError::bad_type(format!(
                "unexpected characters after \"*\" in \"{text}\""
            )));
        }
    };

    let driver = registry.find_by_name(name)?;
    if registry.metadata(driver).style.is_query() {
        if partial.is_some() {
            return Err(LookupError::bad_type(format!(
                "partial matching is not available for lookup type \"{name}\""
            )));
        }
        if !star.is_empty() {
            return Err(LookupError::bad_type(format!(
                "\"*\" and \"*@\" are not available for lookup type \"{name}\""
            )));
        }
    }

    Ok(TypeSpec {
        driver,
        partial,
        star,
        opts,
    })
}

use log::debug;

use crate::dispatcher::{Dispatcher, Handle};
use crate::{ExpansionSink, LookupError, PartialSpec, StarFlags, Text};

/// Options recognised by the dispatcher itself and kept away from the
/// driver. Whatever is left is rejoined and both forwarded to the driver
/// and used as the item-cache fingerprint.
struct FindOptions {
    ret_key: bool,
    cache_read: bool,
    driver_opts: Option<String>,
}

fn preprocess_options(opts: Option<&str>) -> FindOptions {
    let mut ret_key = false;
    let mut cache_read = true;
    let mut rest: Vec<&str> = Vec::new();
    if let Some(opts) = opts {
        for opt in opts.split(',') {
            match opt {
                "ret=key" => ret_key = true,
                "cache=no_rd" => cache_read = false,
                other => rest.push(other),
            }
        }
    }
    FindOptions {
        ret_key,
        cache_read,
        driver_opts: if rest.is_empty() {
            None
        } else {
            Some(rest.join(","))
        },
    }
}

/// Push the two partial-match expansion values: the wild part with the
/// key's own taint, then the fixed part detainted (the lookup just
/// validated it). `fixed` is the trimmed remainder that actually matched.
fn push_partial_vars(sink: &mut dyn ExpansionSink, key: &Text, fixed: &str) {
    let keystr = key.as_str();
    let wild_len = if fixed.is_empty() {
        keystr.len()
    } else if fixed.len() >= keystr.len() {
        0
    } else {
        // Drop the dot joining the wild and fixed parts.
        keystr.len() - fixed.len() - 1
    };
    sink.push(key.derive(&keystr[..wild_len]));
    sink.push(Text::clean(fixed));
}

impl Dispatcher {
    /// Look up a key, falling back to partial matching and the star
    /// defaults as the call site requested.
    ///
    /// The attempts run in a fixed order — verbatim key, affix plus
    /// left-trimmed key, `*@domain`, bare `*` — and the first hit wins.
    /// A defer from any attempt aborts the whole lookup. `Ok(None)`
    /// means every enabled attempt missed.
    pub fn find(
        &mut self,
        handle: Handle,
        filename: Option<&str>,
        key: &Text,
        partial: Option<&PartialSpec>,
        star: StarFlags,
        sink: &mut dyn ExpansionSink,
        opts: Option<&str>,
    ) -> Result<Option<String>, LookupError> {
        let index = self.slot_checked(handle)?;
        if key.as_str().is_empty() {
            return Ok(None);
        }
        let options = preprocess_options(opts);
        let driver_opts = options.driver_opts.as_deref();

        self.promote(index);
        debug!(
            "[LOOKUP] search for \"{key}\" (partial {}, star {:?})",
            partial.map_or(-1, |p| p.min_components as i64),
            star
        );

        let mut data = self.internal_find(index, filename, key, options.cache_read, driver_opts)?;
        if data.is_some() {
            if partial.is_some() {
                // Matched without wildcarding: empty wild part, the whole
                // key as the fixed part.
                push_partial_vars(sink, key, key.as_str());
            }
        } else if let Some(partial) = partial {
            data = self.partial_find(
                index,
                filename,
                key,
                partial,
                options.cache_read,
                driver_opts,
                sink,
            )?;
        }

        if data.is_none() && star.contains(StarFlags::STAR_AT) {
            if let Some(at) = key.as_str().rfind('@') {
                if at >= 1 {
                    // The byte before the rightmost @ becomes *, and the
                    // lookup starts there: local@domain probes *@domain.
                    let probe = key.derive(format!("*{}", &key.as_str()[at..]));
                    data =
                        self.internal_find(index, filename, &probe, options.cache_read, driver_opts)?;
                    if data.is_some() {
                        sink.push(key.derive(&key.as_str()[..=at]));
                        sink.push(Text::clean(""));
                    }
                }
            }
        }

        if data.is_none() && star.intersects(StarFlags::STAR | StarFlags::STAR_AT) {
            let probe = Text::clean("*");
            data = self.internal_find(index, filename, &probe, options.cache_read, driver_opts)?;
            if data.is_some() {
                sink.push(key.derive(key.as_str()));
                sink.push(Text::clean(""));
            }
        }

        if options.ret_key && data.is_some() {
            data = Some(key.detaint().into_string());
        }
        Ok(data)
    }

    /// Affix-plus-trim fallback for dotted keys.
    ///
    /// First the affix in front of the whole key; then the key loses one
    /// leading component per attempt while enough dots remain; finally,
    /// with the components exhausted, the affix alone (its trailing dot
    /// stripped when it is more than just a dot).
    #[allow(clippy::too_many_arguments)]
    fn partial_find(
        &mut self,
        index: usize,
        filename: Option<&str>,
        key: &Text,
        partial: &PartialSpec,
        cache_read: bool,
        opts: Option<&str>,
        sink: &mut dyn ExpansionSink,
    ) -> Result<Option<String>, LookupError> {
        let affix = partial.affix.as_str();
        let keystr = key.as_str();

        if !affix.is_empty() {
            let probe = key.derive(format!("{affix}{keystr}"));
            let data = self.internal_find(index, filename, &probe, cache_read, opts)?;
            if data.is_some() {
                push_partial_vars(sink, key, keystr);
                return Ok(data);
            }
        }

        let mut rest = keystr;
        let mut dots = keystr.bytes().filter(|&b| b == b'.').count() as i64;
        let min = i64::from(partial.min_components);
        loop {
            let remaining = dots;
            dots -= 1;
            if remaining < min {
                break;
            }
            match rest.find('.') {
                None => {
                    if !affix.is_empty() {
                        let mut alone = affix;
                        if alone.len() > 1 && alone.ends_with('.') {
                            alone = &alone[..alone.len() - 1];
                        }
                        let probe = key.derive(alone);
                        let data = self.internal_find(index, filename, &probe, cache_read, opts)?;
                        if data.is_some() {
                            push_partial_vars(sink, key, "");
                            return Ok(data);
                        }
                    }
                    break;
                }
                Some(dot) => {
                    rest = &rest[dot + 1..];
                    let probe = key.derive(format!("{affix}{rest}"));
                    let data = self.internal_find(index, filename, &probe, cache_read, opts)?;
                    if data.is_some() {
                        push_partial_vars(sink, key, rest);
                        return Ok(data);
                    }
                }
            }
        }
        Ok(None)
    }
}

use std::fmt;
use std::ops::Deref;

/// A string that remembers where it came from.
///
/// Anything copied out of a message, a socket connection, or another
/// untrusted source is *tainted*. A tainted value must never name a file
/// to open, and may only be embedded in a query-style lookup after the
/// driver's quote hook has processed it. [`Text::detaint`] is the explicit
/// crossing of that boundary; it is called once a lookup has validated the
/// value against trusted data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Text {
    value: String,
    tainted: bool,
    quoted_for: Option<String>,
}

impl Text {
    /// A value from inside the trust boundary: configuration, the command
    /// line, or data already validated by a lookup.
    pub fn clean(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            tainted: false,
            quoted_for: None,
        }
    }

    /// A value from outside the trust boundary.
    pub fn tainted(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            tainted: true,
            quoted_for: None,
        }
    }

    /// A new value carrying the same taint as `self`. Used when a string
    /// is built out of pieces of an existing one.
    pub fn derive(&self, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            tainted: self.tainted,
            quoted_for: None,
        }
    }

    pub fn is_tainted(&self) -> bool {
        self.tainted
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_string(self) -> String {
        self.value
    }

    /// An untainted copy. Only call this after the value has been
    /// validated — typically because a lookup matched it against a
    /// trusted table.
    pub fn detaint(&self) -> Text {
        Text::clean(self.value.clone())
    }

    /// Record that `driver`'s quote hook produced this value.
    pub fn mark_quoted_for(mut self, driver: &str) -> Self {
        self.quoted_for = Some(driver.to_string());
        self
    }

    /// Whether this value has been quoted for `driver`.
    pub fn is_quoted_for(&self, driver: &str) -> bool {
        self.quoted_for.as_deref() == Some(driver)
    }
}

impl Deref for Text {
    type Target = str;

    fn deref(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::Text;

    #[test]
    fn taint_survives_derivation_but_not_detainting() {
        let key = Text::tainted("user@example.com");
        assert!(key.is_tainted());
        assert!(key.derive(format!("*.{}", key.as_str())).is_tainted());
        assert!(!key.detaint().is_tainted());
        assert_eq!(key.detaint().as_str(), "user@example.com");
    }

    #[test]
    fn quoting_marker_names_a_single_driver() {
        let key = Text::tainted("o'brien").mark_quoted_for("mysql");
        assert!(key.is_quoted_for("mysql"));
        assert!(!key.is_quoted_for("pgsql"));
        assert!(!key.derive("o''brien").is_quoted_for("mysql"));
    }
}

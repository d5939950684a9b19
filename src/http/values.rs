//! Multi-valued `key=value` maps decoded from query strings and form bodies.

use std::collections::HashMap;

use thiserror::Error;

/// Raised when a query string or form body is not valid
/// `application/x-www-form-urlencoded`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedQuery {
    #[error("invalid percent-escape at byte {position}")]
    InvalidEscape { position: usize },

    #[error("invalid semicolon separator in query")]
    Semicolon,
}

/// Decoded `key → [values]` pairs.
///
/// Repeated keys keep every value in the order they appeared.
///
/// # Examples
///
/// ```
/// use quimby::http::Values;
///
/// let values = Values::parse("tag=a&tag=b&name=x+y").unwrap();
/// assert_eq!(values.get("name"), Some("x y"));
/// assert_eq!(values.get_all("tag"), ["a", "b"]);
/// assert!(Values::parse("q=%zz").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Values {
    map: HashMap<String, Vec<String>>,
}

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strictly decodes `raw`.
    ///
    /// Every `%` must introduce two hex digits and `;` is not accepted as a
    /// pair separator. Empty pairs (`a=1&&b=2`) are skipped.
    pub fn parse(raw: &str) -> Result<Self, MalformedQuery> {
        validate(raw)?;

        let mut values = Self::new();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            values.append(key.into_owned(), value.into_owned());
        }
        Ok(values)
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.map.entry(key.into()).or_default().push(value.into());
    }

    /// Returns the first value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key)?.first().map(String::as_str)
    }

    /// Returns every value recorded for `key`, empty if absent.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.map.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

fn validate(raw: &str) -> Result<(), MalformedQuery> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b';' => return Err(MalformedQuery::Semicolon),
            b'%' => {
                let hex = bytes.get(i + 1..i + 3);
                if !hex.is_some_and(|h| h.iter().all(u8::is_ascii_hexdigit)) {
                    return Err(MalformedQuery::InvalidEscape { position: i });
                }
                i += 3;
            }
            _ => i += 1,
        }
    }
    Ok(())
}

//! Field-descriptor mapping from [`Values`] onto a model.
//!
//! Form bodies and query strings carry no type information, so each model
//! describes its fields once with a static [`Field`] table. The decoder looks
//! every field up under its snake-case key, builds a JSON object and hands it
//! to `serde_json` for the final conversion.

use std::borrow::Cow;

use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::http::Values;

#[derive(Debug, Error)]
pub enum FormError {
    #[error("field '{field}' expects {expected}, got '{value}'")]
    InvalidValue {
        field: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error(transparent)]
    Decode(#[from] serde_json::Error),
}

/// The shape of one model field as the decoder sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Boolean,
    /// A homogeneous list of strings, fed by `key` and `key[]`.
    List,
    /// Structures, maps and other shapes the flat mapper cannot fill.
    Nested,
}

/// One entry in a model's field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    name: &'static str,
    kind: FieldKind,
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub const fn integer(name: &'static str) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub const fn float(name: &'static str) -> Self {
        Self::new(name, FieldKind::Float)
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub const fn list(name: &'static str) -> Self {
        Self::new(name, FieldKind::List)
    }

    pub const fn nested(name: &'static str) -> Self {
        Self::new(name, FieldKind::Nested)
    }

    /// The serde name of the field; keys of the intermediate JSON object.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// The key looked up in the submitted values.
    pub fn key(&self) -> Cow<'static, str> {
        underscore(self.name)
    }
}

/// A model that can be read from a request body or query string.
///
/// JSON bodies only need `Deserialize`; the field table is consulted for
/// form bodies and query strings. Fields absent from the submission are
/// simply missing from the intermediate object, so models should use
/// `#[serde(default)]` where a field is optional.
///
/// # Examples
///
/// ```
/// use serde::Deserialize;
/// use quimby::context::{Field, FormModel, decode_values};
/// use quimby::http::Values;
///
/// #[derive(Debug, Default, Deserialize)]
/// #[serde(default)]
/// struct Search {
///     query: String,
///     page: i64,
///     tags: Vec<String>,
/// }
///
/// impl FormModel for Search {
///     fn fields() -> &'static [Field] {
///         const FIELDS: &[Field] = &[
///             Field::text("query"),
///             Field::integer("page"),
///             Field::list("tags"),
///         ];
///         FIELDS
///     }
/// }
///
/// let values = Values::parse("query=rust&page=2&tags[]=a&tags=b").unwrap();
/// let search: Search = decode_values(&values).unwrap();
/// assert_eq!(search.page, 2);
/// assert_eq!(search.tags, ["b", "a"]);
/// ```
pub trait FormModel: DeserializeOwned {
    fn fields() -> &'static [Field] {
        &[]
    }
}

/// Maps `values` onto `T` using its field table.
///
/// Only the first value under a key decides whether the key counts: an
/// empty first value skips a scalar field, and skips that whole group of a
/// list. Lists collect the bare key's values first and the `key[]` values
/// second. [`FieldKind::Nested`] fields are skipped.
pub fn decode_values<T: FormModel>(values: &Values) -> Result<T, FormError> {
    let mut object = Map::new();

    for field in T::fields() {
        let key = field.key();
        let value = match field.kind {
            FieldKind::Nested => continue,
            FieldKind::List => {
                let bracketed = format!("{key}[]");
                let items: Vec<Value> = [values.get_all(&key), values.get_all(&bracketed)]
                    .into_iter()
                    .filter(|group| group.first().is_some_and(|v| !v.is_empty()))
                    .flatten()
                    .map(|v| Value::String(v.clone()))
                    .collect();
                if items.is_empty() {
                    continue;
                }
                Value::Array(items)
            }
            kind => {
                let Some(raw) = values.get(&key).filter(|v| !v.is_empty()) else {
                    continue;
                };
                scalar(field.name, kind, raw)?
            }
        };
        object.insert(field.name.to_owned(), value);
    }

    Ok(serde_json::from_value(Value::Object(object))?)
}

fn scalar(field: &'static str, kind: FieldKind, raw: &str) -> Result<Value, FormError> {
    let invalid = |expected| FormError::InvalidValue {
        field,
        expected,
        value: raw.to_owned(),
    };
    let value = match kind {
        FieldKind::Integer => raw
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| invalid("an integer"))?,
        FieldKind::Float => raw
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| invalid("a number"))?,
        FieldKind::Boolean => raw
            .trim()
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|_| invalid("true or false"))?,
        _ => Value::String(raw.to_owned()),
    };
    Ok(value)
}

/// Converts a camel-case identifier to snake case.
///
/// Already-snake identifiers are returned unchanged without allocating.
/// Acronyms stay together: `HTTPServer` becomes `http_server`.
pub fn underscore(name: &str) -> Cow<'_, str> {
    if !name.bytes().any(|b| b.is_ascii_uppercase()) {
        return Cow::Borrowed(name);
    }

    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p == '_' => false,
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

//! Dynamic record value type.

use crate::encoder::to_canonical_cbor;
use std::cmp::Ordering;

/// A dynamic record value.
///
/// Records are `Map` values keyed by text field names. Floats are not
/// representable; everything a record holds must encode canonically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Null value. A missing field compares equal to this in queries.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Byte string.
    Bytes(Vec<u8>),
    /// UTF-8 text.
    Text(String),
    /// Ordered sequence.
    Array(Vec<Value>),
    /// Key/value pairs, kept in canonical key order.
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Creates a map value, sorting pairs into canonical key order.
    pub fn map(mut pairs: Vec<(Value, Value)>) -> Self {
        pairs.sort_by(|a, b| a.0.cmp_canonical(&b.0));
        Value::Map(pairs)
    }

    /// Creates an empty record.
    #[must_use]
    pub fn record() -> Self {
        Value::Map(Vec::new())
    }

    /// Builds a record from `(field, value)` pairs.
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut record = Value::record();
        for (field, value) in fields {
            record.insert(field, value);
        }
        record
    }

    /// Orders two values the way their canonical encodings order:
    /// shorter encoding first, then bytewise.
    pub fn cmp_canonical(&self, other: &Self) -> Ordering {
        let a = to_canonical_cbor(self);
        let b = to_canonical_cbor(other);
        a.len().cmp(&b.len()).then_with(|| a.cmp(&b))
    }

    /// Returns true for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for `Map`.
    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Returns the boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer, if this is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the text, if this is a text string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the elements, if this is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the pairs, if this is a map.
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Looks up a text-keyed field of a map.
    pub fn get(&self, field: &str) -> Option<&Value> {
        match self {
            Value::Map(pairs) => pairs
                .iter()
                .find(|(k, _)| k.as_text() == Some(field))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Sets a text-keyed field of a map, returning the previous value.
    ///
    /// Has no effect on non-map values.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let Value::Map(pairs) = self else {
            return None;
        };
        let key = Value::Text(field.into());
        match pairs.binary_search_by(|(k, _)| k.cmp_canonical(&key)) {
            Ok(pos) => Some(std::mem::replace(&mut pairs[pos].1, value.into())),
            Err(pos) => {
                pairs.insert(pos, (key, value.into()));
                None
            }
        }
    }

    /// Removes a text-keyed field of a map.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        let Value::Map(pairs) = self else {
            return None;
        };
        let pos = pairs.iter().position(|(k, _)| k.as_text() == Some(field))?;
        Some(pairs.remove(pos).1)
    }

    /// Iterates over the text-keyed fields of a map in canonical order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.as_map()
            .unwrap_or(&[])
            .iter()
            .filter_map(|(k, v)| k.as_text().map(|name| (name, v)))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

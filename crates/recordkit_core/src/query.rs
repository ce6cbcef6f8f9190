//! Record queries.

use recordkit_codec::{to_value, CodecError, CodecResult, Value};
use serde::Serialize;

use crate::types::Key;

/// A set of `field == value` terms, matched with OR semantics.
///
/// A record matches when **any** term holds. A query with no terms matches
/// nothing. A field the record lacks compares equal to [`Value::Null`].
///
/// ```
/// use recordkit_core::Query;
/// use recordkit_codec::Value;
///
/// let query = Query::new().eq("id", "a1").eq("text", "milk");
/// let record = Value::from_fields([("id", "zz"), ("text", "milk")]);
/// assert!(query.matches(&record));
/// assert!(!Query::new().matches(&record));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    terms: Vec<(String, Value)>,
}

impl Query {
    /// Creates a query with no terms.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a term, replacing an earlier term on the same field.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        let value = value.into();
        match self.terms.iter_mut().find(|(f, _)| *f == field) {
            Some(term) => term.1 = value,
            None => self.terms.push((field, value)),
        }
        self
    }

    /// Matches the record whose `key_path` field equals `key`.
    #[must_use]
    pub fn key(key_path: impl Into<String>, key: Key) -> Self {
        Self::new().eq(key_path, key.to_value())
    }

    /// Builds a query from a partial record, one term per serialized field.
    ///
    /// # Errors
    ///
    /// Fails if `partial` does not serialize to a map.
    pub fn from_partial<P: Serialize + ?Sized>(partial: &P) -> CodecResult<Self> {
        Self::from_value(&to_value(partial)?)
    }

    /// Builds a query from the fields of a record value.
    ///
    /// # Errors
    ///
    /// Fails if `record` is not a map.
    pub fn from_value(record: &Value) -> CodecResult<Self> {
        if !record.is_map() {
            return Err(CodecError::invalid_structure("query must be a map"));
        }
        Ok(Self {
            terms: record
                .fields()
                .map(|(f, v)| (f.to_string(), v.clone()))
                .collect(),
        })
    }

    /// Returns the terms in insertion order.
    #[must_use]
    pub fn terms(&self) -> &[(String, Value)] {
        &self.terms
    }

    /// Returns true if the query has no terms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Returns true if any term equals the record's field.
    #[must_use]
    pub fn matches(&self, record: &Value) -> bool {
        self.terms
            .iter()
            .any(|(field, expected)| record.get(field).unwrap_or(&Value::Null) == expected)
    }
}

//! Conversion between serde types and [`Value`].
//!
//! Typed records are serialized through `ciborium`'s value model and then
//! normalized into a [`Value`]: maps are re-sorted into canonical key order
//! and anything a record cannot hold (floats, tags) is rejected.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use ciborium::value::{Integer, Value as CborValue};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Converts a serializable value into a [`Value`].
///
/// # Errors
///
/// Fails if serialization fails or produces a float, a tag, or an integer
/// outside the `i64` range.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> CodecResult<Value> {
    let raw = CborValue::serialized(value).map_err(CodecError::serde)?;
    normalize(raw)
}

/// Converts a [`Value`] back into a typed value.
///
/// # Errors
///
/// Fails if the value does not match the shape `T` expects.
pub fn from_value<T: DeserializeOwned>(value: &Value) -> CodecResult<T> {
    denormalize(value)
        .deserialized()
        .map_err(CodecError::serde)
}

fn normalize(raw: CborValue) -> CodecResult<Value> {
    Ok(match raw {
        CborValue::Null => Value::Null,
        CborValue::Bool(b) => Value::Bool(b),
        CborValue::Integer(n) => {
            let wide = i128::from(n);
            Value::Integer(i64::try_from(wide).map_err(|_| CodecError::IntegerOverflow)?)
        }
        CborValue::Bytes(b) => Value::Bytes(b),
        CborValue::Text(s) => Value::Text(s),
        CborValue::Array(items) => Value::Array(
            items
                .into_iter()
                .map(normalize)
                .collect::<CodecResult<_>>()?,
        ),
        CborValue::Map(pairs) => Value::map(
            pairs
                .into_iter()
                .map(|(k, v)| Ok((normalize(k)?, normalize(v)?)))
                .collect::<CodecResult<_>>()?,
        ),
        CborValue::Float(_) => return Err(CodecError::FloatForbidden),
        CborValue::Tag(..) => {
            return Err(CodecError::invalid_structure("tagged items are not supported"))
        }
        _ => return Err(CodecError::invalid_structure("unsupported serde value")),
    })
}

fn denormalize(value: &Value) -> CborValue {
    match value {
        Value::Null => CborValue::Null,
        Value::Bool(b) => CborValue::Bool(*b),
        Value::Integer(n) => CborValue::Integer(Integer::from(*n)),
        Value::Bytes(b) => CborValue::Bytes(b.clone()),
        Value::Text(s) => CborValue::Text(s.clone()),
        Value::Array(items) => CborValue::Array(items.iter().map(denormalize).collect()),
        Value::Map(pairs) => CborValue::Map(
            pairs
                .iter()
                .map(|(k, v)| (denormalize(k), denormalize(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Task {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<u64>,
        id: String,
        text: String,
        is_done: bool,
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    struct TaskPatch {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_done: Option<bool>,
    }

    #[test]
    fn struct_becomes_sorted_record() {
        let task = Task {
            key: None,
            id: "a1".into(),
            text: "buy milk".into(),
            is_done: false,
        };

        let value = to_value(&task).unwrap();
        let names: Vec<&str> = value.fields().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["id", "text", "isDone"]);
        assert_eq!(value.get("isDone"), Some(&Value::Bool(false)));
    }

    #[test]
    fn record_back_to_struct() {
        let value = Value::from_fields([
            ("key", Value::Integer(4)),
            ("id", "a1".into()),
            ("text", "buy milk".into()),
            ("isDone", true.into()),
        ]);

        let task: Task = from_value(&value).unwrap();
        assert_eq!(task.key, Some(4));
        assert!(task.is_done);
    }

    #[test]
    fn partial_struct_only_carries_set_fields() {
        let patch = TaskPatch {
            text: None,
            is_done: Some(true),
        };
        let value = to_value(&patch).unwrap();
        assert_eq!(value, Value::from_fields([("isDone", true)]));
    }

    #[test]
    fn floats_are_rejected() {
        #[derive(Serialize)]
        struct Reading {
            celsius: f64,
        }
        assert!(matches!(
            to_value(&Reading { celsius: 21.5 }),
            Err(CodecError::FloatForbidden)
        ));
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let value = Value::from_fields([("id", 5i64)]);
        assert!(matches!(
            from_value::<Task>(&value),
            Err(CodecError::Serde { .. })
        ));
    }
}

//! # recordkit codec
//!
//! The dynamic record model and its canonical CBOR encoding.
//!
//! Every record persisted by recordkit is a [`Value::Map`] with text field
//! names. Encoding is deterministic:
//!
//! - Map keys are written in canonical order (shorter encoding first, then bytewise)
//! - Integers use their shortest head
//! - Lengths are always definite
//! - Floats are not representable
//!
//! Typed records cross into the dynamic model with [`to_value`] and back
//! with [`from_value`].
//!
//! ```
//! use recordkit_codec::{from_cbor, to_canonical_cbor, Value};
//!
//! let record = Value::from_fields([("text", Value::from("buy milk")), ("isDone", false.into())]);
//! let bytes = to_canonical_cbor(&record);
//! assert_eq!(from_cbor(&bytes).unwrap(), record);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bridge;
mod decoder;
mod encoder;
mod error;
mod value;

pub use bridge::{from_value, to_value};
pub use decoder::{from_cbor, CanonicalDecoder};
pub use encoder::{to_canonical_cbor, CanonicalEncoder};
pub use error::{CodecError, CodecResult};
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Integer),
            "[a-z ]{0,12}".prop_map(Value::Text),
            proptest::collection::vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
        ]
    }

    fn record() -> impl Strategy<Value = Value> {
        proptest::collection::btree_map("[a-zA-Z]{1,8}", leaf(), 0..8)
            .prop_map(|fields| Value::from_fields(fields))
    }

    proptest! {
        #[test]
        fn records_decode_to_themselves(value in record()) {
            let bytes = to_canonical_cbor(&value);
            prop_assert_eq!(from_cbor(&bytes).unwrap(), value);
        }

        #[test]
        fn encoding_ignores_field_insertion_order(value in record()) {
            let mut reversed = Value::record();
            for (name, field) in value.fields().collect::<Vec<_>>().into_iter().rev() {
                reversed.insert(name, field.clone());
            }
            prop_assert_eq!(to_canonical_cbor(&reversed), to_canonical_cbor(&value));
        }
    }
}

//! Canonical CBOR encoder.

use crate::value::Value;

/// Encodes a value to canonical CBOR (RFC 8949 §4.2.1).
///
/// Integers use their shortest form, lengths are always definite and map
/// entries are written in canonical key order regardless of the order they
/// are held in. Every `Value` is encodable, so this cannot fail.
#[must_use]
pub fn to_canonical_cbor(value: &Value) -> Vec<u8> {
    let mut encoder = CanonicalEncoder::new();
    encoder.encode(value);
    encoder.into_bytes()
}

/// An append-only canonical CBOR writer.
#[derive(Debug, Default)]
pub struct CanonicalEncoder {
    buf: Vec<u8>,
}

impl CanonicalEncoder {
    /// Creates an empty encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one value.
    pub fn encode(&mut self, value: &Value) {
        match value {
            Value::Null => self.buf.push(0xf6),
            Value::Bool(false) => self.buf.push(0xf4),
            Value::Bool(true) => self.buf.push(0xf5),
            #[allow(clippy::cast_sign_loss)]
            Value::Integer(n) if *n >= 0 => self.head(0, *n as u64),
            // -1 - n, which cannot overflow for negative n
            #[allow(clippy::cast_sign_loss)]
            Value::Integer(n) => self.head(1, (-1 - *n) as u64),
            Value::Bytes(b) => {
                self.head(2, b.len() as u64);
                self.buf.extend_from_slice(b);
            }
            Value::Text(s) => {
                self.head(3, s.len() as u64);
                self.buf.extend_from_slice(s.as_bytes());
            }
            Value::Array(items) => {
                self.head(4, items.len() as u64);
                for item in items {
                    self.encode(item);
                }
            }
            Value::Map(pairs) => self.map(pairs),
        }
    }

    /// Consumes the encoder, returning the bytes written so far.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    #[allow(clippy::cast_possible_truncation)]
    fn head(&mut self, major: u8, arg: u64) {
        let mt = major << 5;
        if arg < 24 {
            self.buf.push(mt | arg as u8);
        } else if arg <= u64::from(u8::MAX) {
            self.buf.extend_from_slice(&[mt | 24, arg as u8]);
        } else if arg <= u64::from(u16::MAX) {
            self.buf.push(mt | 25);
            self.buf.extend_from_slice(&(arg as u16).to_be_bytes());
        } else if arg <= u64::from(u32::MAX) {
            self.buf.push(mt | 26);
            self.buf.extend_from_slice(&(arg as u32).to_be_bytes());
        } else {
            self.buf.push(mt | 27);
            self.buf.extend_from_slice(&arg.to_be_bytes());
        }
    }

    fn map(&mut self, pairs: &[(Value, Value)]) {
        let mut entries: Vec<(Vec<u8>, &Value)> = pairs
            .iter()
            .map(|(k, v)| (to_canonical_cbor(k), v))
            .collect();
        entries.sort_by(|a, b| a.0.len().cmp(&b.0.len()).then_with(|| a.0.cmp(&b.0)));

        self.head(5, entries.len() as u64);
        for (key, value) in entries {
            self.buf.extend_from_slice(&key);
            self.encode(value);
        }
    }
}

//! Commit log entries and replay.
//!
//! Every committed write transaction is one framed entry:
//!
//! ```text
//! | magic "RKLG" (4) | payload len u32 LE (4) | payload | crc32 LE (4) |
//! ```
//!
//! The payload is the canonical CBOR encoding of an array of operations.
//! The checksum covers magic, length and payload.

use crate::engine::state::{DatabaseState, StoreData};
use crate::error::{CoreError, CoreResult};
use crate::types::{Key, StoreOptions};
use recordkit_codec::{from_cbor, to_canonical_cbor, Value};

/// Magic bytes opening every log entry.
pub const LOG_MAGIC: [u8; 4] = *b"RKLG";

const HEADER_LEN: usize = 8;
const TRAILER_LEN: usize = 4;

/// Kind of a logged operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum OpKind {
    SetVersion = 1,
    CreateStore = 2,
    Put = 3,
    Delete = 4,
    Clear = 5,
}

impl OpKind {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::SetVersion),
            2 => Some(Self::CreateStore),
            3 => Some(Self::Put),
            4 => Some(Self::Delete),
            5 => Some(Self::Clear),
            _ => None,
        }
    }
}

/// One change made by a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LogOp {
    SetVersion(u64),
    CreateStore { name: String, options: StoreOptions },
    Put { store: String, key: Key, value: Value },
    Delete { store: String, key: Key },
    Clear { store: String },
}

impl LogOp {
    fn kind(&self) -> OpKind {
        match self {
            Self::SetVersion(_) => OpKind::SetVersion,
            Self::CreateStore { .. } => OpKind::CreateStore,
            Self::Put { .. } => OpKind::Put,
            Self::Delete { .. } => OpKind::Delete,
            Self::Clear { .. } => OpKind::Clear,
        }
    }

    fn to_value(&self) -> Value {
        let mut items = vec![Value::Integer(self.kind() as i64)];
        match self {
            #[allow(clippy::cast_possible_wrap)]
            Self::SetVersion(version) => items.push(Value::Integer(*version as i64)),
            Self::CreateStore { name, options } => {
                items.push(Value::from(name.as_str()));
                items.push(Value::from(options.key_path.as_str()));
                items.push(Value::Bool(options.auto_increment));
            }
            Self::Put { store, key, value } => {
                items.push(Value::from(store.as_str()));
                items.push(key.to_value());
                items.push(value.clone());
            }
            Self::Delete { store, key } => {
                items.push(Value::from(store.as_str()));
                items.push(key.to_value());
            }
            Self::Clear { store } => items.push(Value::from(store.as_str())),
        }
        Value::Array(items)
    }

    fn from_value(value: &Value) -> CoreResult<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| CoreError::log_corruption("operation is not an array"))?;
        let kind = items
            .first()
            .and_then(Value::as_integer)
            .and_then(|n| u8::try_from(n).ok())
            .and_then(OpKind::from_byte)
            .ok_or_else(|| CoreError::log_corruption("unknown operation kind"))?;

        let text = |i: usize| {
            items
                .get(i)
                .and_then(Value::as_text)
                .map(str::to_string)
                .ok_or_else(|| CoreError::log_corruption(format!("operation field {i} is not text")))
        };
        let key = |i: usize| {
            items
                .get(i)
                .and_then(Key::from_value)
                .ok_or_else(|| CoreError::log_corruption(format!("operation field {i} is not a key")))
        };

        Ok(match kind {
            OpKind::SetVersion => Self::SetVersion(key(1)?.as_u64()),
            OpKind::CreateStore => Self::CreateStore {
                name: text(1)?,
                options: StoreOptions {
                    key_path: text(2)?,
                    auto_increment: items
                        .get(3)
                        .and_then(Value::as_bool)
                        .ok_or_else(|| CoreError::log_corruption("missing auto_increment flag"))?,
                },
            },
            OpKind::Put => Self::Put {
                store: text(1)?,
                key: key(2)?,
                value: items
                    .get(3)
                    .cloned()
                    .ok_or_else(|| CoreError::log_corruption("put without a value"))?,
            },
            OpKind::Delete => Self::Delete {
                store: text(1)?,
                key: key(2)?,
            },
            OpKind::Clear => Self::Clear { store: text(1)? },
        })
    }

    /// Applies this operation to `state`.
    pub(crate) fn apply(self, state: &mut DatabaseState) -> CoreResult<()> {
        match self {
            Self::SetVersion(version) => state.version = version,
            Self::CreateStore { name, options } => {
                state.stores.insert(name, StoreData::new(options));
            }
            Self::Put { store, key, value } => {
                store_mut(state, &store)?.insert(key, value);
            }
            Self::Delete { store, key } => {
                store_mut(state, &store)?.records.remove(&key);
            }
            Self::Clear { store } => store_mut(state, &store)?.records.clear(),
        }
        Ok(())
    }
}

fn store_mut<'a>(state: &'a mut DatabaseState, name: &str) -> CoreResult<&'a mut StoreData> {
    state
        .stores
        .get_mut(name)
        .ok_or_else(|| CoreError::log_corruption(format!("operation on unknown store {name}")))
}

fn checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Frames `ops` as one log entry.
pub(crate) fn encode_entry(ops: &[LogOp]) -> CoreResult<Vec<u8>> {
    let payload = to_canonical_cbor(&Value::Array(ops.iter().map(LogOp::to_value).collect()));
    let len = u32::try_from(payload.len())
        .map_err(|_| CoreError::data("transaction too large for one log entry"))?;

    let mut entry = Vec::with_capacity(HEADER_LEN + payload.len() + TRAILER_LEN);
    entry.extend_from_slice(&LOG_MAGIC);
    entry.extend_from_slice(&len.to_le_bytes());
    entry.extend_from_slice(&payload);
    let crc = checksum(&entry);
    entry.extend_from_slice(&crc.to_le_bytes());
    Ok(entry)
}

/// Result of replaying a log.
#[derive(Debug)]
pub(crate) struct Replay {
    pub(crate) state: DatabaseState,
    /// Number of committed entries applied.
    pub(crate) entries: usize,
    /// Length of the valid prefix; anything after it is a torn write.
    pub(crate) valid_len: u64,
}

/// Rebuilds a database from its log.
///
/// A final entry that is cut short or fails its checksum is treated as an
/// interrupted commit and dropped. Damage anywhere before the final entry is
/// an error.
pub(crate) fn replay(data: &[u8]) -> CoreResult<Replay> {
    let mut state = DatabaseState::default();
    let mut pos = 0usize;
    let mut entries = 0usize;

    while pos < data.len() {
        let rest = &data[pos..];
        if rest.len() < HEADER_LEN {
            break;
        }
        if rest[..4] != LOG_MAGIC {
            return Err(CoreError::log_corruption(format!("bad magic at offset {pos}")));
        }
        let len = u32::from_le_bytes([rest[4], rest[5], rest[6], rest[7]]) as usize;
        let total = HEADER_LEN + len + TRAILER_LEN;
        if rest.len() < total {
            break;
        }

        let body = &rest[..HEADER_LEN + len];
        let stored = &rest[HEADER_LEN + len..total];
        let stored = u32::from_le_bytes([stored[0], stored[1], stored[2], stored[3]]);
        if checksum(body) != stored {
            if pos + total == data.len() {
                break;
            }
            return Err(CoreError::log_corruption(format!(
                "checksum mismatch at offset {pos}"
            )));
        }

        let payload = from_cbor(&body[HEADER_LEN..])?;
        let ops = payload
            .as_array()
            .ok_or_else(|| CoreError::log_corruption("entry payload is not an array"))?;
        for op in ops {
            LogOp::from_value(op)?.apply(&mut state)?;
        }

        pos += total;
        entries += 1;
    }

    Ok(Replay {
        state,
        entries,
        valid_len: pos as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creation() -> Vec<LogOp> {
        vec![
            LogOp::CreateStore {
                name: "Todo".into(),
                options: StoreOptions::auto_increment("key"),
            },
            LogOp::SetVersion(1),
        ]
    }

    fn put(key: u64, text: &str) -> LogOp {
        LogOp::Put {
            store: "Todo".into(),
            key: Key::new(key),
            value: Value::from_fields([("key", Value::Integer(key as i64)), ("text", text.into())]),
        }
    }

    fn log_of(entries: &[Vec<LogOp>]) -> Vec<u8> {
        entries
            .iter()
            .flat_map(|ops| encode_entry(ops).unwrap())
            .collect()
    }

    #[test]
    fn replay_rebuilds_state() {
        let data = log_of(&[creation(), vec![put(1, "a"), put(2, "b")], vec![LogOp::Delete {
            store: "Todo".into(),
            key: Key::new(1),
        }]]);

        let replay = replay(&data).unwrap();
        assert_eq!(replay.entries, 3);
        assert_eq!(replay.valid_len, data.len() as u64);
        assert_eq!(replay.state.version, 1);

        let todo = &replay.state.stores["Todo"];
        assert_eq!(todo.records.len(), 1);
        assert!(todo.records.contains_key(&Key::new(2)));
        // Generator survives deletion of the highest key.
        assert_eq!(todo.next_key, 3);
    }

    #[test]
    fn clear_keeps_generator() {
        let data = log_of(&[creation(), vec![put(5, "a")], vec![LogOp::Clear {
            store: "Todo".into(),
        }]]);
        let state = replay(&data).unwrap().state;
        assert!(state.stores["Todo"].records.is_empty());
        assert_eq!(state.stores["Todo"].next_key, 6);
    }

    #[test]
    fn empty_log() {
        let replay = replay(&[]).unwrap();
        assert_eq!(replay.entries, 0);
        assert_eq!(replay.state.version, 0);
    }

    #[test]
    fn torn_tail_is_dropped() {
        let mut data = log_of(&[creation()]);
        let valid = data.len();
        let tail = encode_entry(&[put(1, "a")]).unwrap();
        data.extend_from_slice(&tail[..tail.len() - 3]);

        let replay = replay(&data).unwrap();
        assert_eq!(replay.entries, 1);
        assert_eq!(replay.valid_len, valid as u64);
        assert!(replay.state.stores["Todo"].records.is_empty());
    }

    #[test]
    fn bad_checksum_on_last_entry_is_dropped() {
        let mut data = log_of(&[creation(), vec![put(1, "a")]]);
        let last = data.len() - 1;
        data[last] ^= 0xff;

        let replay = replay(&data).unwrap();
        assert_eq!(replay.entries, 1);
    }

    #[test]
    fn damage_before_the_tail_is_an_error() {
        let mut data = log_of(&[creation(), vec![put(1, "a")]]);
        data[HEADER_LEN] ^= 0xff;
        assert!(matches!(
            replay(&data),
            Err(CoreError::LogCorruption { .. })
        ));
    }

    #[test]
    fn bad_magic_is_an_error() {
        let mut data = log_of(&[creation()]);
        data[0] = b'X';
        assert!(matches!(
            replay(&data),
            Err(CoreError::LogCorruption { .. })
        ));
    }

    #[test]
    fn op_values_decode_back() {
        for op in creation().into_iter().chain([put(7, "x"), LogOp::Clear {
            store: "Todo".into(),
        }]) {
            assert_eq!(LogOp::from_value(&op.to_value()).unwrap(), op);
        }
    }
}

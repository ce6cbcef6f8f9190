//! In-memory image of a database.

use crate::error::{CoreError, CoreResult};
use crate::types::{Key, StoreOptions};
use recordkit_codec::Value;
use std::collections::BTreeMap;

/// Largest key the generator hands out; keys are stored as `i64` fields.
#[allow(clippy::cast_sign_loss)]
const MAX_GENERATED_KEY: u64 = i64::MAX as u64;

/// Records and key generator of a single object store.
#[derive(Debug, Clone)]
pub(crate) struct StoreData {
    pub(crate) options: StoreOptions,
    pub(crate) records: BTreeMap<Key, Value>,
    /// Next key the generator will hand out.
    pub(crate) next_key: u64,
}

impl StoreData {
    pub(crate) fn new(options: StoreOptions) -> Self {
        Self {
            options,
            records: BTreeMap::new(),
            next_key: 1,
        }
    }

    /// Resolves the key of `value`, generating and stamping one if the
    /// store allows it.
    pub(crate) fn key_for(&self, value: &mut Value) -> CoreResult<Key> {
        if !value.is_map() {
            return Err(CoreError::data("records must be maps"));
        }
        let path = &self.options.key_path;
        match value.get(path) {
            Some(field) if !field.is_null() => Key::from_value(field)
                .filter(|key| key.as_u64() >= 1)
                .ok_or_else(|| {
                    CoreError::data(format!("key field {path} must be a positive integer"))
                }),
            _ if self.options.auto_increment => {
                if self.next_key > MAX_GENERATED_KEY {
                    return Err(CoreError::Constraint {
                        message: "key generator exhausted".to_string(),
                    });
                }
                let key = Key::new(self.next_key);
                value.insert(path.clone(), key.to_value());
                Ok(key)
            }
            _ => Err(CoreError::data(format!(
                "record has no key field {path} and the store does not generate keys"
            ))),
        }
    }

    /// Stores `value` under `key`, advancing the generator past it.
    pub(crate) fn insert(&mut self, key: Key, value: Value) {
        if self.options.auto_increment && key.as_u64() >= self.next_key {
            self.next_key = key.as_u64().saturating_add(1);
        }
        self.records.insert(key, value);
    }
}

/// Version and object stores of one database.
#[derive(Debug, Default)]
pub(crate) struct DatabaseState {
    pub(crate) version: u64,
    pub(crate) stores: BTreeMap<String, StoreData>,
}

impl DatabaseState {
    pub(crate) fn store_names(&self) -> Vec<String> {
        self.stores.keys().cloned().collect()
    }
}

//! Records of the task list.

use recordkit_core::SchemaConfig;
use serde::{Deserialize, Serialize};

/// Collection holding task groups.
pub const GROUP: &str = "Group";

/// Collection holding tasks.
pub const TODO: &str = "Todo";

/// Schema of the task-list database, with environment overrides applied.
pub fn schema() -> SchemaConfig {
    SchemaConfig::new()
        .collection(GROUP)
        .collection(TODO)
        .from_env()
}

/// A task.
///
/// `key` is assigned by the store; `id` is generated here and is what the
/// command line refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<u64>,
    pub id: String,
    pub text: String,
    pub is_done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<u64>,
}

impl Todo {
    /// Creates an open task with a fresh id.
    pub fn new(text: impl Into<String>, group_id: Option<u64>) -> Self {
        Self {
            key: None,
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            is_done: false,
            group_id,
        }
    }
}

/// Fields of a task that an update may change.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_done: Option<bool>,
}

/// A named group of tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<u64>,
    pub id: String,
    pub name: String,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            key: None,
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
        }
    }
}

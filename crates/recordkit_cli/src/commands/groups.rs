//! Group commands.

use super::{CommandError, CommandResult, Output};
use crate::model::{Group, GROUP};
use recordkit_core::Store;

/// Lists groups.
pub async fn list(store: &Store, output: Output) -> CommandResult {
    let groups = store.collection::<Group>(GROUP).find_all(None).await;
    output.render(&groups, || {
        if groups.is_empty() {
            return "no groups".to_string();
        }
        groups
            .iter()
            .map(|g| format!("{:>4}  {}", g.key.unwrap_or_default(), g.name))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

/// Adds a group.
pub async fn add(store: &Store, name: &str, output: Output) -> CommandResult {
    let added = store
        .collection::<Group>(GROUP)
        .add(&Group::new(name))
        .await
        .ok_or(CommandError::NotSaved { kind: "group" })?;
    output.render(&added, || {
        format!("added group {} with key {}", added.name, added.key.unwrap_or_default())
    })
}

//! Task commands.

use super::{CommandError, CommandResult, Output};
use crate::model::{Group, Todo, TodoPatch, GROUP, TODO};
use recordkit_core::{Key, Query, Store};

/// Lists tasks, optionally only those in one group.
pub async fn list(store: &Store, group: Option<u64>, output: Output) -> CommandResult {
    let todos = store.collection::<Todo>(TODO);
    let found = match group {
        Some(group) => {
            todos
                .find_all(Some(&Query::new().eq("groupId", Key::new(group).to_value())))
                .await
        }
        None => todos.find_all(None).await,
    };

    output.render(&found, || {
        if found.is_empty() {
            return "no tasks".to_string();
        }
        found.iter().map(line).collect::<Vec<_>>().join("\n")
    })
}

/// Adds a task.
pub async fn add(store: &Store, text: &str, group: Option<u64>, output: Output) -> CommandResult {
    if let Some(group) = group {
        let groups = store.collection::<Group>(GROUP);
        if groups.find(&Query::key("key", Key::new(group))).await.is_none() {
            return Err(CommandError::NotFound {
                kind: "group",
                id: group.to_string(),
            });
        }
    }

    let added = store
        .collection::<Todo>(TODO)
        .add(&Todo::new(text, group))
        .await
        .ok_or(CommandError::NotSaved { kind: "task" })?;
    tracing::info!(id = %added.id, "task added");
    output.render(&added, || line(&added))
}

/// Marks a task done or not done.
pub async fn set_done(store: &Store, id: &str, done: bool, output: Output) -> CommandResult {
    let patch = TodoPatch {
        is_done: Some(done),
        ..TodoPatch::default()
    };
    update(store, id, &patch, output).await
}

/// Replaces a task's text.
pub async fn edit(store: &Store, id: &str, text: &str, output: Output) -> CommandResult {
    let patch = TodoPatch {
        text: Some(text.to_string()),
        ..TodoPatch::default()
    };
    update(store, id, &patch, output).await
}

/// Removes a task.
pub async fn remove(store: &Store, id: &str, output: Output) -> CommandResult {
    let key = store
        .collection::<Todo>(TODO)
        .remove(&Query::new().eq("id", id))
        .await;
    if key == 0 {
        return Err(not_found(id));
    }
    output.render(&serde_json::json!({ "removed": key }), || format!("removed {id}"))
}

async fn update(store: &Store, id: &str, patch: &TodoPatch, output: Output) -> CommandResult {
    let updated = store
        .collection::<Todo>(TODO)
        .update(&Query::new().eq("id", id), patch)
        .await
        .ok_or_else(|| not_found(id))?;
    output.render(&updated, || line(&updated))
}

fn not_found(id: &str) -> CommandError {
    CommandError::NotFound {
        kind: "task",
        id: id.to_string(),
    }
}

fn line(todo: &Todo) -> String {
    let mark = if todo.is_done { "x" } else { " " };
    format!("[{mark}] {}  ({})", todo.text, todo.id)
}

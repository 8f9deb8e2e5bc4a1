//! Structured-data inspector. Holds one JSON tree edited by path.
//!
//! A path is a list of object keys and array indices:
//! `["players", 0, "score"]`. `set` creates missing intermediate objects,
//! array indices must already exist (or equal the length, which appends).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{action_options, commit, unknown_action, update_action, ComponentState};
use crate::registry::SpawnError;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VizState {
    pub root: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

#[derive(Debug, Deserialize)]
struct PathValue {
    path: Vec<PathSegment>,
    value: Value,
}

#[derive(Debug, Deserialize)]
struct PathOnly {
    path: Vec<PathSegment>,
}

pub fn initial_state(_id: &str, _payload: &Value, _parent: &str) -> Result<ComponentState, SpawnError> {
    Ok(ComponentState::Viz(VizState::default()))
}

/// Walk `path`, creating objects for missing keys when `create` is set.
fn walk_mut<'a>(mut node: &'a mut Value, path: &[PathSegment], create: bool) -> Option<&'a mut Value> {
    for segment in path {
        if create && node.is_null() && matches!(segment, PathSegment::Key(_)) {
            *node = Value::Object(Map::new());
        }
        node = match (segment, node) {
            (PathSegment::Key(key), Value::Object(map)) => {
                if create {
                    map.entry(key.clone()).or_insert(Value::Null)
                } else {
                    map.get_mut(key)?
                }
            }
            (PathSegment::Index(index), Value::Array(items)) => items.get_mut(*index)?,
            _ => return None,
        };
    }
    Some(node)
}

fn set(root: &mut Value, path: &[PathSegment], value: Value) -> Option<()> {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return Some(());
    };
    let parent = walk_mut(root, parents, true)?;
    if parent.is_null() && matches!(last, PathSegment::Key(_)) {
        *parent = Value::Object(Map::new());
    }
    match (last, parent) {
        (PathSegment::Key(key), Value::Object(map)) => {
            map.insert(key.clone(), value);
        }
        (PathSegment::Index(index), Value::Array(items)) if *index < items.len() => {
            items[*index] = value;
        }
        (PathSegment::Index(index), Value::Array(items)) if *index == items.len() => {
            items.push(value);
        }
        _ => return None,
    }
    Some(())
}

fn unset(root: &mut Value, path: &[PathSegment]) -> Option<()> {
    let Some((last, parents)) = path.split_last() else {
        *root = Value::Null;
        return Some(());
    };
    match (last, walk_mut(root, parents, false)?) {
        (PathSegment::Key(key), Value::Object(map)) => map.remove(key).map(|_| ()),
        (PathSegment::Index(index), Value::Array(items)) if *index < items.len() => {
            items.remove(*index);
            Some(())
        }
        _ => None,
    }
}

fn append(root: &mut Value, path: &[PathSegment], value: Value) -> Option<()> {
    let target = walk_mut(root, path, true)?;
    if target.is_null() {
        *target = Value::Array(Vec::new());
    }
    match target {
        Value::Array(items) => {
            items.push(value);
            Some(())
        }
        _ => None,
    }
}

pub fn update_state(current: &Arc<ComponentState>, payload: &Value, id: &str) -> Arc<ComponentState> {
    let ComponentState::Viz(viz) = current.as_ref() else {
        return current.clone();
    };
    let Some(update) = update_action(payload, id) else {
        return current.clone();
    };

    let mut root = viz.root.clone();
    let applied = match update.action.as_str() {
        "set" => action_options::<PathValue>(&update, id).and_then(|o| set(&mut root, &o.path, o.value)),
        "unset" => action_options::<PathOnly>(&update, id).and_then(|o| unset(&mut root, &o.path)),
        "append" => action_options::<PathValue>(&update, id).and_then(|o| append(&mut root, &o.path, o.value)),
        _ => {
            unknown_action("viz", &update, id);
            return current.clone();
        }
    };

    if applied.is_none() {
        log::warn!("Ignoring viz `{}` for `{id}`: path does not resolve", update.action);
    }
    let next = applied.filter(|_| root != viz.root).map(|_| VizState { root });
    commit(current, next, ComponentState::Viz)
}

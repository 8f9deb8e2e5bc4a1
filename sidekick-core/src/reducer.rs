//! Pure transitions `(Arc<AppState>, Message) -> Arc<AppState>`.
//!
//! ```text
//!   system/announce ──► announce()      heroStatus only
//!   global/clearAll ──► clear_all()     keeps heroStatus
//!   <type>/spawn    ──► spawn()         insert + attach to parent
//!   <type>/update   ──► update()        ──changeParent──► change_parent()
//!                                       └─otherwise────► definition.update_state
//!   <type>/remove   ──► remove()        breadth-first subtree removal
//!   <type>/event|error                  outbound only, ignored here
//! ```
//!
//! No transition mutates its input or returns an error. Invalid messages are
//! logged and the input `Arc` is returned, so `Arc::ptr_eq(&old, &new)` is a
//! complete change test.

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde_json::Value;

use crate::protocol::{AnnouncePayload, ChangeParentOptions, Message, MessageKind, PeerRole, UpdateAction};
use crate::registry::ComponentRegistry;
use crate::state::{AppState, ComponentInstance, ROOT_ID};

/// Apply one decoded message.
pub fn reduce(registry: &ComponentRegistry, state: &Arc<AppState>, message: &Message) -> Arc<AppState> {
    if let Err(e) = message.validate() {
        log::warn!("Dropping invalid {} `{}` message: {e}", message.component, message.kind);
        return state.clone();
    }

    match message.kind {
        MessageKind::Announce => match message.announce_payload() {
            Ok(announce) => self::announce(state, &announce),
            Err(e) => {
                log::warn!("Dropping announce with bad payload: {e}");
                state.clone()
            }
        },
        MessageKind::ClearAll => clear_all(state),
        MessageKind::Spawn | MessageKind::Update | MessageKind::Remove => {
            // validate() guarantees a target on control messages
            let Some(target) = message.target.as_deref() else {
                return state.clone();
            };
            let payload = message.payload_or_null();
            match message.kind {
                MessageKind::Spawn => spawn(registry, state, &message.component, target, payload),
                MessageKind::Update => update(registry, state, &message.component, target, payload),
                _ => remove(state, target),
            }
        }
        MessageKind::Event | MessageKind::Error => {
            log::trace!("Ignoring outbound {} from {:?}", message.kind, message.src);
            state.clone()
        }
    }
}

/// Create instance `target` of type `kind`.
///
/// The parent comes from `payload.parent` (default: root) and must be the
/// root or an existing container.
pub fn spawn(
    registry: &ComponentRegistry,
    state: &Arc<AppState>,
    kind: &str,
    target: &str,
    payload: &Value,
) -> Arc<AppState> {
    if target.is_empty() || target == ROOT_ID {
        log::warn!("Spawn rejected: `{target}` is not a valid instance id");
        return state.clone();
    }
    if state.contains(target) {
        log::warn!("Spawn rejected: instance `{target}` already exists");
        return state.clone();
    }
    let Some(definition) = registry.get(kind) else {
        log::warn!("Spawn rejected: unknown component type `{kind}` for `{target}`");
        return state.clone();
    };

    let parent_id = match payload.get("parent") {
        None | Some(Value::Null) => ROOT_ID,
        Some(Value::String(parent)) => parent.as_str(),
        Some(other) => {
            log::warn!("Spawn rejected: `{target}` has a non-string parent {other}");
            return state.clone();
        }
    };
    if !state.is_container(parent_id) {
        log::warn!("Spawn rejected: parent `{parent_id}` of `{target}` is not a container");
        return state.clone();
    }

    let initial = match (definition.initial_state)(target, payload, parent_id) {
        Ok(initial) => initial,
        Err(e) => {
            log::warn!("Spawn of {kind} `{target}` failed: {e}");
            return state.clone();
        }
    };

    let mut next = AppState::clone(state);
    next.components_by_id.insert(
        target.to_string(),
        Arc::new(ComponentInstance {
            id: target.to_string(),
            kind: kind.to_string(),
            parent_id: parent_id.to_string(),
            state: Arc::new(initial),
        }),
    );
    next.children_mut()
        .entry(parent_id.to_string())
        .or_default()
        .push(target.to_string());
    if definition.is_container {
        next.children_mut().entry(target.to_string()).or_default();
    }

    log::debug!("Spawned {kind} `{target}` under `{parent_id}`");
    Arc::new(next)
}

/// Apply an update to a reducer-managed instance.
///
/// `changeParent` is intercepted here for every type, including imperative
/// ones. Any other update for an imperative type is a no-op: those belong to
/// the imperative dispatcher.
pub fn update(
    registry: &ComponentRegistry,
    state: &Arc<AppState>,
    kind: &str,
    target: &str,
    payload: &Value,
) -> Arc<AppState> {
    let Some(instance) = state.get(target) else {
        log::warn!("Update dropped: unknown instance `{target}`");
        return state.clone();
    };
    if instance.kind != kind {
        log::warn!(
            "Update dropped: `{target}` is a {}, message addressed it as {kind}",
            instance.kind
        );
        return state.clone();
    }

    if let Ok(action) = serde_json::from_value::<UpdateAction>(payload.clone()) {
        if action.is_change_parent() {
            return match action.options::<ChangeParentOptions>() {
                Ok(options) => change_parent(state, target, &options.parent),
                Err(e) => {
                    log::warn!("changeParent for `{target}` dropped: {e}");
                    state.clone()
                }
            };
        }
    }

    let Some(definition) = registry.get(&instance.kind) else {
        log::warn!("Update dropped: type `{}` of `{target}` is not registered", instance.kind);
        return state.clone();
    };
    if definition.imperative_update {
        log::warn!("Update for imperative {kind} `{target}` reached the reducer, ignoring");
        return state.clone();
    }

    let next_state = (definition.update_state)(&instance.state, payload, target);
    if Arc::ptr_eq(&next_state, &instance.state) {
        return state.clone();
    }

    let mut next = AppState::clone(state);
    next.components_by_id.insert(
        target.to_string(),
        Arc::new(ComponentInstance {
            state: next_state,
            ..ComponentInstance::clone(instance)
        }),
    );
    Arc::new(next)
}

/// Move `target` to the end of `new_parent`'s children.
///
/// Rejected when the new parent is not a container, or lies inside the
/// subtree of `target`. Moving to the current parent is a no-op: sibling
/// reordering is not supported.
pub fn change_parent(state: &Arc<AppState>, target: &str, new_parent: &str) -> Arc<AppState> {
    let Some(instance) = state.get(target) else {
        log::warn!("changeParent dropped: unknown instance `{target}`");
        return state.clone();
    };
    if !state.is_container(new_parent) {
        log::warn!("changeParent dropped: `{new_parent}` is not a container");
        return state.clone();
    }
    if instance.parent_id == new_parent {
        log::debug!("changeParent for `{target}`: already under `{new_parent}`, reordering unsupported");
        return state.clone();
    }
    if state.is_descendant(new_parent, target) {
        log::warn!("changeParent dropped: `{new_parent}` is inside the subtree of `{target}`");
        return state.clone();
    }

    let mut next = AppState::clone(state);
    if let Some(siblings) = next.children_mut().get_mut(&instance.parent_id) {
        siblings.retain(|child| child != target);
    }
    next.children_mut()
        .entry(new_parent.to_string())
        .or_default()
        .push(target.to_string());
    next.components_by_id.insert(
        target.to_string(),
        Arc::new(ComponentInstance {
            parent_id: new_parent.to_string(),
            ..ComponentInstance::clone(instance)
        }),
    );

    log::debug!("Moved `{target}` from `{}` to `{new_parent}`", instance.parent_id);
    Arc::new(next)
}

/// Remove `target` and, for containers, its whole subtree.
pub fn remove(state: &Arc<AppState>, target: &str) -> Arc<AppState> {
    if !state.contains(target) {
        log::debug!("Remove ignored: unknown instance `{target}`");
        return state.clone();
    }

    let mut next = AppState::clone(state);
    let mut queue = VecDeque::from([target.to_string()]);
    let mut visited = FxHashSet::default();

    while let Some(id) = queue.pop_front() {
        if id == ROOT_ID || !visited.insert(id.clone()) {
            continue;
        }
        if let Some(instance) = next.components_by_id.remove(&id) {
            if let Some(siblings) = next.children_mut().get_mut(&instance.parent_id) {
                siblings.retain(|child| *child != id);
            }
        }
        if let Some(children) = next.children_mut().remove(&id) {
            queue.extend(children);
        }
    }

    log::debug!("Removed `{target}` ({} instances)", visited.len());
    Arc::new(next)
}

/// Track the hero's presence. Sidekick announces do not touch the tree.
pub fn announce(state: &Arc<AppState>, announce: &AnnouncePayload) -> Arc<AppState> {
    if announce.role != PeerRole::Hero {
        return state.clone();
    }

    let hero_status = if announce.is_online() {
        let unchanged = state
            .hero_status
            .as_ref()
            .is_some_and(|current| current.peer_id == announce.peer_id && current.status == announce.status);
        if unchanged {
            return state.clone();
        }
        Some(announce.clone())
    } else {
        if state.hero_status.is_none() {
            return state.clone();
        }
        None
    };

    log::info!("Hero `{}` is {:?}", announce.peer_id, announce.status);
    Arc::new(AppState {
        hero_status,
        ..AppState::clone(state)
    })
}

/// Drop every instance. Hero presence is kept.
pub fn clear_all(state: &Arc<AppState>) -> Arc<AppState> {
    let empty = AppState {
        hero_status: state.hero_status.clone(),
        ..AppState::default()
    };
    if **state == empty {
        return state.clone();
    }
    log::debug!("Cleared {} instances", state.len());
    Arc::new(empty)
}

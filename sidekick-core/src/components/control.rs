//! Dynamic control panel: an ordered list of buttons and textboxes added and
//! removed at runtime by id.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{action_options, commit, unknown_action, update_action, ComponentState};
use crate::registry::SpawnError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlType {
    Button,
    Textbox,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlSpec {
    pub control_id: String,
    pub control_type: ControlType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControlState {
    pub controls: Vec<ControlSpec>,
}

impl ControlState {
    pub fn get(&self, control_id: &str) -> Option<&ControlSpec> {
        self.controls.iter().find(|c| c.control_id == control_id)
    }

    fn position(&self, control_id: &str) -> Option<usize> {
        self.controls.iter().position(|c| c.control_id == control_id)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoveOptions {
    control_id: String,
}

pub fn initial_state(_id: &str, _payload: &Value, _parent: &str) -> Result<ComponentState, SpawnError> {
    Ok(ComponentState::Control(ControlState::default()))
}

fn add(state: &ControlState, spec: ControlSpec) -> Option<ControlState> {
    let mut next = state.clone();
    match state.position(&spec.control_id) {
        Some(index) if state.controls[index] == spec => return None,
        Some(index) => next.controls[index] = spec,
        None => next.controls.push(spec),
    }
    Some(next)
}

fn remove(state: &ControlState, control_id: &str) -> Option<ControlState> {
    let index = state.position(control_id)?;
    let mut next = state.clone();
    next.controls.remove(index);
    Some(next)
}

pub fn update_state(current: &Arc<ComponentState>, payload: &Value, id: &str) -> Arc<ComponentState> {
    let ComponentState::Control(state) = current.as_ref() else {
        return current.clone();
    };
    let Some(update) = update_action(payload, id) else {
        return current.clone();
    };

    let next = match update.action.as_str() {
        "add" => action_options::<ControlSpec>(&update, id).and_then(|spec| add(state, spec)),
        "remove" => action_options::<RemoveOptions>(&update, id).and_then(|o| {
            let next = remove(state, &o.control_id);
            if next.is_none() {
                log::warn!("Control `{id}` has no control `{}` to remove", o.control_id);
            }
            next
        }),
        "clear" => (!state.controls.is_empty()).then(ControlState::default),
        _ => {
            unknown_action("control", &update, id);
            None
        }
    };

    commit(current, next, ComponentState::Control)
}

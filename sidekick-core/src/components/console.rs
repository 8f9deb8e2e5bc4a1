//! Scrolling text console with an optional input line.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{action_options, commit, spawn_options, unknown_action, update_action, ComponentState};
use crate::registry::SpawnError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsoleState {
    pub text: String,
    pub show_input: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TextOptions {
    text: String,
}

pub fn initial_state(_id: &str, payload: &Value, _parent: &str) -> Result<ComponentState, SpawnError> {
    let state: ConsoleState = spawn_options(payload)?;
    Ok(ComponentState::Console(state))
}

pub fn update_state(current: &Arc<ComponentState>, payload: &Value, id: &str) -> Arc<ComponentState> {
    let ComponentState::Console(console) = current.as_ref() else {
        return current.clone();
    };
    let Some(update) = update_action(payload, id) else {
        return current.clone();
    };

    let next = match update.action.as_str() {
        "append" => action_options::<TextOptions>(&update, id)
            .filter(|o| !o.text.is_empty())
            .map(|o| ConsoleState {
                text: format!("{}{}", console.text, o.text),
                ..console.clone()
            }),
        "setText" => action_options::<TextOptions>(&update, id)
            .filter(|o| o.text != console.text)
            .map(|o| ConsoleState {
                text: o.text,
                ..console.clone()
            }),
        "clear" => (!console.text.is_empty()).then(|| ConsoleState {
            text: String::new(),
            ..console.clone()
        }),
        _ => {
            unknown_action("console", &update, id);
            None
        }
    };

    commit(current, next, ComponentState::Console)
}

//! Text-bearing leaves: label, button, markdown and textbox.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    action_options, commit, required_text, spawn_options, unknown_action, update_action, ComponentState,
};
use crate::registry::SpawnError;

/// Shared state of label, button and markdown instances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TextState {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBoxState {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct InitialValue {
    initial_value: String,
    placeholder: Option<String>,
}

/// Label and button: a required `text`.
pub fn text_initial_state(_id: &str, payload: &Value, _parent: &str) -> Result<ComponentState, SpawnError> {
    Ok(ComponentState::Text(TextState {
        text: required_text(payload, "text")?,
    }))
}

pub fn markdown_initial_state(_id: &str, payload: &Value, _parent: &str) -> Result<ComponentState, SpawnError> {
    let options: InitialValue = spawn_options(payload)?;
    Ok(ComponentState::Text(TextState {
        text: options.initial_value,
    }))
}

pub fn textbox_initial_state(_id: &str, payload: &Value, _parent: &str) -> Result<ComponentState, SpawnError> {
    let options: InitialValue = spawn_options(payload)?;
    Ok(ComponentState::TextBox(TextBoxState {
        value: options.initial_value,
        placeholder: options.placeholder,
    }))
}

#[derive(Debug, Deserialize)]
struct SetText {
    text: String,
}

#[derive(Debug, Deserialize)]
struct SetValue {
    value: String,
}

#[derive(Debug, Deserialize)]
struct SetPlaceholder {
    placeholder: Option<String>,
}

pub fn update_text_state(current: &Arc<ComponentState>, payload: &Value, id: &str) -> Arc<ComponentState> {
    let ComponentState::Text(state) = current.as_ref() else {
        return current.clone();
    };
    let Some(update) = update_action(payload, id) else {
        return current.clone();
    };

    let next = match update.action.as_str() {
        "setText" => action_options::<SetText>(&update, id)
            .filter(|o| o.text != state.text)
            .map(|o| TextState { text: o.text }),
        _ => {
            unknown_action("text", &update, id);
            None
        }
    };

    commit(current, next, ComponentState::Text)
}

pub fn update_textbox_state(current: &Arc<ComponentState>, payload: &Value, id: &str) -> Arc<ComponentState> {
    let ComponentState::TextBox(state) = current.as_ref() else {
        return current.clone();
    };
    let Some(update) = update_action(payload, id) else {
        return current.clone();
    };

    let next = match update.action.as_str() {
        "setValue" => action_options::<SetValue>(&update, id)
            .filter(|o| o.value != state.value)
            .map(|o| TextBoxState {
                value: o.value,
                ..state.clone()
            }),
        "setPlaceholder" => action_options::<SetPlaceholder>(&update, id)
            .filter(|o| o.placeholder != state.placeholder)
            .map(|o| TextBoxState {
                placeholder: o.placeholder,
                ..state.clone()
            }),
        _ => {
            unknown_action("textbox", &update, id);
            None
        }
    };

    commit(current, next, ComponentState::TextBox)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_requires_text() {
        assert_eq!(
            text_initial_state("l1", &json!({}), "root").unwrap_err(),
            SpawnError::MissingField("text")
        );
        assert!(matches!(
            text_initial_state("b1", &json!({"text": 7}), "root"),
            Err(SpawnError::InvalidField { field: "text", .. })
        ));
    }

    #[test]
    fn test_set_text_same_value_is_noop() {
        let state = Arc::new(text_initial_state("l1", &json!({"text": "hello"}), "root").unwrap());
        let same = json!({"action": "setText", "options": {"text": "hello"}});
        assert!(Arc::ptr_eq(&state, &update_text_state(&state, &same, "l1")));

        let changed = update_text_state(&state, &json!({"action": "setText", "options": {"text": "bye"}}), "l1");
        assert_eq!(*changed, ComponentState::Text(TextState { text: "bye".into() }));
    }

    #[test]
    fn test_markdown_initial_value_optional() {
        let empty = markdown_initial_state("m1", &Value::Null, "root").unwrap();
        assert_eq!(empty, ComponentState::Text(TextState::default()));
        let filled = markdown_initial_state("m1", &json!({"initialValue": "# Title"}), "root").unwrap();
        assert_eq!(filled, ComponentState::Text(TextState { text: "# Title".into() }));
    }

    #[test]
    fn test_textbox_updates() {
        let state = Arc::new(
            textbox_initial_state("t1", &json!({"initialValue": "a", "placeholder": "name"}), "root").unwrap(),
        );
        let value = update_textbox_state(&state, &json!({"action": "setValue", "options": {"value": "b"}}), "t1");
        assert_eq!(
            *value,
            ComponentState::TextBox(TextBoxState {
                value: "b".into(),
                placeholder: Some("name".into())
            })
        );

        let same = json!({"action": "setPlaceholder", "options": {"placeholder": "name"}});
        assert!(Arc::ptr_eq(&value, &update_textbox_state(&value, &same, "t1")));
    }

    #[test]
    fn test_wrong_variant_is_noop() {
        let state = Arc::new(ComponentState::Container);
        let payload = json!({"action": "setText", "options": {"text": "x"}});
        assert!(Arc::ptr_eq(&state, &update_text_state(&state, &payload, "x")));
    }
}

//! Built-in component catalogue.
//!
//! | type | container | imperative |
//! |------|-----------|------------|
//! | grid, console, label, button, textbox, markdown, viz, control | no | no |
//! | canvas | no | yes |
//! | row, column | yes | no |
//!
//! Every update payload has the shape `{action, options}`. Unknown actions,
//! malformed options and updates that change nothing all return the input
//! `Arc` untouched. `changeParent` is never seen here: the reducer handles it
//! before delegating, and it falls into the unknown-action branch regardless.

pub mod canvas;
pub mod console;
pub mod container;
pub mod control;
pub mod grid;
pub mod text;
pub mod viz;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::protocol::UpdateAction;
use crate::registry::{ComponentDefinition, InitialStateFn, SpawnError, UpdateStateFn};

pub use canvas::CanvasState;
pub use console::ConsoleState;
pub use control::{ControlSpec, ControlState, ControlType};
pub use grid::{GridCell, GridState};
pub use text::{TextBoxState, TextState};
pub use viz::{PathSegment, VizState};

/// Per-type state of a component instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "state", rename_all = "camelCase")]
pub enum ComponentState {
    Grid(GridState),
    Console(ConsoleState),
    Canvas(CanvasState),
    /// label, button, markdown
    Text(TextState),
    TextBox(TextBoxState),
    Viz(VizState),
    Control(ControlState),
    /// row, column
    Container,
    /// State of a component type registered outside this crate
    Custom(Value),
}

/// Definitions for every built-in type, in registration order.
pub fn builtin_definitions() -> Vec<(&'static str, ComponentDefinition)> {
    vec![
        ("grid", leaf(grid::initial_state, grid::update_state)),
        ("console", leaf(console::initial_state, console::update_state)),
        (
            "canvas",
            ComponentDefinition {
                initial_state: canvas::initial_state,
                update_state: canvas::update_state,
                is_container: false,
                imperative_update: true,
            },
        ),
        ("label", leaf(text::text_initial_state, text::update_text_state)),
        ("button", leaf(text::text_initial_state, text::update_text_state)),
        ("markdown", leaf(text::markdown_initial_state, text::update_text_state)),
        ("textbox", leaf(text::textbox_initial_state, text::update_textbox_state)),
        ("viz", leaf(viz::initial_state, viz::update_state)),
        ("control", leaf(control::initial_state, control::update_state)),
        (
            "row",
            ComponentDefinition {
                initial_state: container::initial_state,
                update_state: container::update_state,
                is_container: true,
                imperative_update: false,
            },
        ),
        (
            "column",
            ComponentDefinition {
                initial_state: container::initial_state,
                update_state: container::update_state,
                is_container: true,
                imperative_update: false,
            },
        ),
    ]
}

fn leaf(initial_state: InitialStateFn, update_state: UpdateStateFn) -> ComponentDefinition {
    ComponentDefinition {
        initial_state,
        update_state,
        is_container: false,
        imperative_update: false,
    }
}

// ───────────────────────────────────────────────────────────────────
// Shared payload helpers
// ───────────────────────────────────────────────────────────────────

/// Decode a spawn payload into typed options. `null` reads as `{}`.
pub(crate) fn spawn_options<T: DeserializeOwned>(payload: &Value) -> Result<T, SpawnError> {
    let value = if payload.is_null() {
        Value::Object(Default::default())
    } else {
        payload.clone()
    };
    serde_json::from_value(value).map_err(|e| SpawnError::InvalidPayload(e.to_string()))
}

/// Required strictly-positive integer field of a spawn payload.
pub(crate) fn positive_dimension(payload: &Value, field: &'static str) -> Result<u32, SpawnError> {
    let value = payload.get(field).ok_or(SpawnError::MissingField(field))?;
    match value.as_u64() {
        Some(n) if n > 0 && n <= u64::from(u32::MAX) => Ok(n as u32),
        _ => Err(SpawnError::InvalidField {
            field,
            reason: format!("expected a positive integer, got {value}"),
        }),
    }
}

/// Required string field of a spawn payload.
pub(crate) fn required_text(payload: &Value, field: &'static str) -> Result<String, SpawnError> {
    match payload.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(SpawnError::InvalidField {
            field,
            reason: format!("expected a string, got {other}"),
        }),
        None => Err(SpawnError::MissingField(field)),
    }
}

/// Parse `{action, options}`, logging malformed payloads.
pub(crate) fn update_action(payload: &Value, id: &str) -> Option<UpdateAction> {
    match serde_json::from_value::<UpdateAction>(payload.clone()) {
        Ok(action) => Some(action),
        Err(e) => {
            log::warn!("Ignoring malformed update for `{id}`: {e}");
            None
        }
    }
}

/// Decode the options of an action, logging failures.
pub(crate) fn action_options<T: DeserializeOwned>(action: &UpdateAction, id: &str) -> Option<T> {
    match action.options::<T>() {
        Ok(options) => Some(options),
        Err(e) => {
            log::warn!("Ignoring `{}` for `{id}`: {e}", action.action);
            None
        }
    }
}

/// Log an action the component does not understand.
pub(crate) fn unknown_action(kind: &str, action: &UpdateAction, id: &str) {
    if action.is_change_parent() {
        return;
    }
    log::warn!("Ignoring unknown {kind} action `{}` for `{id}`", action.action);
}

/// Wrap a changed state, or hand back the current `Arc`.
pub(crate) fn commit<S>(
    current: &Arc<ComponentState>,
    next: Option<S>,
    wrap: fn(S) -> ComponentState,
) -> Arc<ComponentState> {
    match next {
        Some(state) => Arc::new(wrap(state)),
        None => current.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ComponentRegistry;
    use serde_json::json;

    /// Every built-in treats `changeParent` as a no-op.
    #[test]
    fn test_change_parent_is_noop_for_every_builtin() {
        let registry = ComponentRegistry::with_builtins();
        let spawn_payloads = [
            ("grid", json!({"numColumns": 2, "numRows": 2})),
            ("console", json!({})),
            ("canvas", json!({"width": 10, "height": 10})),
            ("label", json!({"text": "a"})),
            ("button", json!({"text": "b"})),
            ("markdown", json!({})),
            ("textbox", json!({})),
            ("viz", json!({})),
            ("control", json!({})),
            ("row", json!({})),
            ("column", json!({})),
        ];
        let change_parent = json!({"action": "changeParent", "options": {"parent": "x"}});

        for (kind, payload) in spawn_payloads {
            let def = registry.get(kind).unwrap();
            let state = Arc::new((def.initial_state)("id", &payload, "root").unwrap());
            let next = (def.update_state)(&state, &change_parent, "id");
            assert!(Arc::ptr_eq(&state, &next), "`{kind}` changed on changeParent");
        }
    }

    #[test]
    fn test_positive_dimension() {
        let payload = json!({"w": 3, "zero": 0, "neg": -1, "text": "3"});
        assert_eq!(positive_dimension(&payload, "w"), Ok(3));
        assert!(matches!(
            positive_dimension(&payload, "zero"),
            Err(SpawnError::InvalidField { field: "zero", .. })
        ));
        assert!(positive_dimension(&payload, "neg").is_err());
        assert!(positive_dimension(&payload, "text").is_err());
        assert_eq!(positive_dimension(&payload, "h"), Err(SpawnError::MissingField("h")));
    }

    #[test]
    fn test_malformed_update_payload() {
        assert!(update_action(&json!("setText"), "l1").is_none());
        assert!(update_action(&json!({"options": {}}), "l1").is_none());
        let action = update_action(&json!({"action": "clear"}), "l1").unwrap();
        assert!(action.options.is_null());
    }
}

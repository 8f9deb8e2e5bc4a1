//! Layout containers (`row`, `column`). Their only state is their child
//! list, which lives in the application tree, not here.

use std::sync::Arc;

use serde_json::Value;

use super::ComponentState;
use crate::registry::SpawnError;

pub fn initial_state(_id: &str, _payload: &Value, _parent: &str) -> Result<ComponentState, SpawnError> {
    Ok(ComponentState::Container)
}

pub fn update_state(current: &Arc<ComponentState>, payload: &Value, id: &str) -> Arc<ComponentState> {
    log::debug!("Container `{id}` has no updatable state, ignoring {payload}");
    current.clone()
}

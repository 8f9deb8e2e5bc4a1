//! Drawing surface. Draw commands are imperative: they go straight to the
//! mounted surface handle and never touch the stored state, which only keeps
//! the surface dimensions.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::{positive_dimension, ComponentState};
use crate::registry::SpawnError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CanvasState {
    pub width: u32,
    pub height: u32,
}

pub fn initial_state(_id: &str, payload: &Value, _parent: &str) -> Result<ComponentState, SpawnError> {
    Ok(ComponentState::Canvas(CanvasState {
        width: positive_dimension(payload, "width")?,
        height: positive_dimension(payload, "height")?,
    }))
}

/// Canvas state never changes through the reducer.
pub fn update_state(current: &Arc<ComponentState>, _payload: &Value, _id: &str) -> Arc<ComponentState> {
    current.clone()
}

//! Builders for interaction events emitted by rendered instances.
//!
//! Every event payload carries a `type` discriminator next to its fields:
//! `{"type": "click", "x": 2, "y": 3}`.

use serde_json::json;

use crate::protocol::Message;

/// Cell `(x, y)` of grid `src` was clicked.
pub fn grid_click(src: &str, x: u32, y: u32) -> Message {
    Message::event("grid", src, json!({ "type": "click", "x": x, "y": y }))
}

pub fn button_click(src: &str) -> Message {
    Message::event("button", src, json!({ "type": "click" }))
}

/// Textbox `src` was submitted with `value`.
pub fn textbox_submit(src: &str, value: &str) -> Message {
    Message::event("textbox", src, json!({ "type": "submit", "value": value }))
}

/// A line was typed into the input of console `src`.
pub fn console_input(src: &str, value: &str) -> Message {
    Message::event("console", src, json!({ "type": "inputText", "value": value }))
}

/// Canvas coordinates are surface pixels.
pub fn canvas_click(src: &str, x: f64, y: f64) -> Message {
    Message::event("canvas", src, json!({ "type": "click", "x": x, "y": y }))
}

pub fn control_click(src: &str, control_id: &str) -> Message {
    Message::event("control", src, json!({ "type": "click", "controlId": control_id }))
}

pub fn control_input(src: &str, control_id: &str, value: &str) -> Message {
    Message::event(
        "control",
        src,
        json!({ "type": "inputText", "controlId": control_id, "value": value }),
    )
}

//! Grid of addressable cells, keyed `"x,y"`.
//!
//! Only cells that have been written are stored; a freshly spawned 5×5 grid
//! has an empty cell map.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{action_options, commit, positive_dimension, unknown_action, update_action, ComponentState};
use crate::registry::SpawnError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl GridCell {
    fn is_empty(&self) -> bool {
        self.color.is_none() && self.text.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridState {
    pub num_columns: u32,
    pub num_rows: u32,
    pub cells: BTreeMap<String, GridCell>,
}

impl GridState {
    pub fn new(num_columns: u32, num_rows: u32) -> Self {
        Self {
            num_columns,
            num_rows,
            cells: BTreeMap::new(),
        }
    }

    /// Map key of the cell at column `x`, row `y`.
    pub fn cell_key(x: u32, y: u32) -> String {
        format!("{x},{y}")
    }

    pub fn cell(&self, x: u32, y: u32) -> Option<&GridCell> {
        self.cells.get(&Self::cell_key(x, y))
    }

    /// Checked conversion of wire coordinates.
    fn coordinates(&self, x: i64, y: i64) -> Option<(u32, u32)> {
        if x < 0 || y < 0 || x >= i64::from(self.num_columns) || y >= i64::from(self.num_rows) {
            return None;
        }
        Some((x as u32, y as u32))
    }

    /// Apply `edit` to one cell. `None` when the cell is unchanged.
    fn edit_cell(&self, x: u32, y: u32, edit: impl FnOnce(&mut GridCell)) -> Option<GridState> {
        let key = Self::cell_key(x, y);
        let before = self.cells.get(&key).cloned().unwrap_or_default();
        let mut after = before.clone();
        edit(&mut after);
        if after == before {
            return None;
        }

        let mut next = self.clone();
        if after.is_empty() {
            next.cells.remove(&key);
        } else {
            next.cells.insert(key, after);
        }
        Some(next)
    }
}

#[derive(Debug, Deserialize)]
struct CellAt {
    x: i64,
    y: i64,
}

#[derive(Debug, Deserialize)]
struct SetColor {
    x: i64,
    y: i64,
    color: String,
}

#[derive(Debug, Deserialize)]
struct SetText {
    x: i64,
    y: i64,
    text: String,
}

pub fn initial_state(_id: &str, payload: &Value, _parent: &str) -> Result<ComponentState, SpawnError> {
    let num_columns = positive_dimension(payload, "numColumns")?;
    let num_rows = positive_dimension(payload, "numRows")?;
    Ok(ComponentState::Grid(GridState::new(num_columns, num_rows)))
}

pub fn update_state(current: &Arc<ComponentState>, payload: &Value, id: &str) -> Arc<ComponentState> {
    let ComponentState::Grid(grid) = current.as_ref() else {
        return current.clone();
    };
    let Some(update) = update_action(payload, id) else {
        return current.clone();
    };

    let in_range = |x: i64, y: i64| {
        let coords = grid.coordinates(x, y);
        if coords.is_none() {
            log::warn!(
                "Ignoring `{}` for grid `{id}`: ({x}, {y}) outside {}x{}",
                update.action,
                grid.num_columns,
                grid.num_rows
            );
        }
        coords
    };

    let next = match update.action.as_str() {
        "setColor" => action_options::<SetColor>(&update, id).and_then(|o| {
            let (x, y) = in_range(o.x, o.y)?;
            grid.edit_cell(x, y, |cell| cell.color = Some(o.color))
        }),
        "setText" => action_options::<SetText>(&update, id).and_then(|o| {
            let (x, y) = in_range(o.x, o.y)?;
            grid.edit_cell(x, y, |cell| cell.text = Some(o.text))
        }),
        "clearCell" => action_options::<CellAt>(&update, id).and_then(|o| {
            let (x, y) = in_range(o.x, o.y)?;
            grid.edit_cell(x, y, |cell| *cell = GridCell::default())
        }),
        "clear" => (!grid.cells.is_empty()).then(|| GridState::new(grid.num_columns, grid.num_rows)),
        _ => {
            unknown_action("grid", &update, id);
            None
        }
    };

    commit(current, next, ComponentState::Grid)
}

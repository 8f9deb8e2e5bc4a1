//! Application state tree: live instances, parent → children adjacency and
//! the hero presence flag.
//!
//! ```text
//! AppState
//!   components_by_id:      "g1" ─► Arc<ComponentInstance{kind:"grid", parent:"root"}>
//!                          "r1" ─► Arc<ComponentInstance{kind:"row",  parent:"root"}>
//!                          "l1" ─► Arc<ComponentInstance{kind:"label",parent:"r1"}>
//!   children_by_parent_id: "root" ─► ["g1", "r1"]
//!                          "r1"   ─► ["l1"]
//!   hero_status:           Some(AnnouncePayload{role: hero, status: online})
//! ```
//!
//! Snapshots are immutable once built. Instances and the adjacency map are
//! shared `Arc`s, so a transition only copies what it touches.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::components::ComponentState;
use crate::protocol::AnnouncePayload;

/// Id of the implicit root container.
pub const ROOT_ID: &str = "root";

/// One live, addressable UI element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInstance {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub parent_id: String,
    pub state: Arc<ComponentState>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub components_by_id: FxHashMap<String, Arc<ComponentInstance>>,
    pub children_by_parent_id: Arc<FxHashMap<String, Vec<String>>>,
    pub hero_status: Option<AnnouncePayload>,
}

impl Default for AppState {
    /// Empty tree with the root container initialized.
    fn default() -> Self {
        let mut children_by_parent_id = FxHashMap::default();
        children_by_parent_id.insert(ROOT_ID.to_string(), Vec::new());
        Self {
            components_by_id: FxHashMap::default(),
            children_by_parent_id: Arc::new(children_by_parent_id),
            hero_status: None,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adjacency map for editing, copied first if another snapshot shares it.
    pub fn children_mut(&mut self) -> &mut FxHashMap<String, Vec<String>> {
        Arc::make_mut(&mut self.children_by_parent_id)
    }

    pub fn get(&self, id: &str) -> Option<&Arc<ComponentInstance>> {
        self.components_by_id.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.components_by_id.contains_key(id)
    }

    /// Ordered children of `parent_id`; empty for leaves and unknown ids.
    pub fn children(&self, parent_id: &str) -> &[String] {
        self.children_by_parent_id
            .get(parent_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of live instances (the root is not an instance).
    pub fn len(&self) -> usize {
        self.components_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components_by_id.is_empty()
    }

    /// Is `id` a valid parent: the root or an instance that owns a child list.
    pub fn is_container(&self, id: &str) -> bool {
        id == ROOT_ID || (self.contains(id) && self.children_by_parent_id.contains_key(id))
    }

    /// Whether `id` lies in the subtree rooted at `ancestor` (inclusive).
    pub fn is_descendant(&self, id: &str, ancestor: &str) -> bool {
        let mut current = id;
        let mut hops = 0;
        loop {
            if current == ancestor {
                return true;
            }
            // Guard against corrupted parent chains.
            if current == ROOT_ID || hops > self.components_by_id.len() {
                return false;
            }
            match self.components_by_id.get(current) {
                Some(instance) => current = instance.parent_id.as_str(),
                None => return false,
            }
            hops += 1;
        }
    }

    /// Whether the hero peer is currently announced online.
    pub fn hero_online(&self) -> bool {
        self.hero_status.as_ref().is_some_and(AnnouncePayload::is_online)
    }
}

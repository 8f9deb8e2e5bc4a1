//! Component-type registry: a strategy table from type tag to behavior.
//!
//! Each entry bundles two pure functions and two capability flags:
//!
//! ```text
//! "grid" ──► ComponentDefinition {
//!              initial_state: fn(id, spawn payload, parent) -> Result<State>
//!              update_state:  fn(&Arc<State>, update payload, id) -> Arc<State>
//!              is_container:      false
//!              imperative_update: false
//!            }
//! ```
//!
//! `update_state` must hand back the input `Arc` when nothing changed, so the
//! reducer can detect no-ops with `Arc::ptr_eq` instead of deep comparison.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

use crate::components::{self, ComponentState};

/// Builds the initial state of a freshly spawned instance.
///
/// Arguments: instance id, spawn payload, resolved parent id.
pub type InitialStateFn = fn(&str, &Value, &str) -> Result<ComponentState, SpawnError>;

/// Applies an update payload. Returns the input `Arc` on no-op.
///
/// Arguments: current state, update payload, instance id.
pub type UpdateStateFn = fn(&Arc<ComponentState>, &Value, &str) -> Arc<ComponentState>;

/// Behavior contract of one component type.
#[derive(Clone, Copy)]
pub struct ComponentDefinition {
    pub initial_state: InitialStateFn,
    pub update_state: UpdateStateFn,
    /// Holds an ordered list of child instances
    pub is_container: bool,
    /// Updates bypass the reducer and go to the mounted handle
    pub imperative_update: bool,
}

impl std::fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("is_container", &self.is_container)
            .field("imperative_update", &self.imperative_update)
            .finish_non_exhaustive()
    }
}

/// Spawn payload validation failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpawnError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("invalid spawn payload: {0}")]
    InvalidPayload(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("component type `{0}` is already registered")]
    AlreadyRegistered(String),
    #[error("component type name must not be empty or reserved: `{0}`")]
    InvalidName(String),
}

/// Registry of component definitions, keyed by exact type name.
#[derive(Debug, Default, Clone)]
pub struct ComponentRegistry {
    definitions: FxHashMap<String, ComponentDefinition>,
}

impl ComponentRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with every built-in component type.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (kind, definition) in components::builtin_definitions() {
            // Built-in names are distinct and never reserved.
            let _ = registry.register(kind, definition);
        }
        registry
    }

    /// Register a component type. Each type is registered once.
    pub fn register(
        &mut self,
        kind: impl Into<String>,
        definition: ComponentDefinition,
    ) -> Result<(), RegistryError> {
        let kind = kind.into();
        if kind.is_empty()
            || kind == crate::protocol::SYSTEM_COMPONENT
            || kind == crate::protocol::GLOBAL_COMPONENT
        {
            return Err(RegistryError::InvalidName(kind));
        }
        if self.definitions.contains_key(&kind) {
            return Err(RegistryError::AlreadyRegistered(kind));
        }
        log::debug!(
            "Registered component type `{kind}` (container={}, imperative={})",
            definition.is_container,
            definition.imperative_update
        );
        self.definitions.insert(kind, definition);
        Ok(())
    }

    /// Look up a definition by exact type name.
    pub fn get(&self, kind: &str) -> Option<&ComponentDefinition> {
        self.definitions.get(kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.definitions.contains_key(kind)
    }

    pub fn is_container(&self, kind: &str) -> bool {
        self.get(kind).is_some_and(|d| d.is_container)
    }

    pub fn is_imperative(&self, kind: &str) -> bool {
        self.get(kind).is_some_and(|d| d.imperative_update)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Registered type names, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

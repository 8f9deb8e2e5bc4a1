//! Client-side session: one application state tree fed by inbound frames.
//!
//! ```text
//!   text frame ──► Message::decode ──┬── imperative update ──► ImperativeDispatcher
//!                                    └── everything else  ──► reducer::reduce
//!                                                                │ changed?
//!                                                                ▼
//!                                                     purge stale imperative slots
//! ```

use std::sync::Arc;

use serde_json::Value;

use crate::imperative::{Delivery, ImperativeDispatcher, UpdateHandle};
use crate::protocol::{Message, MessageKind};
use crate::reducer;
use crate::registry::ComponentRegistry;
use crate::state::AppState;

/// Result of handling one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The state tree changed.
    Changed,
    /// Nothing changed (no-op, rejected or logged).
    Unchanged,
    /// Routed to an imperative handle.
    Imperative(Delivery),
}

impl Outcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, Outcome::Changed)
    }
}

#[derive(Debug)]
pub struct SidekickSession {
    registry: Arc<ComponentRegistry>,
    state: Arc<AppState>,
    imperative: ImperativeDispatcher,
}

impl SidekickSession {
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self {
            registry,
            state: Arc::new(AppState::new()),
            imperative: ImperativeDispatcher::new(),
        }
    }

    /// Session over every built-in component type.
    pub fn with_builtins() -> Self {
        Self::new(Arc::new(ComponentRegistry::with_builtins()))
    }

    /// Current snapshot. Cheap to clone and safe to hold across updates.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    pub fn imperative(&self) -> &ImperativeDispatcher {
        &self.imperative
    }

    /// Decode and apply one text frame. Malformed frames are logged and dropped.
    pub fn handle_frame(&mut self, text: &str) -> Outcome {
        match Message::decode(text) {
            Ok(message) => self.handle_message(&message),
            Err(e) => {
                log::warn!("Dropping malformed frame: {e}");
                Outcome::Unchanged
            }
        }
    }

    pub fn handle_message(&mut self, message: &Message) -> Outcome {
        if let Some(target) = self.imperative_target(message) {
            let payload = message.payload_or_null().clone();
            return Outcome::Imperative(self.imperative.dispatch(target, payload));
        }

        let next = reducer::reduce(&self.registry, &self.state, message);
        if Arc::ptr_eq(&next, &self.state) {
            return Outcome::Unchanged;
        }
        self.state = next;
        self.imperative.purge(&self.state);
        Outcome::Changed
    }

    /// Target of an update that belongs on the imperative path.
    ///
    /// `changeParent` stays with the reducer for every type. Updates naming an
    /// unknown or differently-typed instance are left to the reducer to drop.
    fn imperative_target<'m>(&self, message: &'m Message) -> Option<&'m str> {
        if message.kind != MessageKind::Update || !self.registry.is_imperative(&message.component) {
            return None;
        }
        if message.update_action().is_some_and(|a| a.is_change_parent()) {
            return None;
        }
        let target = message.target.as_deref()?;
        self.state
            .get(target)
            .is_some_and(|instance| instance.kind == message.component)
            .then_some(target)
    }

    /// Attach the handle of a mounted imperative instance.
    pub fn mount(&mut self, target: &str, handle: Box<dyn UpdateHandle>) -> bool {
        match self.state.get(target) {
            Some(instance) if self.registry.is_imperative(&instance.kind) => {
                self.imperative.mount(target, handle);
                true
            }
            Some(instance) => {
                log::warn!("Cannot mount a handle on {} `{target}`: not imperative", instance.kind);
                false
            }
            None => {
                log::warn!("Cannot mount a handle on unknown instance `{target}`");
                false
            }
        }
    }

    /// Mark a mounted instance ready and replay its queued updates.
    pub fn signal_ready(&mut self, target: &str) -> usize {
        self.imperative.signal_ready(target)
    }

    pub fn unmount(&mut self, target: &str) {
        self.imperative.unmount(target);
    }

    /// Build an `event` message from instance `src`.
    pub fn emit_event(&self, src: &str, payload: Value) -> Option<Message> {
        let Some(instance) = self.state.get(src) else {
            log::warn!("Not emitting event from unknown instance `{src}`");
            return None;
        };
        Some(Message::event(instance.kind.clone(), src, payload))
    }

    /// Build an `error` message from instance `src`.
    pub fn emit_error(&self, src: &str, message: impl Into<String>) -> Option<Message> {
        let Some(instance) = self.state.get(src) else {
            log::warn!("Not emitting error from unknown instance `{src}`");
            return None;
        };
        Some(Message::error(instance.kind.clone(), src, message))
    }
}

impl Default for SidekickSession {
    fn default() -> Self {
        Self::with_builtins()
    }
}

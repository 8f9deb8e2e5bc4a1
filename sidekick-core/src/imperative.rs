//! Direct-dispatch path for component types whose updates bypass the reducer.
//!
//! ```text
//!   update ──► dispatch(target) ──┬── handle mounted + ready ──► process_update()
//!                                 └── otherwise ──► pending[target].push_back()
//!
//!   mount(target, handle) ──► signal_ready(target) ──► replay pending in order
//! ```
//!
//! Per target, payloads reach `process_update` in arrival order whether they
//! were delivered immediately or replayed from the queue. Nothing is ever
//! coalesced or reordered.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

use crate::state::AppState;

/// Live handle exposed by a mounted imperative instance.
pub trait UpdateHandle: Send {
    /// Apply one update to the instance's rendering surface.
    fn process_update(&mut self, payload: &Value) -> Result<(), HandleError>;
}

/// Failure raised by a handle while applying an update.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandleError {
    #[error("unsupported update: {0}")]
    Unsupported(String),
    #[error("invalid update payload: {0}")]
    InvalidPayload(String),
    #[error("surface error: {0}")]
    Surface(String),
}

/// Outcome of a single dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Applied by the ready handle.
    Delivered,
    /// Held until the target signals ready.
    Queued,
    /// The ready handle returned an error.
    Failed,
}

#[derive(Default)]
struct Slot {
    handle: Option<Box<dyn UpdateHandle>>,
    ready: bool,
    pending: VecDeque<Value>,
}

impl Slot {
    fn is_idle(&self) -> bool {
        self.handle.is_none() && self.pending.is_empty()
    }
}

/// Per-target update queues and mounted handles.
#[derive(Default)]
pub struct ImperativeDispatcher {
    slots: FxHashMap<String, Slot>,
}

impl ImperativeDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `payload` to `target`, or queue it until the target is ready.
    pub fn dispatch(&mut self, target: &str, payload: Value) -> Delivery {
        let slot = self.slots.entry(target.to_string()).or_default();
        match slot.handle.as_mut() {
            Some(handle) if slot.ready && slot.pending.is_empty() => match handle.process_update(&payload) {
                Ok(()) => Delivery::Delivered,
                Err(e) => {
                    log::warn!("Imperative update for `{target}` failed: {e}");
                    Delivery::Failed
                }
            },
            _ => {
                slot.pending.push_back(payload);
                log::trace!("Queued update for `{target}` ({} pending)", slot.pending.len());
                Delivery::Queued
            }
        }
    }

    /// Attach the handle of a freshly mounted instance. Updates keep queuing
    /// until [`signal_ready`](Self::signal_ready).
    pub fn mount(&mut self, target: &str, handle: Box<dyn UpdateHandle>) {
        let slot = self.slots.entry(target.to_string()).or_default();
        slot.handle = Some(handle);
        slot.ready = false;
        log::debug!("Mounted imperative handle for `{target}`");
    }

    /// Mark `target` ready and replay its queue.
    ///
    /// Returns the number of replayed updates. A failing update discards the
    /// rest of the queue.
    pub fn signal_ready(&mut self, target: &str) -> usize {
        let Some(slot) = self.slots.get_mut(target) else {
            log::warn!("Ready signal from `{target}` with no mounted handle");
            return 0;
        };
        let Some(handle) = slot.handle.as_mut() else {
            log::warn!("Ready signal from `{target}` with no mounted handle");
            return 0;
        };
        slot.ready = true;

        let mut replayed = 0;
        while let Some(payload) = slot.pending.pop_front() {
            if let Err(e) = handle.process_update(&payload) {
                log::warn!(
                    "Replay for `{target}` failed after {replayed} updates, discarding {} queued: {e}",
                    slot.pending.len()
                );
                slot.pending.clear();
                break;
            }
            replayed += 1;
        }

        log::debug!("`{target}` ready, replayed {replayed} updates");
        replayed
    }

    /// Detach the handle. Later updates queue again until the next mount.
    pub fn unmount(&mut self, target: &str) {
        if let Some(slot) = self.slots.get_mut(target) {
            slot.handle = None;
            slot.ready = false;
            if slot.is_idle() {
                self.slots.remove(target);
            }
        }
    }

    /// Drop queues and handles of targets no longer in `state`.
    pub fn purge(&mut self, state: &AppState) -> usize {
        let before = self.slots.len();
        self.slots.retain(|target, _| state.contains(target));
        let purged = before - self.slots.len();
        if purged > 0 {
            log::debug!("Purged {purged} stale imperative targets");
        }
        purged
    }

    pub fn pending_len(&self, target: &str) -> usize {
        self.slots.get(target).map_or(0, |slot| slot.pending.len())
    }

    pub fn is_mounted(&self, target: &str) -> bool {
        self.slots.get(target).is_some_and(|slot| slot.handle.is_some())
    }

    pub fn is_ready(&self, target: &str) -> bool {
        self.slots.get(target).is_some_and(|slot| slot.ready && slot.handle.is_some())
    }

    /// Number of targets with a handle or a non-empty queue.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl std::fmt::Debug for ImperativeDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut targets: Vec<&String> = self.slots.keys().collect();
        targets.sort();
        f.debug_struct("ImperativeDispatcher")
            .field("targets", &targets)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::ComponentState;
    use crate::state::ComponentInstance;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Records every payload; fails on payloads carrying `"fail": true`.
    struct Recorder(Arc<Mutex<Vec<Value>>>);

    impl UpdateHandle for Recorder {
        fn process_update(&mut self, payload: &Value) -> Result<(), HandleError> {
            if payload["fail"] == true {
                return Err(HandleError::Surface("boom".into()));
            }
            self.0.lock().unwrap().push(payload.clone());
            Ok(())
        }
    }

    fn recorder() -> (Box<dyn UpdateHandle>, Arc<Mutex<Vec<Value>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (Box::new(Recorder(log.clone())), log)
    }

    #[test]
    fn test_queued_updates_replay_in_order() {
        let mut dispatcher = ImperativeDispatcher::new();
        for n in 1..=3 {
            assert_eq!(dispatcher.dispatch("c1", json!({"n": n})), Delivery::Queued);
        }
        let (handle, seen) = recorder();
        dispatcher.mount("c1", handle);
        assert_eq!(dispatcher.dispatch("c1", json!({"n": 4})), Delivery::Queued);
        assert!(seen.lock().unwrap().is_empty());

        assert_eq!(dispatcher.signal_ready("c1"), 4);
        assert_eq!(dispatcher.dispatch("c1", json!({"n": 5})), Delivery::Delivered);

        let order: Vec<i64> = seen.lock().unwrap().iter().map(|v| v["n"].as_i64().unwrap()).collect();
        assert_eq!(order, [1, 2, 3, 4, 5]);
        assert_eq!(dispatcher.pending_len("c1"), 0);
    }

    #[test]
    fn test_replay_error_discards_rest() {
        let mut dispatcher = ImperativeDispatcher::new();
        dispatcher.dispatch("c1", json!({"n": 1}));
        dispatcher.dispatch("c1", json!({"fail": true}));
        dispatcher.dispatch("c1", json!({"n": 3}));
        let (handle, seen) = recorder();
        dispatcher.mount("c1", handle);

        assert_eq!(dispatcher.signal_ready("c1"), 1);
        assert_eq!(dispatcher.pending_len("c1"), 0);
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(dispatcher.is_ready("c1"));
    }

    #[test]
    fn test_failed_live_delivery() {
        let mut dispatcher = ImperativeDispatcher::new();
        let (handle, _) = recorder();
        dispatcher.mount("c1", handle);
        dispatcher.signal_ready("c1");
        assert_eq!(dispatcher.dispatch("c1", json!({"fail": true})), Delivery::Failed);
        assert_eq!(dispatcher.dispatch("c1", json!({"n": 2})), Delivery::Delivered);
    }

    #[test]
    fn test_ready_without_mount() {
        let mut dispatcher = ImperativeDispatcher::new();
        dispatcher.dispatch("c1", json!({"n": 1}));
        assert_eq!(dispatcher.signal_ready("c1"), 0);
        assert_eq!(dispatcher.signal_ready("other"), 0);
        assert_eq!(dispatcher.pending_len("c1"), 1);
        assert!(!dispatcher.is_ready("c1"));
    }

    #[test]
    fn test_unmount_requeues() {
        let mut dispatcher = ImperativeDispatcher::new();
        let (handle, seen) = recorder();
        dispatcher.mount("c1", handle);
        dispatcher.signal_ready("c1");
        dispatcher.unmount("c1");
        assert!(!dispatcher.is_mounted("c1"));
        assert!(dispatcher.is_empty());

        assert_eq!(dispatcher.dispatch("c1", json!({"n": 1})), Delivery::Queued);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_purge_drops_stale_targets() {
        let mut state = AppState::new();
        state.components_by_id.insert(
            "live".into(),
            Arc::new(ComponentInstance {
                id: "live".into(),
                kind: "canvas".into(),
                parent_id: "root".into(),
                state: Arc::new(ComponentState::Container),
            }),
        );

        let mut dispatcher = ImperativeDispatcher::new();
        dispatcher.dispatch("live", json!({}));
        dispatcher.dispatch("gone", json!({}));
        let (handle, _) = recorder();
        dispatcher.mount("also-gone", handle);

        assert_eq!(dispatcher.purge(&state), 2);
        assert_eq!(dispatcher.len(), 1);
        assert_eq!(dispatcher.pending_len("live"), 1);
    }
}

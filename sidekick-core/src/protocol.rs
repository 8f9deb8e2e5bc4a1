//! JSON wire protocol shared by Hero, Sidekick and the hub.
//!
//! Wire format (one JSON object per WebSocket text frame):
//! ```text
//! ┌────┬───────────┬──────┬─────────────────┬──────────────┬─────────┐
//! │ id │ component │ type │ target?         │ src?         │ payload │
//! │ 0  │ string    │ enum │ control msgs    │ event/error  │ any     │
//! └────┴───────────┴──────┴─────────────────┴──────────────┴─────────┘
//! ```
//!
//! `component` is either one of the reserved names (`system`, `global`) or an
//! open component-type namespace (`grid`, `canvas`, ...). A message addresses
//! at most one instance: control messages name a `target`, messages emitted by
//! an instance name their `src`.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Reserved component name for presence traffic.
pub const SYSTEM_COMPONENT: &str = "system";
/// Reserved component name for workspace-wide commands.
pub const GLOBAL_COMPONENT: &str = "global";
/// Update action that moves an instance to another container.
pub const CHANGE_PARENT_ACTION: &str = "changeParent";

/// Message types of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageKind {
    /// Peer presence declaration (`system` only)
    Announce,
    /// Drop every component instance (`global` only)
    ClearAll,
    /// Create an instance
    Spawn,
    /// Change an instance's state
    Update,
    /// Destroy an instance and its subtree
    Remove,
    /// Interaction emitted by an instance
    Event,
    /// Failure reported by an instance
    Error,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Announce => "announce",
            MessageKind::ClearAll => "clearAll",
            MessageKind::Spawn => "spawn",
            MessageKind::Update => "update",
            MessageKind::Remove => "remove",
            MessageKind::Event => "event",
            MessageKind::Error => "error",
        }
    }

    /// Control messages are addressed with `target`.
    pub fn is_control(&self) -> bool {
        matches!(self, MessageKind::Spawn | MessageKind::Update | MessageKind::Remove)
    }

    /// Instance-originated messages are addressed with `src`.
    pub fn is_emitted(&self) -> bool {
        matches!(self, MessageKind::Event | MessageKind::Error)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the session a peer plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerRole {
    Hero,
    Sidekick,
}

/// Presence status carried by an announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerStatus {
    Online,
    Offline,
}

/// Payload of `system/announce`.
///
/// `peer_id` identifies the logical peer across reconnecting sockets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncePayload {
    pub peer_id: String,
    pub role: PeerRole,
    pub status: PeerStatus,
    pub version: String,
    pub timestamp_ms: u64,
}

impl AnnouncePayload {
    /// Build an announce stamped with the current wall-clock time.
    pub fn now(
        peer_id: impl Into<String>,
        role: PeerRole,
        status: PeerStatus,
        version: impl Into<String>,
    ) -> Self {
        Self {
            peer_id: peer_id.into(),
            role,
            status,
            version: version.into(),
            timestamp_ms: now_ms(),
        }
    }

    /// Same peer, flipped to `offline` at the current time.
    pub fn to_offline(&self) -> Self {
        Self {
            status: PeerStatus::Offline,
            timestamp_ms: now_ms(),
            ..self.clone()
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == PeerStatus::Online
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// `{action, options}` body of an `update` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateAction {
    pub action: String,
    #[serde(default)]
    pub options: Value,
}

impl UpdateAction {
    pub fn is_change_parent(&self) -> bool {
        self.action == CHANGE_PARENT_ACTION
    }

    /// Decode `options` into a typed struct.
    pub fn options<T: serde::de::DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        serde_json::from_value(self.options.clone())
            .map_err(|e| ProtocolError::InvalidPayload(e.to_string()))
    }
}

/// Options of a `changeParent` update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeParentOptions {
    pub parent: String,
    /// Sibling ordering hint; accepted on the wire, not acted on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_before: Option<String>,
}

/// Top-level protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Reserved, always 0 on the wire
    #[serde(default)]
    pub id: u64,
    pub component: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Message {
    fn new(component: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            id: 0,
            component: component.into(),
            kind,
            target: None,
            src: None,
            payload: None,
        }
    }

    /// `system/announce`.
    pub fn announce(announce: &AnnouncePayload) -> Self {
        Self {
            payload: Some(serde_json::to_value(announce).unwrap_or_default()),
            ..Self::new(SYSTEM_COMPONENT, MessageKind::Announce)
        }
    }

    /// `global/clearAll`.
    pub fn clear_all() -> Self {
        Self::new(GLOBAL_COMPONENT, MessageKind::ClearAll)
    }

    /// Spawn `target` of the given component type.
    pub fn spawn(component: impl Into<String>, target: impl Into<String>, payload: Value) -> Self {
        Self {
            target: Some(target.into()),
            payload: Some(payload),
            ..Self::new(component, MessageKind::Spawn)
        }
    }

    /// Update `target` with `{action, options}`.
    pub fn update(
        component: impl Into<String>,
        target: impl Into<String>,
        action: &str,
        options: Value,
    ) -> Self {
        Self {
            target: Some(target.into()),
            payload: Some(json!({ "action": action, "options": options })),
            ..Self::new(component, MessageKind::Update)
        }
    }

    /// Update with a raw payload (imperative types take arbitrary shapes).
    pub fn update_raw(component: impl Into<String>, target: impl Into<String>, payload: Value) -> Self {
        Self {
            target: Some(target.into()),
            payload: Some(payload),
            ..Self::new(component, MessageKind::Update)
        }
    }

    /// Move `target` under `parent`.
    pub fn change_parent(
        component: impl Into<String>,
        target: impl Into<String>,
        parent: impl Into<String>,
    ) -> Self {
        let parent: String = parent.into();
        Self::update(component, target, CHANGE_PARENT_ACTION, json!({ "parent": parent }))
    }

    pub fn remove(component: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::new(component, MessageKind::Remove)
        }
    }

    /// Interaction emitted by instance `src`.
    pub fn event(component: impl Into<String>, src: impl Into<String>, payload: Value) -> Self {
        Self {
            src: Some(src.into()),
            payload: Some(payload),
            ..Self::new(component, MessageKind::Event)
        }
    }

    /// Failure reported by instance `src`.
    pub fn error(
        component: impl Into<String>,
        src: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let message: String = message.into();
        Self {
            src: Some(src.into()),
            payload: Some(json!({ "message": message })),
            ..Self::new(component, MessageKind::Error)
        }
    }

    pub fn is_system(&self) -> bool {
        self.component == SYSTEM_COMPONENT
    }

    pub fn is_global(&self) -> bool {
        self.component == GLOBAL_COMPONENT
    }

    /// Check the addressing invariants of the envelope.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.component.is_empty() {
            return Err(ProtocolError::InvalidField("component"));
        }
        if self.target.is_some() && self.src.is_some() {
            return Err(ProtocolError::TargetAndSource);
        }

        let expected = if self.is_system() {
            Some(MessageKind::Announce)
        } else if self.is_global() {
            Some(MessageKind::ClearAll)
        } else {
            None
        };

        if let Some(kind) = expected {
            if self.kind != kind {
                return Err(ProtocolError::MisroutedKind {
                    component: self.component.clone(),
                    kind: self.kind,
                });
            }
            if self.target.is_some() || self.src.is_some() {
                return Err(ProtocolError::UnexpectedAddress {
                    component: self.component.clone(),
                });
            }
            return Ok(());
        }

        if self.kind.is_control() && self.target.is_none() {
            return Err(ProtocolError::MissingField("target"));
        }
        if self.kind.is_emitted() && self.src.is_none() {
            return Err(ProtocolError::MissingField("src"));
        }
        if !self.kind.is_control() && !self.kind.is_emitted() {
            return Err(ProtocolError::MisroutedKind {
                component: self.component.clone(),
                kind: self.kind,
            });
        }
        Ok(())
    }

    /// Serialize to a text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    /// Parse and validate a text frame.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let raw: Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;
        let fields = raw.as_object().ok_or(ProtocolError::NotAnObject)?;

        for field in ["component", "type"] {
            match fields.get(field) {
                Some(Value::String(_)) => {}
                Some(_) => return Err(ProtocolError::InvalidField(field)),
                None => return Err(ProtocolError::MissingField(field)),
            }
        }

        let msg: Message = serde_json::from_value(raw)
            .map_err(|e| ProtocolError::InvalidEnvelope(e.to_string()))?;
        msg.validate()?;
        Ok(msg)
    }

    /// Parse the announce payload of a `system/announce`.
    pub fn announce_payload(&self) -> Result<AnnouncePayload, ProtocolError> {
        if !self.is_system() || self.kind != MessageKind::Announce {
            return Err(ProtocolError::InvalidMessageType);
        }
        let payload = self.payload.clone().ok_or(ProtocolError::MissingField("payload"))?;
        serde_json::from_value(payload).map_err(|e| ProtocolError::InvalidPayload(e.to_string()))
    }

    /// Parse `{action, options}` from an update payload.
    pub fn update_action(&self) -> Option<UpdateAction> {
        if self.kind != MessageKind::Update {
            return None;
        }
        self.payload
            .as_ref()
            .and_then(|p| serde_json::from_value(p.clone()).ok())
    }

    /// Payload or JSON `null`.
    pub fn payload_or_null(&self) -> &Value {
        static NULL: Value = Value::Null;
        self.payload.as_ref().unwrap_or(&NULL)
    }
}

/// Protocol errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("message is not a JSON object")]
    NotAnObject,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{0}` has an invalid value")]
    InvalidField(&'static str),
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),
    #[error("message carries both `target` and `src`")]
    TargetAndSource,
    #[error("`{component}` messages must not carry `target` or `src`")]
    UnexpectedAddress { component: String },
    #[error("`{kind}` is not a valid type for component `{component}`")]
    MisroutedKind { component: String, kind: MessageKind },
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("invalid message type")]
    InvalidMessageType,
}

//! # sidekick-core — Component state synchronization for Sidekick
//!
//! A Hero script drives UI component instances hosted by a Sidekick client.
//! This crate owns the wire protocol and the client-side state machine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   JSON frames   ┌──────────────────┐
//! │ Hero        │ ──────────────► │ SidekickSession  │
//! │ (driver)    │ ◄────────────── │ (per client)     │
//! └─────────────┘  event / error  └────────┬─────────┘
//!                                          │
//!                        ┌─────────────────┴────────────────┐
//!                        ▼                                  ▼
//!               ┌─────────────────┐               ┌───────────────────┐
//!               │ reducer         │               │ ImperativeDispatch│
//!               │ Arc<AppState>   │               │ queue → handle    │
//!               └────────┬────────┘               └───────────────────┘
//!                        │
//!                        ▼
//!               ┌─────────────────┐
//!               │ComponentRegistry│
//!               │ type → fns+flags│
//!               └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] — JSON envelope, announce payload, validation
//! - [`registry`] — component type → behavior table
//! - [`components`] — built-in component types
//! - [`state`] — immutable application state tree
//! - [`reducer`] — pure state transitions
//! - [`imperative`] — queued direct dispatch for imperative types
//! - [`session`] — decode → route → apply
//! - [`events`] — interaction event builders

pub mod components;
pub mod events;
pub mod imperative;
pub mod protocol;
pub mod reducer;
pub mod registry;
pub mod session;
pub mod state;

// Re-exports for convenience
pub use components::ComponentState;
pub use imperative::{Delivery, HandleError, ImperativeDispatcher, UpdateHandle};
pub use protocol::{
    AnnouncePayload, ChangeParentOptions, Message, MessageKind, PeerRole, PeerStatus,
    ProtocolError, UpdateAction, GLOBAL_COMPONENT, SYSTEM_COMPONENT,
};
pub use reducer::reduce;
pub use registry::{ComponentDefinition, ComponentRegistry, RegistryError, SpawnError};
pub use session::{Outcome, SidekickSession};
pub use state::{AppState, ComponentInstance, ROOT_ID};

//! Signal system for record lifecycle events
//!
//! This crate provides the event types dispatched around soft-delete
//! operations, the [`EventDispatcher`] contract record stores consume, and a
//! callback-based [`SignalManager`] implementing it.

pub mod event;
pub mod manager;
pub mod prelude;
pub mod types;

pub use event::{DatabaseEvent, EventType};
pub use manager::{CallbackId, SignalManager};
pub use types::{EventCallback, EventDispatcher, EventResult};

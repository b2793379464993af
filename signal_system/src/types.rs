//! Type definitions for signal system
//!
//! This module contains the dispatch contract shared with record stores and
//! the callback type used by [`crate::SignalManager`].

use crate::event::DatabaseEvent;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

/// Outcome of dispatching an event through the handler pipeline
#[derive(Debug, Clone, Default, PartialEq)]
pub enum EventResult {
    /// Let the operation carry on
    #[default]
    Continue,
    /// Halt the operation; the value becomes the operation's result
    Stop(Value),
}

impl EventResult {
    /// Stop the operation, reporting `result` to the caller
    pub fn stop(result: impl Into<Value>) -> Self {
        EventResult::Stop(result.into())
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, EventResult::Stop(_))
    }

    /// The value carried by a stop, `None` when the pipeline continued
    pub fn result(&self) -> Option<&Value> {
        match self {
            EventResult::Continue => None,
            EventResult::Stop(value) => Some(value),
        }
    }
}

/// Async event callback type that returns the pipeline decision
pub type EventCallback =
    Arc<dyn Fn(DatabaseEvent) -> BoxFuture<'static, anyhow::Result<EventResult>> + Send + Sync>;

/// Dispatches lifecycle events to whatever handlers are registered
#[async_trait]
pub trait EventDispatcher: Send + Sync {
    async fn dispatch(&self, event: DatabaseEvent) -> anyhow::Result<EventResult>;
}

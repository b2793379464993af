use crate::event::{DatabaseEvent, EventType};
use crate::types::{EventCallback, EventDispatcher, EventResult};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Handle returned when registering a callback, used to remove it later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

struct Registration {
    id: CallbackId,
    event_type: Option<EventType>,
    callback: EventCallback,
}

/// Signal manager for record lifecycle events
///
/// Callbacks run in registration order. The first callback returning
/// [`EventResult::Stop`] ends the dispatch and its value is reported back.
pub struct SignalManager {
    callbacks: RwLock<Vec<Registration>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for SignalManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalManager")
            .field("callback_count", &self.callback_count())
            .finish()
    }
}

impl SignalManager {
    pub fn new() -> Self {
        Self {
            callbacks: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add a synchronous callback for every event type
    pub fn add_callback<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&DatabaseEvent) -> EventResult + Send + Sync + 'static,
    {
        self.register(None, Self::wrap_sync(callback))
    }

    /// Add a synchronous callback for one event type
    pub fn on<F>(&self, event_type: EventType, callback: F) -> CallbackId
    where
        F: Fn(&DatabaseEvent) -> EventResult + Send + Sync + 'static,
    {
        self.register(Some(event_type), Self::wrap_sync(callback))
    }

    /// Add an async callback; `None` subscribes to every event type
    pub fn add_async_callback<F>(&self, event_type: Option<EventType>, callback: F) -> CallbackId
    where
        F: Fn(DatabaseEvent) -> BoxFuture<'static, anyhow::Result<EventResult>>
            + Send
            + Sync
            + 'static,
    {
        self.register(event_type, Arc::new(callback))
    }

    /// Remove a previously registered callback, returns whether it was present
    pub fn remove_callback(&self, id: CallbackId) -> bool {
        match self.callbacks.write() {
            Ok(mut callbacks) => {
                let before = callbacks.len();
                callbacks.retain(|registration| registration.id != id);
                callbacks.len() != before
            }
            Err(_) => false,
        }
    }

    /// Clear all callbacks
    pub fn clear_callbacks(&self) {
        if let Ok(mut callbacks) = self.callbacks.write() {
            callbacks.clear();
        }
    }

    /// Get number of registered callbacks
    pub fn callback_count(&self) -> usize {
        self.callbacks.read().map(|c| c.len()).unwrap_or(0)
    }

    fn register(&self, event_type: Option<EventType>, callback: EventCallback) -> CallbackId {
        let id = CallbackId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut callbacks) = self.callbacks.write() {
            callbacks.push(Registration {
                id,
                event_type,
                callback,
            });
        }
        id
    }

    fn wrap_sync<F>(callback: F) -> EventCallback
    where
        F: Fn(&DatabaseEvent) -> EventResult + Send + Sync + 'static,
    {
        Arc::new(move |event: DatabaseEvent| {
            let result = callback(&event);
            let future: BoxFuture<'static, anyhow::Result<EventResult>> =
                Box::pin(async move { Ok(result) });
            future
        })
    }

    /// Snapshot the callbacks for `event_type` so the lock is not held across awaits
    fn callbacks_for(&self, event_type: EventType) -> Vec<EventCallback> {
        self.callbacks
            .read()
            .map(|callbacks| {
                callbacks
                    .iter()
                    .filter(|r| r.event_type.map_or(true, |t| t == event_type))
                    .map(|r| r.callback.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for SignalManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventDispatcher for SignalManager {
    async fn dispatch(&self, event: DatabaseEvent) -> anyhow::Result<EventResult> {
        let callbacks = self.callbacks_for(event.event_type);

        #[cfg(feature = "debug-logging")]
        tracing::debug!(
            "[SIGNAL] {} on {} -> {} callback(s)",
            event.name(),
            event.table_name,
            callbacks.len()
        );

        for callback in callbacks {
            let result = callback(event.clone()).await?;
            if result.is_stopped() {
                #[cfg(feature = "debug-logging")]
                tracing::debug!("[SIGNAL] {} stopped by callback", event.name());
                return Ok(result);
            }
        }

        Ok(EventResult::Continue)
    }
}

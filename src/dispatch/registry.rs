//! Topic handler registry
//!
//! Maps a topic to the caller code that should run when the server reports
//! that a task for that topic has fired. Registration and removal may happen
//! from any thread while the connection task dispatches concurrently.
//!
//! Handler failures stay inside [`HandlerRegistry::dispatch`]: an `Err` or a
//! panic from one handler is logged and does not reach the connection or any
//! other topic.

use std::error::Error;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use tracing::{debug, error, info, warn};

use crate::transport::message::Message;
use crate::utils::error::ClientError;

pub type HandlerError = Box<dyn Error + Send + Sync>;
pub type HandlerResult = Result<(), HandlerError>;

/// Business logic invoked for a triggered task.
pub trait TaskHandler: Send + Sync {
    fn handle(&self, message: &Message) -> HandlerResult;
}

impl<F> TaskHandler for F
where
    F: Fn(&Message) -> HandlerResult + Send + Sync,
{
    fn handle(&self, message: &Message) -> HandlerResult {
        self(message)
    }
}

/// Result of a single [`HandlerRegistry::dispatch`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Handled,
    NoHandler,
    Failed,
}

static SHARED: LazyLock<Arc<HandlerRegistry>> = LazyLock::new(|| Arc::new(HandlerRegistry::new()));

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<String, Arc<dyn TaskHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    /// Process-wide default registry for callers that don't want to own one.
    /// Clients only use it when it is handed to them explicitly.
    pub fn shared() -> Arc<HandlerRegistry> {
        Arc::clone(&SHARED)
    }

    /// Registers a closure for `topic`, replacing any previous handler.
    pub fn register<F>(&self, topic: impl Into<String>, handler: F) -> Result<(), ClientError>
    where
        F: Fn(&Message) -> HandlerResult + Send + Sync + 'static,
    {
        self.register_arc(topic, Arc::new(handler))
    }

    /// Like [`register`](Self::register) for handlers that are already
    /// shared or implement [`TaskHandler`] on their own type.
    pub fn register_arc(
        &self,
        topic: impl Into<String>,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<(), ClientError> {
        let topic = topic.into();
        if topic.is_empty() {
            return Err(ClientError::EmptyTopic);
        }

        if self.handlers.insert(topic.clone(), handler).is_some() {
            warn!(%topic, "replaced existing handler");
        } else {
            debug!(%topic, "registered handler");
        }
        Ok(())
    }

    /// Removes the handler for `topic`, returning whether one existed.
    pub fn unregister(&self, topic: &str) -> bool {
        let removed = self.handlers.remove(topic).is_some();
        if removed {
            debug!(%topic, "unregistered handler");
        }
        removed
    }

    pub fn has_handler(&self, topic: &str) -> bool {
        self.handlers.contains_key(topic)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Runs the handler registered for `message.topic()`, if any.
    pub fn dispatch(&self, message: &Message) -> Delivery {
        // Clone out of the map so the shard lock is not held while user code
        // runs; a handler may register or unregister topics itself.
        let handler = match self.handlers.get(message.topic()) {
            Some(entry) => Arc::clone(entry.value()),
            None => {
                info!(topic = message.topic(), "no handler registered for topic");
                return Delivery::NoHandler;
            }
        };

        match catch_unwind(AssertUnwindSafe(|| handler.handle(message))) {
            Ok(Ok(())) => Delivery::Handled,
            Ok(Err(e)) => {
                error!(topic = message.topic(), error = %e, "task handler failed");
                Delivery::Failed
            }
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(topic = message.topic(), %reason, "task handler panicked");
                Delivery::Failed
            }
        }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let topics: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        f.debug_struct("HandlerRegistry")
            .field("topics", &topics)
            .finish()
    }
}

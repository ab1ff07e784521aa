use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::dispatch::registry::{Delivery, HandlerRegistry};
use crate::transport::message::{Message, MessageType};

/// What the dispatcher did with an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Heartbeat or acknowledgement, nothing to do.
    Acknowledged,
    /// A trigger was routed to the registry.
    Triggered(Delivery),
    /// Message kind the client does not understand; dropped.
    Ignored,
}

/// Routes decoded messages by type.
///
/// Holds no state of its own besides the registry it forwards triggers to.
/// Nothing here closes the connection: unknown kinds and handler failures
/// are logged and dropped.
#[derive(Debug, Clone)]
pub struct MessageDispatcher {
    registry: Arc<HandlerRegistry>,
}

impl MessageDispatcher {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn dispatch(&self, message: &Message) -> DispatchOutcome {
        match message.message_type() {
            MessageType::Pong => {
                trace!(?message, "received PONG");
                DispatchOutcome::Acknowledged
            }
            MessageType::TaskReceived => {
                debug!(?message, "timer has received the task");
                DispatchOutcome::Acknowledged
            }
            MessageType::TaskTriggered => {
                info!(?message, "received TASK_TRIGGERED");
                DispatchOutcome::Triggered(self.registry.dispatch(message))
            }
            other => {
                warn!(
                    code = other.code(),
                    topic = message.topic(),
                    "dropping message of unexpected type"
                );
                DispatchOutcome::Ignored
            }
        }
    }
}

//! The `dispatch` module routes inbound messages to caller code.
//!
//! `MessageDispatcher` decides by message type what to do with a decoded
//! frame; trigger notifications are forwarded to the `HandlerRegistry`,
//! which owns the topic → handler mapping.

pub mod dispatcher;
pub mod registry;

pub use dispatcher::{DispatchOutcome, MessageDispatcher};
pub use registry::{Delivery, HandlerError, HandlerRegistry, HandlerResult, TaskHandler};

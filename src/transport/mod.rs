//! The `transport` module defines what travels over the wire: the
//! `Message` record and the `FrameCodec` that turns it into length-prefixed
//! binary frames and back.

pub mod codec;
pub mod message;

pub use codec::FrameCodec;
pub use message::{Message, MessageType};

#[cfg(test)]
mod tests;

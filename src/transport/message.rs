//! Wire-level message record
//!
//! A `Message` is built once per send or receive event and never mutated.
//! The topic length written on the wire is always derived from the encoded
//! topic, so the declared and actual lengths cannot disagree.

use std::fmt;

use bytes::Bytes;

use crate::utils::error::ClientError;

/// Protocol identifier carried at the start of every message.
pub const MAGIC: u32 = 0x0735_5608;

/// Current protocol version.
pub const VERSION: u32 = 1;

/// Maximum encoded topic length in bytes.
pub const MAX_TOPIC_LEN: usize = 1024;

/// Smallest delay accepted for a SCHEDULE message.
pub const MIN_DELAY_MS: i64 = 1000;

/// Topic and payload used for heartbeat pings.
pub const PING_TOPIC: &str = "CLIENT-PING";
pub const PING_PAYLOAD: &[u8] = b"PING";

/// Message kind. Each known kind has its own code; unknown codes are kept
/// as-is so newer servers can introduce kinds without breaking this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Ping,
    Pong,
    Schedule,
    TaskReceived,
    TaskTriggered,
    Unknown(u32),
}

impl MessageType {
    pub const fn code(self) -> u32 {
        match self {
            MessageType::Ping => 0x01,
            MessageType::Pong => 0x02,
            MessageType::Schedule => 0x03,
            MessageType::TaskReceived => 0x04,
            MessageType::TaskTriggered => 0x05,
            MessageType::Unknown(code) => code,
        }
    }

    pub const fn from_code(code: u32) -> Self {
        match code {
            0x01 => MessageType::Ping,
            0x02 => MessageType::Pong,
            0x03 => MessageType::Schedule,
            0x04 => MessageType::TaskReceived,
            0x05 => MessageType::TaskTriggered,
            other => MessageType::Unknown(other),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    magic: u32,
    version: u32,
    message_type: MessageType,
    topic: String,
    delay: i64,
    payload: Bytes,
}

impl Message {
    /// Assemble a message from already-validated parts. Used by the decoder
    /// and by tests that need to fabricate inbound traffic.
    pub fn from_parts(
        magic: u32,
        version: u32,
        message_type: MessageType,
        topic: impl Into<String>,
        delay: i64,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            magic,
            version,
            message_type,
            topic: topic.into(),
            delay,
            payload: payload.into(),
        }
    }

    /// A message of `message_type` with the current magic and version.
    pub fn new(
        message_type: MessageType,
        topic: impl Into<String>,
        delay: i64,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self::from_parts(MAGIC, VERSION, message_type, topic, delay, payload)
    }

    /// Heartbeat probe.
    pub fn ping() -> Self {
        Self::new(
            MessageType::Ping,
            PING_TOPIC,
            0,
            Bytes::from_static(PING_PAYLOAD),
        )
    }

    /// Request that the server deliver `payload` to `topic` after `delay_ms`.
    pub fn schedule(
        topic: impl Into<String>,
        delay_ms: i64,
        payload: impl Into<Bytes>,
    ) -> Result<Self, ClientError> {
        let topic = topic.into();
        let payload = payload.into();

        if delay_ms < MIN_DELAY_MS {
            return Err(ClientError::DelayTooShort(delay_ms));
        }
        if topic.is_empty() {
            return Err(ClientError::EmptyTopic);
        }
        if topic.len() > MAX_TOPIC_LEN {
            return Err(ClientError::TopicTooLong(topic.len()));
        }
        if payload.is_empty() {
            return Err(ClientError::EmptyPayload);
        }

        Ok(Self::new(MessageType::Schedule, topic, delay_ms, payload))
    }

    pub fn magic(&self) -> u32 {
        self.magic
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Encoded byte length of the topic.
    pub fn topic_length(&self) -> usize {
        self.topic.len()
    }

    pub fn delay(&self) -> i64 {
        self.delay
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

impl fmt::Debug for Message {
    // Large payloads are cut so log lines stay readable
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const PREVIEW: usize = 100;
        let preview = if self.payload.len() > PREVIEW {
            format!(
                "{}...(truncated)",
                String::from_utf8_lossy(&self.payload[..PREVIEW])
            )
        } else {
            String::from_utf8_lossy(&self.payload).into_owned()
        };

        f.debug_struct("Message")
            .field("magic", &format_args!("0x{:x}", self.magic))
            .field("version", &self.version)
            .field("type", &self.message_type)
            .field("topic_length", &self.topic.len())
            .field("topic", &self.topic)
            .field("delay", &self.delay)
            .field("payload_length", &self.payload.len())
            .field("payload", &preview)
            .finish()
    }
}

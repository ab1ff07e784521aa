//! The `error` module defines the error types used within `stclient`.
//!
//! Errors are split by where they surface:
//! - `ConfigError` is returned while building or loading a `ClientConfig`.
//! - `CodecError` is produced by the frame codec. Every variant except `Io`
//!   is a protocol violation and closes the current connection.
//! - `ClientError` is what callers of `TimerClient` see.

use std::io;

use thiserror::Error;

/// Configuration validation and loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("host cannot be empty")]
    EmptyHost,

    #[error("port must be between 1 and 65535")]
    InvalidPort,

    #[error("heartbeat interval must be positive")]
    ZeroHeartbeatInterval,

    #[error("connect timeout must be positive")]
    ZeroConnectTimeout,

    #[error(
        "initial reconnect delay ({initial_ms} ms) cannot be greater than \
         max reconnect delay ({max_ms} ms)"
    )]
    DelayOrdering { initial_ms: u64, max_ms: u64 },

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Frame-level decode/encode failures.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("transport error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid magic number 0x{found:x}, expected 0x{expected:x}")]
    BadMagic { found: u32, expected: u32 },

    #[error("invalid topic length {0}, must be between 0 and 1024")]
    InvalidTopicLength(i64),

    #[error("frame of {0} bytes exceeds the maximum frame length")]
    FrameTooLarge(usize),

    #[error("frame of {0} bytes is shorter than the message header")]
    FrameTooShort(usize),

    #[error("topic of {topic_len} bytes does not fit in a frame of {frame_len} bytes")]
    TopicOverflow { topic_len: usize, frame_len: usize },
}

/// Errors returned by the public client surface.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("delay must be at least 1000 milliseconds, got {0}")]
    DelayTooShort(i64),

    #[error("topic must not be empty")]
    EmptyTopic,

    #[error("topic of {0} bytes exceeds the 1024 byte limit")]
    TopicTooLong(usize),

    #[error("payload must not be empty")]
    EmptyPayload,

    #[error("failed to produce payload: {0}")]
    Payload(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("client is not connected")]
    NotConnected,

    #[error("client has been shut down")]
    ShutDown,

    #[error("client must be started from within a tokio runtime")]
    NoRuntime,

    #[error("write was dropped before completion")]
    WriteAborted,

    #[error(transparent)]
    Codec(#[from] CodecError),
}

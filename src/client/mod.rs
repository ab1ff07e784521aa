//! The `client` module is the caller-facing side of `stclient`.
//!
//! It provides the `TimerClient` handle, and behind it the connection
//! manager that owns the socket, drives reconnection with exponential
//! backoff and keeps the link alive with periodic heartbeats.

pub mod backoff;
pub mod connection;
pub mod heartbeat;
pub mod timer_client;

pub use backoff::backoff_delay;
pub use connection::ConnectionState;
pub use heartbeat::HeartbeatScheduler;
pub use timer_client::{TimerClient, WriteFuture};

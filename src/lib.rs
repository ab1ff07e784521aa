//! # stclient
//!
//! `stclient` is the client side of a remote task-scheduling service. It keeps
//! one TCP connection to the timer server, asks it to fire tasks after a
//! delay, and routes the server's trigger notifications to handlers
//! registered per topic.
//!
//! ## Core Modules
//!
//! - `client`: The `TimerClient` handle, the connection task with its reconnect
//!   backoff and the heartbeat timer.
//! - `config`: Client settings, their builder and loading from file and environment.
//! - `dispatch`: Routing of inbound messages and the topic → handler registry.
//! - `transport`: The `Message` record and the binary frame codec.
//! - `utils`: Errors, logging setup and the payload serializer.
//!
//! ```no_run
//! use stclient::{ClientConfig, TimerClient};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let client = TimerClient::new(ClientConfig::builder("127.0.0.1", 8080).build()?);
//! client.register_handler("orders", |message| {
//!     println!("order due: {:?}", message.payload());
//!     Ok(())
//! })?;
//! client.start()?;
//! client.schedule("orders", 5_000, "order-42").await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod dispatch;
pub mod transport;
pub mod utils;

pub use client::{ConnectionState, TimerClient, WriteFuture};
pub use config::{ClientConfig, ClientConfigBuilder, load_config};
pub use dispatch::{HandlerRegistry, HandlerResult, TaskHandler};
pub use transport::{FrameCodec, Message, MessageType};
pub use utils::error::{ClientError, CodecError, ConfigError};

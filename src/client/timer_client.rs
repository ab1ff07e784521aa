//! Public client handle
//!
//! `TimerClient` is what applications hold. Every method can be called from
//! any thread; handler registration goes straight to the concurrent
//! registry, everything touching the socket is handed to the connection
//! task. Delivery is at-most-once: a successful write only means the frame
//! left the local socket. The server's TASK_RECEIVED acknowledgement arrives
//! later through the dispatcher.

use std::error::Error;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::client::connection::{Command, ConnectionManager, ConnectionShared, ConnectionState};
use crate::config::ClientConfig;
use crate::dispatch::{HandlerRegistry, HandlerResult, MessageDispatcher, TaskHandler};
use crate::transport::message::{MIN_DELAY_MS, Message};
use crate::utils::error::ClientError;
use crate::utils::serializer;

pub struct TimerClient {
    config: Arc<ClientConfig>,
    registry: Arc<HandlerRegistry>,
    shared: Arc<ConnectionShared>,
    commands: mpsc::UnboundedSender<Command>,
    pending_commands: Mutex<Option<mpsc::UnboundedReceiver<Command>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TimerClient {
    /// Creates a client with its own handler registry.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_registry(config, Arc::new(HandlerRegistry::new()))
    }

    /// Creates a client that dispatches triggers to `registry`, which may be
    /// shared with other clients or be [`HandlerRegistry::shared`].
    pub fn with_registry(config: ClientConfig, registry: Arc<HandlerRegistry>) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        Self {
            config: Arc::new(config),
            registry,
            shared: Arc::new(ConnectionShared::new()),
            commands,
            pending_commands: Mutex::new(Some(receiver)),
            task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Starts connecting in the background. Must be called from within a
    /// tokio runtime the first time.
    ///
    /// Calling it again is a no-op unless the client dropped to
    /// `Disconnected` (auto-reconnect off), in which case a new connect
    /// attempt is made.
    pub fn start(&self) -> Result<(), ClientError> {
        if self.shared.is_shutting_down() {
            return Err(ClientError::ShutDown);
        }

        let mut pending = self.pending_commands.lock();
        if pending.is_some() {
            let runtime = Handle::try_current().map_err(|_| ClientError::NoRuntime)?;
            let Some(receiver) = pending.take() else {
                return Ok(());
            };

            info!(address = %self.config.address(), "starting timer client");
            let manager = ConnectionManager::new(
                Arc::clone(&self.config),
                Arc::clone(&self.shared),
                MessageDispatcher::new(Arc::clone(&self.registry)),
                receiver,
            );
            *self.task.lock() = Some(runtime.spawn(manager.run()));
            return Ok(());
        }
        drop(pending);

        if self.state() == ConnectionState::Disconnected {
            self.commands
                .send(Command::Connect)
                .map_err(|_| ClientError::ShutDown)?;
        }
        Ok(())
    }

    /// Stops the client. Safe to call any number of times from any thread;
    /// only the first call has an effect.
    pub fn shutdown(&self) {
        if self.shared.begin_shutdown() {
            info!("shutting down timer client");
        }
    }

    /// Waits for the connection task to finish after [`shutdown`](Self::shutdown)
    /// or after the client gave up reconnecting.
    pub async fn join(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(error = %e, "connection task ended abnormally");
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.shared.state() == ConnectionState::Connected
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Consecutive failures since the last successful connect.
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.reconnect_attempts()
    }

    /// Resolves to true once connected, or false on timeout or shutdown.
    pub async fn wait_until_connected(&self, timeout: Duration) -> bool {
        let mut state = self.shared.subscribe();
        let reached = tokio::time::timeout(
            timeout,
            state.wait_for(|s| {
                matches!(s, ConnectionState::Connected | ConnectionState::ShuttingDown)
            }),
        )
        .await;

        matches!(reached, Ok(Ok(s)) if *s == ConnectionState::Connected)
    }

    /// Resolves once the client is shutting down, whether requested or
    /// because reconnecting was given up.
    pub async fn closed(&self) {
        let mut state = self.shared.subscribe();
        let _ = state
            .wait_for(|s| *s == ConnectionState::ShuttingDown)
            .await;
    }

    /// Asks the server to deliver `payload` to `topic` after `delay_ms`.
    ///
    /// Validation and the connection check happen now; the returned future
    /// only waits for the write. An invalid request or a disconnected client
    /// yields an already-failed future and nothing is sent.
    pub fn schedule_async(
        &self,
        topic: &str,
        delay_ms: i64,
        payload: impl Into<Bytes>,
    ) -> WriteFuture {
        match Message::schedule(topic, delay_ms, payload) {
            Ok(message) => self.submit(message),
            Err(e) => {
                warn!(%topic, delay_ms, error = %e, "rejected schedule request");
                WriteFuture::failed(e)
            }
        }
    }

    /// Like [`schedule_async`](Self::schedule_async), but builds the payload
    /// with `supplier`. A supplier failure is reported to the caller and
    /// leaves the connection alone.
    pub fn schedule_with<F, E>(&self, topic: &str, delay_ms: i64, supplier: F) -> WriteFuture
    where
        F: FnOnce() -> Result<Vec<u8>, E>,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        if delay_ms < MIN_DELAY_MS {
            return WriteFuture::failed(ClientError::DelayTooShort(delay_ms));
        }

        match supplier() {
            Ok(payload) => self.schedule_async(topic, delay_ms, payload),
            Err(e) => {
                let e = e.into();
                error!(%topic, error = %e, "payload supplier failed");
                WriteFuture::failed(ClientError::Payload(e))
            }
        }
    }

    /// Schedules a serde value, encoded with [`serializer::to_bytes`].
    pub fn schedule_value<T: Serialize>(
        &self,
        topic: &str,
        delay_ms: i64,
        value: &T,
    ) -> WriteFuture {
        self.schedule_with(topic, delay_ms, || serializer::to_bytes(value))
    }

    /// Awaits the write and reports whether it succeeded.
    pub async fn schedule(&self, topic: &str, delay_ms: i64, payload: impl Into<Bytes>) -> bool {
        match self.schedule_async(topic, delay_ms, payload).await {
            Ok(()) => true,
            Err(e) => {
                warn!(%topic, error = %e, "scheduling failed");
                false
            }
        }
    }

    /// Blocking variant of [`schedule`](Self::schedule) for threads outside
    /// the runtime. Panics if called from an async context.
    pub fn schedule_blocking(&self, topic: &str, delay_ms: i64, payload: impl Into<Bytes>) -> bool {
        match self.schedule_async(topic, delay_ms, payload).wait() {
            Ok(()) => true,
            Err(e) => {
                warn!(%topic, error = %e, "scheduling failed");
                false
            }
        }
    }

    pub fn register_handler<F>(&self, topic: &str, handler: F) -> Result<(), ClientError>
    where
        F: Fn(&Message) -> HandlerResult + Send + Sync + 'static,
    {
        self.registry.register(topic, handler)
    }

    pub fn register_task_handler(
        &self,
        topic: &str,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<(), ClientError> {
        self.registry.register_arc(topic, handler)
    }

    pub fn unregister_handler(&self, topic: &str) -> bool {
        self.registry.unregister(topic)
    }

    pub fn has_handler(&self, topic: &str) -> bool {
        self.registry.has_handler(topic)
    }

    fn submit(&self, message: Message) -> WriteFuture {
        if self.shared.is_shutting_down() {
            return WriteFuture::failed(ClientError::ShutDown);
        }
        if !self.is_connected() {
            return WriteFuture::failed(ClientError::NotConnected);
        }

        let (reply, receiver) = oneshot::channel();
        debug!(topic = message.topic(), delay = message.delay(), "queueing write");
        if self.commands.send(Command::Write { message, reply }).is_err() {
            return WriteFuture::failed(ClientError::ShutDown);
        }
        WriteFuture::pending(receiver)
    }
}

impl Drop for TimerClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Completion of a write handed to the connection task.
#[must_use = "futures do nothing unless awaited"]
pub struct WriteFuture {
    inner: WriteState,
}

enum WriteState {
    Failed(Option<ClientError>),
    Pending(oneshot::Receiver<Result<(), ClientError>>),
}

impl WriteFuture {
    fn failed(error: ClientError) -> Self {
        Self {
            inner: WriteState::Failed(Some(error)),
        }
    }

    fn pending(receiver: oneshot::Receiver<Result<(), ClientError>>) -> Self {
        Self {
            inner: WriteState::Pending(receiver),
        }
    }

    /// Blocks the current thread until the write completes. If the
    /// connection task goes away first the write is reported as aborted and
    /// is not retried. Panics if called from an async context.
    pub fn wait(self) -> Result<(), ClientError> {
        match self.inner {
            WriteState::Failed(error) => Err(error.unwrap_or(ClientError::WriteAborted)),
            WriteState::Pending(receiver) => receiver
                .blocking_recv()
                .unwrap_or(Err(ClientError::WriteAborted)),
        }
    }
}

impl Future for WriteFuture {
    type Output = Result<(), ClientError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            WriteState::Failed(error) => {
                Poll::Ready(Err(error.take().unwrap_or(ClientError::WriteAborted)))
            }
            WriteState::Pending(receiver) => Pin::new(receiver)
                .poll(cx)
                .map(|result| result.unwrap_or(Err(ClientError::WriteAborted))),
        }
    }
}

impl std::fmt::Debug for TimerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerClient")
            .field("address", &self.config.address())
            .field("state", &self.state())
            .field("registry", &self.registry)
            .finish()
    }
}

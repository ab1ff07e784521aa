//! Connection manager
//!
//! A single task owns the TCP stream together with every timer tied to it
//! (heartbeat, pending reconnect) and is the only place that reads, writes
//! or moves the connection between states:
//!
//! ```text
//! Disconnected --start--> Connecting --ok--> Connected
//!                             ^  |                |
//!                   backoff   |  | failure        | closed / heartbeat or
//!                             +--+                | read failure / bad frame
//!                             ^                   |
//!                             +-------------------+
//! any --shutdown or too many failures--> ShuttingDown (terminal)
//! ```
//!
//! Callers talk to it through an unbounded command channel and observe it
//! through [`ConnectionShared`]. The one transition made outside the task is
//! the shutdown guard, which callers flip directly so that no new work is
//! accepted from the moment `shutdown()` returns.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Sleep;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::backoff::backoff_delay;
use crate::client::heartbeat::HeartbeatScheduler;
use crate::config::ClientConfig;
use crate::dispatch::MessageDispatcher;
use crate::transport::codec::FrameCodec;
use crate::transport::message::Message;
use crate::utils::error::{ClientError, CodecError};

/// Upper bound on flushing the socket during teardown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    ShuttingDown,
}

pub(crate) enum Command {
    Connect,
    Write {
        message: Message,
        reply: oneshot::Sender<Result<(), ClientError>>,
    },
}

/// State readable from any thread.
#[derive(Debug)]
pub(crate) struct ConnectionShared {
    state: watch::Sender<ConnectionState>,
    reconnect_attempts: AtomicU32,
    shutdown: AtomicBool,
    cancel: CancellationToken,
}

impl ConnectionShared {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            state,
            reconnect_attempts: AtomicU32::new(0),
            shutdown: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub(crate) fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// One-shot: returns true only for the caller that flipped the guard.
    pub(crate) fn begin_shutdown(&self) -> bool {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.state.send_replace(ConnectionState::ShuttingDown);
        self.cancel.cancel();
        true
    }

    /// ShuttingDown is absorbing; any other transition is ignored once it
    /// has been entered.
    fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == ConnectionState::ShuttingDown || *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

pub(crate) struct ConnectionManager {
    config: Arc<ClientConfig>,
    shared: Arc<ConnectionShared>,
    dispatcher: MessageDispatcher,
    commands: mpsc::UnboundedReceiver<Command>,
    reader: Option<FramedRead<OwnedReadHalf, FrameCodec>>,
    writer: Option<FramedWrite<OwnedWriteHalf, FrameCodec>>,
    heartbeat: HeartbeatScheduler,
    reconnect: Option<Pin<Box<Sleep>>>,
}

impl ConnectionManager {
    pub(crate) fn new(
        config: Arc<ClientConfig>,
        shared: Arc<ConnectionShared>,
        dispatcher: MessageDispatcher,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let heartbeat = HeartbeatScheduler::new(config.heartbeat_interval());
        Self {
            config,
            shared,
            dispatcher,
            commands,
            reader: None,
            writer: None,
            heartbeat,
            reconnect: None,
        }
    }

    /// Event loop. Returns once the client is shut down, either on request,
    /// after giving up on reconnecting, or because every client handle was
    /// dropped.
    pub(crate) async fn run(mut self) {
        self.connect().await;

        let cancel = self.shared.cancel.clone();
        loop {
            if self.shared.is_shutting_down() {
                break;
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!("all client handles dropped");
                        break;
                    }
                },

                _ = wait_for(&mut self.reconnect) => {
                    self.reconnect = None;
                    self.connect().await;
                }

                _ = self.heartbeat.tick() => self.send_heartbeat().await,

                frame = next_frame(&mut self.reader) => self.handle_frame(frame),
            }
        }

        self.teardown().await;
    }

    async fn connect(&mut self) {
        if self.shared.is_shutting_down() {
            return;
        }
        self.shared.set_state(ConnectionState::Connecting);

        let address = self.config.address();
        info!(%address, "connecting to timer server");

        let attempt = tokio::time::timeout(
            self.config.connect_timeout(),
            TcpStream::connect((self.config.host(), self.config.port())),
        );
        let result = tokio::select! {
            biased;
            _ = self.shared.cancel.cancelled() => return,
            result = attempt => result,
        };

        match result {
            Ok(Ok(stream)) => self.on_connected(stream),
            Ok(Err(e)) => {
                warn!(%address, error = %e, "failed to connect");
                self.on_failure();
            }
            Err(_) => {
                warn!(
                    %address,
                    timeout_ms = self.config.connect_timeout().as_millis() as u64,
                    "connect attempt timed out"
                );
                self.on_failure();
            }
        }
    }

    pub(super) fn on_connected(&mut self, stream: TcpStream) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "could not set TCP_NODELAY");
        }

        let (read_half, write_half) = stream.into_split();
        self.reader = Some(FramedRead::new(read_half, FrameCodec::new()));
        self.writer = Some(FramedWrite::new(write_half, FrameCodec::new()));
        self.reconnect = None;
        self.shared.reconnect_attempts.store(0, Ordering::SeqCst);
        self.shared.set_state(ConnectionState::Connected);
        self.heartbeat.start();

        info!(address = %self.config.address(), "connected to timer server");
    }

    /// Shared by failed connects and lost connections. A connection lost
    /// after a successful connect starts a fresh sequence at attempt 1,
    /// since the counter was reset on connect.
    fn on_failure(&mut self) {
        let attempts = self.shared.reconnect_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let max_attempts = self.config.max_reconnect_attempts();

        if attempts >= max_attempts {
            error!(
                attempts,
                max_attempts, "giving up after reaching max reconnect attempts"
            );
            self.shared.begin_shutdown();
            return;
        }

        if !self.config.auto_reconnect() {
            warn!(attempts, "auto reconnect disabled, staying disconnected");
            self.shared.set_state(ConnectionState::Disconnected);
            return;
        }

        let delay = backoff_delay(
            self.config.initial_reconnect_delay(),
            self.config.max_reconnect_delay(),
            attempts,
        );
        info!(
            attempt = attempts,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            "scheduling reconnect"
        );
        self.shared.set_state(ConnectionState::Connecting);
        self.reconnect = Some(Box::pin(tokio::time::sleep(delay)));
    }

    fn connection_lost(&mut self, reason: &str) {
        let was_connected = self.reader.is_some() || self.writer.is_some();
        self.reader = None;
        self.writer = None;
        self.heartbeat.stop();

        if !was_connected || self.shared.is_shutting_down() {
            return;
        }

        warn!(%reason, "connection lost");
        self.on_failure();
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect => {
                let idle = self.writer.is_none() && self.reconnect.is_none();
                if idle && self.shared.state() == ConnectionState::Disconnected {
                    self.connect().await;
                }
            }
            Command::Write { message, reply } => {
                let result = self.write_frame(message).await;
                let transport_failed =
                    matches!(result, Err(ClientError::Codec(CodecError::Io(_))));

                if reply.send(result).is_err() {
                    debug!("write completed after caller stopped waiting");
                }
                if transport_failed {
                    self.connection_lost("write failed");
                }
            }
        }
    }

    pub(super) async fn send_heartbeat(&mut self) {
        if self.writer.is_none() {
            debug!("channel is not active, skipping heartbeat");
            return;
        }

        debug!(period_secs = self.heartbeat.period().as_secs(), "sending heartbeat");
        match self.write_frame(Message::ping()).await {
            Ok(()) => debug!("heartbeat sent"),
            Err(_) if self.shared.is_shutting_down() => {}
            Err(e) => {
                error!(error = %e, "failed to send ping message");
                self.connection_lost("heartbeat failed");
            }
        }
    }

    /// Writes one frame. A peer that stops reading can stall the flush
    /// indefinitely, so the write gives way to shutdown.
    async fn write_frame(&mut self, message: Message) -> Result<(), ClientError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(ClientError::NotConnected);
        };

        tokio::select! {
            biased;
            _ = self.shared.cancel.cancelled() => {
                debug!("write abandoned for shutdown");
                Err(ClientError::ShutDown)
            }
            result = writer.send(message) => result.map_err(ClientError::from),
        }
    }

    fn handle_frame(&mut self, frame: Option<Result<Message, CodecError>>) {
        match frame {
            Some(Ok(message)) => {
                self.dispatcher.dispatch(&message);
            }
            Some(Err(CodecError::Io(e))) => {
                warn!(error = %e, "read failed");
                self.connection_lost("read failed");
            }
            Some(Err(e)) => {
                error!(error = %e, "protocol violation, closing connection");
                self.connection_lost("protocol violation");
            }
            None => self.connection_lost("closed by peer"),
        }
    }

    async fn teardown(&mut self) {
        self.shared.begin_shutdown();
        self.heartbeat.stop();
        self.reconnect = None;
        self.reader = None;

        if let Some(mut writer) = self.writer.take() {
            match tokio::time::timeout(CLOSE_TIMEOUT, writer.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(error = %e, "error while closing connection"),
                Err(_) => debug!("timed out closing connection"),
            }
        }

        self.commands.close();
        while let Ok(command) = self.commands.try_recv() {
            if let Command::Write { reply, .. } = command {
                let _ = reply.send(Err(ClientError::ShutDown));
            }
        }

        info!("timer client stopped");
    }
}

async fn wait_for(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer.as_mut() {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending::<()>().await,
    }
}

async fn next_frame(
    reader: &mut Option<FramedRead<OwnedReadHalf, FrameCodec>>,
) -> Option<Result<Message, CodecError>> {
    match reader.as_mut() {
        Some(reader) => reader.next().await,
        None => std::future::pending().await,
    }
}

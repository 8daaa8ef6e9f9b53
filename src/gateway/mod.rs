pub mod dispatcher;
pub mod events;
pub mod heartbeat;
pub mod intents;
pub mod session;
pub mod transport;

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Sleep;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::error::GatewayError;
use dispatcher::{DispatchHandler, Dispatcher};
use events::{DispatchEvent, GatewayMessage, HelloData, Opcode};
use heartbeat::{Beat, HeartbeatScheduler, DEFAULT_MAX_MISSED_ACKS};
use session::{ConnectionState, SessionCredentials};
use transport::{Socket, Transport, TungsteniteTransport};

pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg";
pub const DEFAULT_API_VERSION: u8 = 10;
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Connection tuning, fixed for the lifetime of a [`GatewayConnection`].
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Gateway base URL, without query parameters.
    pub url: String,
    pub api_version: u8,
    /// Delay between a socket closing and the next connection attempt.
    pub reconnect_delay: Duration,
    /// Unacknowledged heartbeats tolerated before the connection is cycled.
    pub max_missed_acks: u32,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.to_string(),
            api_version: DEFAULT_API_VERSION,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_missed_acks: DEFAULT_MAX_MISSED_ACKS,
        }
    }
}

enum Command {
    Connect,
    Send {
        message: GatewayMessage,
        reply: oneshot::Sender<Result<(), GatewayError>>,
    },
    OnDispatch(Arc<dyn DispatchHandler>),
    OnEvent(String, Arc<dyn DispatchHandler>),
    Close {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a gateway connection.
///
/// The socket, heartbeat timer and reconnect timer live in a driver task that
/// this handle talks to over a channel. Clones share the same connection; once
/// every handle is dropped the driver closes the socket and exits.
#[derive(Clone)]
pub struct GatewayConnection {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
}

impl GatewayConnection {
    /// Create a connection over the network transport. Must be called from
    /// within a Tokio runtime. Nothing is opened until [`connect`](Self::connect).
    pub fn new(settings: GatewaySettings, credentials: SessionCredentials) -> Self {
        Self::with_transport(settings, credentials, TungsteniteTransport)
    }

    pub fn with_transport<T: Transport>(
        settings: GatewaySettings,
        credentials: SessionCredentials,
        transport: T,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ConnectionState::Disconnected);

        let driver = Driver {
            url: transport::gateway_url(&settings.url, settings.api_version),
            heartbeat: HeartbeatScheduler::new(settings.max_missed_acks),
            settings,
            credentials,
            transport,
            commands: command_rx,
            state: state_tx,
            socket: None,
            pending_connect: None,
            reconnect: None,
            last_sequence: None,
            dispatcher: Dispatcher::new(),
        };
        tokio::spawn(driver.run());

        Self { commands, state }
    }

    /// Start a connection cycle. A no-op while one is already under way.
    pub fn connect(&self) -> Result<(), GatewayError> {
        self.command(Command::Connect)
    }

    /// Serialize and write a frame on the current socket.
    pub async fn send(&self, message: GatewayMessage) -> Result<(), GatewayError> {
        let (reply, rx) = oneshot::channel();
        self.command(Command::Send { message, reply })?;
        rx.await.map_err(|_| GatewayError::Shutdown)?
    }

    /// Register a handler for every dispatch event.
    pub fn on_dispatch<H: DispatchHandler>(&self, handler: H) -> Result<(), GatewayError> {
        self.command(Command::OnDispatch(Arc::new(handler)))
    }

    /// Register a handler for one event name, e.g. `MESSAGE_REACTION_ADD`.
    pub fn on_event<H: DispatchHandler>(
        &self,
        event_name: impl Into<String>,
        handler: H,
    ) -> Result<(), GatewayError> {
        self.command(Command::OnEvent(event_name.into(), Arc::new(handler)))
    }

    /// Close the socket and stop all timers without scheduling a reconnect.
    pub async fn close(&self) -> Result<(), GatewayError> {
        let (reply, rx) = oneshot::channel();
        self.command(Command::Close { reply })?;
        rx.await.map_err(|_| GatewayError::Shutdown)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    fn command(&self, command: Command) -> Result<(), GatewayError> {
        self.commands
            .send(command)
            .map_err(|_| GatewayError::Shutdown)
    }
}

/// Owns everything mutable about one logical connection. All events are
/// handled one at a time from [`Driver::run`].
struct Driver<T> {
    settings: GatewaySettings,
    credentials: SessionCredentials,
    transport: T,
    url: String,
    commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<ConnectionState>,
    socket: Option<Socket>,
    heartbeat: HeartbeatScheduler,
    pending_connect: Option<PendingConnect>,
    reconnect: Option<Pin<Box<Sleep>>>,
    last_sequence: Option<u64>,
    dispatcher: Dispatcher,
}

type PendingConnect = BoxFuture<'static, Result<Socket, tungstenite::Error>>;

impl<T: Transport> Driver<T> {
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                opened = connect_done(&mut self.pending_connect) => {
                    self.pending_connect = None;
                    self.handle_connected(opened).await;
                }
                frame = next_frame(&mut self.socket) => self.handle_frame(frame).await,
                beat = self.heartbeat.tick() => self.handle_beat(beat).await,
                () = reconnect_due(&mut self.reconnect) => {
                    self.reconnect = None;
                    self.open().await;
                }
            }
        }

        self.shutdown().await;
        tracing::debug!("gateway driver stopped");
    }

    fn current(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            tracing::info!(from = %prev, to = %next, "gateway state changed");
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect => {
                let state = self.current();
                if state.is_active() {
                    tracing::debug!(%state, "connect ignored, connection already active");
                    return;
                }
                self.reconnect = None;
                self.open().await;
            }
            Command::Send { message, reply } => {
                let result = self.write(&message).await;
                let failed = result.as_ref().is_err_and(GatewayError::is_recoverable);
                let _ = reply.send(result);
                if failed {
                    self.cycle().await;
                }
            }
            Command::OnDispatch(handler) => self.dispatcher.on_dispatch(handler),
            Command::OnEvent(event_name, handler) => {
                if !intents::has_intent(self.credentials.intents(), &event_name) {
                    tracing::warn!(
                        event = %event_name,
                        "handler registered for an event the configured intents will not deliver"
                    );
                }
                self.dispatcher.on_event(event_name, handler);
            }
            Command::Close { reply } => {
                tracing::info!("closing gateway connection");
                self.shutdown().await;
                let _ = reply.send(());
            }
        }
    }

    /// Start a connection attempt. The handshake is polled from the event
    /// loop, so commands keep flowing while it is in flight.
    async fn open(&mut self) {
        self.close_socket().await;
        self.set_state(ConnectionState::Connecting);
        tracing::info!(url = %self.url, "connecting to gateway");
        self.pending_connect = Some(self.transport.connect(self.url.clone()));
    }

    async fn handle_connected(&mut self, opened: Result<Socket, tungstenite::Error>) {
        match opened {
            Ok(socket) => {
                tracing::debug!("gateway socket open, waiting for HELLO");
                self.socket = Some(socket);
            }
            Err(e) => {
                tracing::error!("failed to connect to gateway: {e}");
                self.cycle().await;
            }
        }
    }

    async fn handle_frame(&mut self, frame: Option<Result<Message, tungstenite::Error>>) {
        match frame {
            Some(Ok(Message::Text(text))) => self.handle_text(text.as_str()).await,
            Some(Ok(Message::Close(close))) => {
                tracing::info!(?close, "gateway sent close frame");
                self.cycle().await;
            }
            Some(Ok(_)) => {}
            // The close that follows a failed socket drives the reconnect.
            Some(Err(e)) => tracing::error!("gateway transport error: {e}"),
            None => {
                tracing::info!("gateway socket closed");
                self.cycle().await;
            }
        }
    }

    async fn handle_text(&mut self, text: &str) {
        let message: GatewayMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("{}", GatewayError::from(e));
                return;
            }
        };
        tracing::debug!(op = message.op, t = ?message.t, s = ?message.s, "gateway frame received");

        let Some(opcode) = message.opcode() else {
            tracing::debug!(op = message.op, "ignoring unknown opcode");
            return;
        };

        match opcode {
            Opcode::Dispatch => self.handle_dispatch(message),
            // The server may ask for a beat out of schedule.
            Opcode::Heartbeat => self.beat().await,
            Opcode::Reconnect => {
                tracing::info!("gateway requested reconnect");
                self.set_state(ConnectionState::Reconnecting);
                self.cycle().await;
            }
            Opcode::InvalidSession => {
                tracing::warn!(resumable = ?message.d.as_bool(), "invalid session, re-identifying");
                self.identify().await;
            }
            Opcode::Hello => self.handle_hello(message.d).await,
            Opcode::HeartbeatAck => {
                self.heartbeat.record_ack();
                tracing::debug!(latency = ?self.heartbeat.latency(), "heartbeat acknowledged");
            }
            Opcode::Identify => tracing::debug!("ignoring inbound identify"),
        }
    }

    async fn handle_hello(&mut self, data: serde_json::Value) {
        let hello: HelloData = match serde_json::from_value(data) {
            Ok(hello) => hello,
            Err(e) => {
                tracing::warn!("malformed HELLO payload: {e}");
                return;
            }
        };

        let period = Duration::from_millis(hello.heartbeat_interval.max(1));
        if let Some(previous) = self.heartbeat.period() {
            tracing::debug!(?previous, "replacing heartbeat timer");
        }
        self.heartbeat.start(period);
        tracing::debug!(interval_ms = hello.heartbeat_interval, "heartbeat started");
        self.identify().await;
    }

    async fn identify(&mut self) {
        let frame = GatewayMessage::identify(&self.credentials.identify_data());
        match self.write(&frame).await {
            Ok(()) => {
                tracing::info!(
                    token = %self.credentials.redacted_token(),
                    intents = self.credentials.intents(),
                    "identify sent"
                );
                self.set_state(ConnectionState::Identifying);
            }
            Err(e) => {
                tracing::error!("failed to send identify: {e}");
                self.cycle().await;
            }
        }
    }

    fn handle_dispatch(&mut self, message: GatewayMessage) {
        if let Some(seq) = message.s {
            self.last_sequence = Some(self.last_sequence.map_or(seq, |last| last.max(seq)));
        }

        let Some(name) = message.t else {
            tracing::warn!(seq = ?message.s, "dispatch without event name");
            return;
        };

        if self.current() == ConnectionState::Identifying {
            self.set_state(ConnectionState::Ready);
        }
        if name == "READY" {
            tracing::info!(session_id = ?message.d.get("session_id"), "session ready");
        }
        if !self.dispatcher.has_handlers() {
            tracing::trace!(event = %name, "no dispatch handlers registered");
            return;
        }

        let event = DispatchEvent {
            name,
            payload: message.d,
            sequence: message.s,
        };
        self.dispatcher.dispatch(&event);
    }

    async fn handle_beat(&mut self, beat: Beat) {
        match beat {
            Beat::Due => self.beat().await,
            Beat::Missed { outstanding } => {
                tracing::warn!(outstanding, "heartbeat not acknowledged, cycling connection");
                self.set_state(ConnectionState::Reconnecting);
                self.cycle().await;
            }
        }
    }

    async fn beat(&mut self) {
        let frame = GatewayMessage::heartbeat(self.last_sequence);
        match self.write(&frame).await {
            Ok(()) => {
                self.heartbeat.record_sent();
                tracing::debug!(seq = ?self.last_sequence, "heartbeat sent");
            }
            Err(e) => {
                tracing::warn!("heartbeat failed: {e}");
                self.cycle().await;
            }
        }
    }

    async fn write(&mut self, message: &GatewayMessage) -> Result<(), GatewayError> {
        let socket = self.socket.as_mut().ok_or(GatewayError::NotConnected)?;
        let text = serde_json::to_string(message)?;
        socket.sink.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Tear down the socket and heartbeat, then schedule a fresh connection
    /// attempt after the reconnect delay. A deliberate reconnect stays in
    /// `Reconnecting` until that attempt starts; anything else waits as
    /// `Disconnected`.
    async fn cycle(&mut self) {
        self.heartbeat.stop();
        self.close_socket().await;
        if self.current() != ConnectionState::Reconnecting {
            self.set_state(ConnectionState::Disconnected);
        }

        let delay = self.settings.reconnect_delay;
        tracing::info!("reconnecting in {delay:?}");
        self.reconnect = Some(Box::pin(tokio::time::sleep(delay)));
    }

    /// Tear down everything with no reconnect.
    async fn shutdown(&mut self) {
        self.reconnect = None;
        self.heartbeat.stop();
        self.close_socket().await;
        self.set_state(ConnectionState::Disconnected);
    }

    async fn close_socket(&mut self) {
        self.pending_connect = None;
        if let Some(mut socket) = self.socket.take() {
            if let Err(e) = socket.sink.send(Message::Close(None)).await {
                tracing::debug!("close frame not delivered: {e}");
            }
        }
    }
}

async fn next_frame(socket: &mut Option<Socket>) -> Option<Result<Message, tungstenite::Error>> {
    match socket {
        Some(socket) => socket.stream.next().await,
        None => std::future::pending().await,
    }
}

async fn connect_done(
    pending: &mut Option<PendingConnect>,
) -> Result<Socket, tungstenite::Error> {
    match pending {
        Some(connect) => connect.await,
        None => std::future::pending().await,
    }
}

async fn reconnect_due(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

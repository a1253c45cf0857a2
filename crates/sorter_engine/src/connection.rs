//! Single socket connection: owns the transport, queues frames until the
//! socket is open, and hands decoded inbound messages to the router.

use std::collections::VecDeque;
use std::fmt;
use std::sync::PoisonError;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;

use crate::protocol::{decode, encode, DecodeError, EncodeError, InboundMessage, OutboundMessage};
use crate::router::{Dispatch, SharedRouter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed(CloseReason),
}

impl ConnectionState {
    pub fn is_closed(&self) -> bool {
        matches!(self, ConnectionState::Closed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// `close()` was called or every handle was dropped.
    Requested,
    /// The backend closed the socket or the stream ended.
    Remote { code: Option<u16>, reason: String },
    /// Connect failure, timeout or transport error.
    Error(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Requested => write!(f, "closed by client"),
            CloseReason::Remote {
                code: Some(code),
                reason,
            } => write!(f, "closed by server ({code}): {reason}"),
            CloseReason::Remote { code: None, reason } => write!(f, "closed by server: {reason}"),
            CloseReason::Error(message) => write!(f, "connection error: {message}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("connection is closed")]
    Closed,
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("invalid server url {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub url: String,
    pub connect_timeout: Duration,
}

impl ConnectionSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Frames waiting for the socket, in send order.
#[derive(Debug, Default)]
pub(crate) struct Outbox {
    open: bool,
    queue: VecDeque<String>,
}

impl Outbox {
    /// Returns the frame back when it can be written right away.
    pub(crate) fn push(&mut self, frame: String) -> Option<String> {
        if self.open {
            Some(frame)
        } else {
            self.queue.push_back(frame);
            None
        }
    }

    /// Marks the outbox open and drains everything queued so far.
    pub(crate) fn open(&mut self) -> Vec<String> {
        self.open = true;
        self.queue.drain(..).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }
}

enum Command {
    Send(String),
    Close,
}

/// Cloneable handle to a connection driver task.
///
/// The driver exits when `close()` is called, the socket fails or closes, or
/// every handle has been dropped. There is no reconnect.
#[derive(Clone)]
pub struct ConnectionHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl ConnectionHandle {
    /// Starts connecting in the background. Must be called inside a tokio runtime.
    pub fn connect(
        settings: ConnectionSettings,
        router: SharedRouter,
    ) -> Result<Self, ConnectionError> {
        let parsed = url::Url::parse(&settings.url).map_err(|err| ConnectionError::InvalidUrl {
            url: settings.url.clone(),
            message: err.to_string(),
        })?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(ConnectionError::InvalidUrl {
                url: settings.url.clone(),
                message: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        tokio::spawn(drive(settings, router, command_rx, state_tx));

        Ok(Self {
            commands: command_tx,
            state: state_rx,
        })
    }

    /// Encodes and sends `message`, or queues it while still connecting.
    pub fn send(&self, message: &OutboundMessage) -> Result<(), ConnectionError> {
        if self.state.borrow().is_closed() {
            return Err(ConnectionError::Closed);
        }
        let frame = encode(message)?;
        self.commands
            .send(Command::Send(frame))
            .map_err(|_| ConnectionError::Closed)
    }

    pub fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }
}

/// Decodes one text frame and routes it. The router lock is held for the
/// duration of the handler call.
pub fn deliver_frame(router: &SharedRouter, text: &str) -> Result<Dispatch, DecodeError> {
    let message: InboundMessage = decode(text)?;
    let kind = message.kind();
    let mut guard = router.lock().unwrap_or_else(PoisonError::into_inner);
    let outcome = guard.dispatch(message);
    if outcome == Dispatch::Unhandled {
        engine_debug!("No handler registered for {}", kind);
    }
    Ok(outcome)
}

async fn drive(
    settings: ConnectionSettings,
    router: SharedRouter,
    mut commands: mpsc::UnboundedReceiver<Command>,
    state_tx: watch::Sender<ConnectionState>,
) {
    let mut outbox = Outbox::default();
    engine_info!("Connecting to {}", settings.url);

    let connect = tokio::time::timeout(
        settings.connect_timeout,
        tokio_tungstenite::connect_async(settings.url.as_str()),
    );
    tokio::pin!(connect);

    let stream = loop {
        tokio::select! {
            result = &mut connect => match result {
                Ok(Ok((stream, _response))) => break stream,
                Ok(Err(err)) => {
                    finish(&state_tx, &outbox, CloseReason::Error(err.to_string()));
                    return;
                }
                Err(_) => {
                    let message = format!("connect timed out after {:?}", settings.connect_timeout);
                    finish(&state_tx, &outbox, CloseReason::Error(message));
                    return;
                }
            },
            command = commands.recv() => match command {
                Some(Command::Send(frame)) => {
                    outbox.push(frame);
                }
                Some(Command::Close) | None => {
                    finish(&state_tx, &outbox, CloseReason::Requested);
                    return;
                }
            },
        }
    };

    let (mut sink, mut source) = stream.split();
    state_tx.send_replace(ConnectionState::Open);
    engine_info!("Connected to {}", settings.url);

    let queued = outbox.open();
    if !queued.is_empty() {
        engine_debug!("Flushing {} queued frame(s)", queued.len());
    }
    for frame in queued {
        if let Err(err) = sink.send(Message::Text(frame)).await {
            finish(&state_tx, &outbox, CloseReason::Error(err.to_string()));
            return;
        }
    }

    let reason = loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Send(frame)) => {
                    let Some(frame) = outbox.push(frame) else { continue };
                    if let Err(err) = sink.send(Message::Text(frame)).await {
                        break CloseReason::Error(err.to_string());
                    }
                }
                Some(Command::Close) | None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break CloseReason::Requested;
                }
            },
            incoming = source.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Err(err) = deliver_frame(&router, &text) {
                        engine_warn!("Dropping inbound frame: {}", err);
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    break match frame {
                        Some(frame) => CloseReason::Remote {
                            code: Some(u16::from(frame.code)),
                            reason: frame.reason.into_owned(),
                        },
                        None => CloseReason::Remote {
                            code: None,
                            reason: String::new(),
                        },
                    };
                }
                Some(Ok(Message::Binary(bytes))) => {
                    engine_debug!("Ignoring {} byte binary frame", bytes.len());
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => break CloseReason::Error(err.to_string()),
                None => {
                    break CloseReason::Remote {
                        code: None,
                        reason: "stream ended".to_string(),
                    };
                }
            },
        }
    };

    finish(&state_tx, &outbox, reason);
}

fn finish(state_tx: &watch::Sender<ConnectionState>, outbox: &Outbox, reason: CloseReason) {
    if outbox.len() > 0 {
        engine_warn!(
            "Connection closed with {} unsent frame(s) queued",
            outbox.len()
        );
    }
    engine_info!("Connection {}", reason);
    state_tx.send_replace(ConnectionState::Closed(reason));
}

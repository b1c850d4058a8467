//! Newline-delimited JSON-RPC transport to the local daemon.
//!
//! One [`JsonRpcTransport`] owns at most one live connection. Each
//! connection runs a reader task (responses and push notifications) and a
//! writer task (outgoing request lines). Requests are matched to responses
//! by id, never by arrival order.
//!
//! ```rust,ignore
//! let transport = JsonRpcTransport::new();
//! transport.connect(&"/var/run/vpnlink/daemon.sock".parse()?).await?;
//! let state = transport.send("get_state", json!([]), Some(Duration::from_secs(5))).await?;
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::TransportError;

/// Upper bound on a single inbound line. Relay lists are the largest payload.
const MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;

/// How long `subscribe` waits for the daemon to acknowledge.
const SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Endpoint ─────────────────────────────────────────────────────────

/// Where the daemon listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Unix domain socket path.
    #[cfg(unix)]
    Unix(PathBuf),
    /// `host:port` of a loopback TCP listener.
    Tcp(String),
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid daemon endpoint `{0}`")]
pub struct InvalidEndpoint(pub String);

impl FromStr for Endpoint {
    type Err = InvalidEndpoint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(addr) = s.strip_prefix("tcp://") {
            if addr.rsplit_once(':').is_some_and(|(host, port)| {
                !host.is_empty() && port.parse::<u16>().is_ok()
            }) {
                return Ok(Self::Tcp(addr.to_owned()));
            }
            return Err(InvalidEndpoint(s.to_owned()));
        }

        #[cfg(unix)]
        {
            let s = s.strip_prefix("unix://").unwrap_or(s);
            if !s.is_empty() {
                return Ok(Self::Unix(PathBuf::from(s)));
            }
        }

        Err(InvalidEndpoint(s.to_owned()))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(unix)]
            Self::Unix(path) => write!(f, "{}", path.display()),
            Self::Tcp(addr) => write!(f, "tcp://{addr}"),
        }
    }
}

// ── Connection lifecycle ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Connecting,
    Open,
}

/// Lifecycle events a handler can register for with [`JsonRpcTransport::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportEvent {
    Open,
    Close,
}

/// Registration handle returned by [`JsonRpcTransport::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Receives the payload of a push notification.
pub type PushHandler = Arc<dyn Fn(Value) + Send + Sync>;

type EventHandler = Arc<dyn Fn(Option<&TransportError>) + Send + Sync>;

type PendingResponse = oneshot::Sender<Result<Value, TransportError>>;

struct Connection {
    id: u64,
    next_request_id: AtomicU64,
    closed: AtomicBool,
    // BTreeMap so a close fails requests in ascending id order.
    pending: Mutex<BTreeMap<u64, PendingResponse>>,
    writer: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
}

struct Inner {
    connection: Mutex<Option<Arc<Connection>>>,
    push_handlers: Mutex<HashMap<String, PushHandler>>,
    event_handlers: Mutex<Vec<(HandlerId, TransportEvent, EventHandler)>>,
    next_handler_id: AtomicU64,
    next_connection_id: AtomicU64,
    state_tx: watch::Sender<ConnectionState>,
}

// ── JsonRpcTransport ─────────────────────────────────────────────────

/// Cheaply cloneable handle to the daemon connection.
#[derive(Clone)]
pub struct JsonRpcTransport {
    inner: Arc<Inner>,
}

impl Default for JsonRpcTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JsonRpcTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonRpcTransport")
            .field("state", &*self.inner.state_tx.borrow())
            .finish_non_exhaustive()
    }
}

impl JsonRpcTransport {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Closed);
        Self {
            inner: Arc::new(Inner {
                connection: Mutex::new(None),
                push_handlers: Mutex::new(HashMap::new()),
                event_handlers: Mutex::new(Vec::new()),
                next_handler_id: AtomicU64::new(1),
                next_connection_id: AtomicU64::new(1),
                state_tx,
            }),
        }
    }

    /// Dial `endpoint` and adopt the stream. An open connection is closed first.
    pub async fn connect(&self, endpoint: &Endpoint) -> Result<(), TransportError> {
        self.disconnect();
        self.inner.state_tx.send_replace(ConnectionState::Connecting);
        info!(%endpoint, "connecting to daemon");

        let dialed = match endpoint {
            #[cfg(unix)]
            Endpoint::Unix(path) => tokio::net::UnixStream::connect(path)
                .await
                .map(|stream| self.attach(stream)),
            Endpoint::Tcp(addr) => tokio::net::TcpStream::connect(addr.as_str())
                .await
                .map(|stream| self.attach(stream)),
        };

        if let Err(e) = dialed {
            warn!(%endpoint, error = %e, "failed to connect to daemon");
            self.inner.state_tx.send_replace(ConnectionState::Closed);
            return Err(e.into());
        }
        Ok(())
    }

    /// Adopt an already established duplex stream as the live connection.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn attach<S>(&self, stream: S)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        self.disconnect();

        let (read_half, write_half) = tokio::io::split(stream);
        let (writer, writer_rx) = mpsc::unbounded_channel();
        let conn = Arc::new(Connection {
            id: self.inner.next_connection_id.fetch_add(1, Ordering::Relaxed),
            next_request_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            pending: Mutex::new(BTreeMap::new()),
            writer,
            cancel: CancellationToken::new(),
        });

        *lock(&self.inner.connection) = Some(Arc::clone(&conn));

        let frames_in = FramedRead::new(read_half, LinesCodec::new_with_max_length(MAX_FRAME_LENGTH));
        let frames_out = FramedWrite::new(write_half, LinesCodec::new());
        tokio::spawn(read_loop(
            Arc::downgrade(&self.inner),
            Arc::clone(&conn),
            frames_in,
        ));
        tokio::spawn(write_loop(
            Arc::downgrade(&self.inner),
            Arc::clone(&conn),
            writer_rx,
            frames_out,
        ));

        info!(connection = conn.id, "daemon connection open");
        self.inner.state_tx.send_replace(ConnectionState::Open);
        self.inner.emit(TransportEvent::Open, None);
    }

    /// Close the live connection, failing every pending request.
    pub fn disconnect(&self) {
        let current = lock(&self.inner.connection).take();
        if let Some(conn) = current {
            self.inner.close(&conn, None);
        }
    }

    /// Send one request and wait for the matching response.
    ///
    /// `timeout: None` waits until the response arrives or the connection closes.
    pub async fn send(
        &self,
        method: &str,
        params: Value,
        timeout: Option<Duration>,
    ) -> Result<Value, TransportError> {
        let conn = lock(&self.inner.connection)
            .clone()
            .ok_or(TransportError::NotConnected)?;

        let id = conn.next_request_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        lock(&conn.pending).insert(id, tx);

        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        if conn.writer.send(request.to_string()).is_err() {
            lock(&conn.pending).remove(&id);
            return Err(TransportError::ConnectionClosed);
        }
        debug!(id, method, "request sent");

        let outcome = match timeout {
            Some(limit) => {
                if let Ok(outcome) = tokio::time::timeout(limit, rx).await {
                    outcome
                } else {
                    lock(&conn.pending).remove(&id);
                    debug!(id, method, "request timed out");
                    return Err(TransportError::Timeout {
                        method: method.to_owned(),
                        timeout: limit,
                    });
                }
            }
            None => rx.await,
        };

        outcome.unwrap_or(Err(TransportError::ConnectionClosed))
    }

    /// Install the persistent handler for notifications on `topic` without
    /// contacting the daemon. Replaces any previous handler for the topic.
    pub fn set_push_handler(&self, topic: &str, handler: PushHandler) {
        lock(&self.inner.push_handlers).insert(topic.to_owned(), handler);
    }

    /// Install the push handler for `topic` and ask the daemon to start
    /// sending it. Returns once the daemon acknowledges.
    pub async fn subscribe(&self, topic: &str, handler: PushHandler) -> Result<(), TransportError> {
        self.set_push_handler(topic, handler);
        let subscription = self
            .send(&format!("{topic}_subscribe"), json!([]), Some(SUBSCRIBE_TIMEOUT))
            .await?;
        debug!(topic, %subscription, "subscribed");
        Ok(())
    }

    /// Register a lifecycle handler. Handlers run synchronously on the task
    /// that caused the transition and must not block.
    pub fn on<F>(&self, event: TransportEvent, handler: F) -> HandlerId
    where
        F: Fn(Option<&TransportError>) + Send + Sync + 'static,
    {
        let id = HandlerId(self.inner.next_handler_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.inner.event_handlers).push((id, event, Arc::new(handler)));
        id
    }

    /// Unregister a lifecycle handler. Returns `false` if it was not registered.
    pub fn off(&self, id: HandlerId) -> bool {
        let mut handlers = lock(&self.inner.event_handlers);
        let before = handlers.len();
        handlers.retain(|(handler_id, _, _)| *handler_id != id);
        handlers.len() != before
    }

    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Identifier of the live connection. Each `connect`/`attach` gets a new one.
    pub fn connection_id(&self) -> Option<u64> {
        lock(&self.inner.connection).as_ref().map(|conn| conn.id)
    }

    pub fn is_open(&self) -> bool {
        *self.inner.state_tx.borrow() == ConnectionState::Open
    }
}

impl Inner {
    /// Tear down `conn`. Safe to call more than once; only the first call
    /// fails pending requests and emits `Close`.
    fn close(&self, conn: &Connection, reason: Option<&TransportError>) {
        if conn.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        conn.cancel.cancel();

        {
            let mut slot = lock(&self.connection);
            if slot.as_ref().is_some_and(|live| live.id == conn.id) {
                *slot = None;
            }
        }

        let pending = std::mem::take(&mut *lock(&conn.pending));
        for (_, tx) in pending {
            let _ = tx.send(Err(TransportError::ConnectionClosed));
        }

        match reason {
            Some(e) => warn!(connection = conn.id, error = %e, "daemon connection closed"),
            None => info!(connection = conn.id, "daemon connection closed"),
        }

        if lock(&self.connection).is_none() {
            self.state_tx.send_replace(ConnectionState::Closed);
        }
        self.emit(TransportEvent::Close, reason);
    }

    fn emit(&self, event: TransportEvent, error: Option<&TransportError>) {
        let handlers: Vec<EventHandler> = lock(&self.event_handlers)
            .iter()
            .filter(|(_, kind, _)| *kind == event)
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler(error);
        }
    }

    fn dispatch(&self, conn: &Connection, line: &str) {
        let message: IncomingMessage = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(e) => {
                debug!(error = %e, "skipping malformed frame");
                return;
            }
        };

        match message {
            IncomingMessage {
                id: Some(id),
                method: None,
                result,
                error,
                ..
            } => {
                let Some(tx) = lock(&conn.pending).remove(&id) else {
                    debug!(id, "response for unknown request");
                    return;
                };
                let outcome = match error {
                    Some(RpcErrorObject { code, message }) => {
                        Err(TransportError::Remote { code, message })
                    }
                    None => Ok(result.unwrap_or(Value::Null)),
                };
                debug!(id, ok = outcome.is_ok(), "response received");
                let _ = tx.send(outcome);
            }
            IncomingMessage {
                method: Some(topic),
                params,
                ..
            } => {
                let payload = match params {
                    Some(Value::Object(mut map)) if map.contains_key("result") => {
                        map.remove("result").unwrap_or(Value::Null)
                    }
                    Some(other) => other,
                    None => Value::Null,
                };
                let handler = lock(&self.push_handlers).get(&topic).cloned();
                match handler {
                    Some(handler) => handler(payload),
                    None => debug!(topic, "notification without handler"),
                }
            }
            _ => debug!("skipping frame that is neither response nor notification"),
        }
    }
}

// ── Wire envelope ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    #[serde(default)]
    message: String,
}

// ── Connection tasks ─────────────────────────────────────────────────

async fn read_loop<R>(
    inner: Weak<Inner>,
    conn: Arc<Connection>,
    mut frames: FramedRead<R, LinesCodec>,
) where
    R: AsyncRead + Send + Unpin,
{
    let reason = loop {
        tokio::select! {
            biased;
            () = conn.cancel.cancelled() => return,
            frame = frames.next() => match frame {
                Some(Ok(line)) => {
                    let Some(inner) = inner.upgrade() else { return };
                    inner.dispatch(&conn, &line);
                }
                Some(Err(LinesCodecError::Io(e))) => break TransportError::from(e),
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    break TransportError::Protocol("frame exceeds maximum length".into());
                }
                None => break TransportError::ConnectionClosed,
            }
        }
    };

    if let Some(inner) = inner.upgrade() {
        inner.close(&conn, Some(&reason));
    }
}

async fn write_loop<W>(
    inner: Weak<Inner>,
    conn: Arc<Connection>,
    mut outgoing: mpsc::UnboundedReceiver<String>,
    mut frames: FramedWrite<W, LinesCodec>,
) where
    W: AsyncWrite + Send + Unpin,
{
    let failure = loop {
        tokio::select! {
            biased;
            () = conn.cancel.cancelled() => return,
            line = outgoing.recv() => {
                let Some(line) = line else { return };
                if let Err(e) = frames.send(line).await {
                    break match e {
                        LinesCodecError::Io(e) => TransportError::from(e),
                        LinesCodecError::MaxLineLengthExceeded => {
                            TransportError::Protocol("frame exceeds maximum length".into())
                        }
                    };
                }
            }
        }
    };

    if let Some(inner) = inner.upgrade() {
        inner.close(&conn, Some(&failure));
    }
}

// ── Tests ────────────────────────────────────────────────────────────

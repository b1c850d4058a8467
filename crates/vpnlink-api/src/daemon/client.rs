// Daemon RPC client
//
// Wraps `JsonRpcTransport` with per-call timeouts, one-time translation of
// transport failures into `Error`, and typed decoding of every response.
// Endpoint groups (account, relays, settings, ...) are implemented as
// inherent methods in sibling files to keep this module on call mechanics.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::Value;
use tracing::{debug, warn};

use crate::daemon::events::{ConnectionObserver, SubscriptionListener};
use crate::error::Error;
use crate::transport::{Endpoint, HandlerId, JsonRpcTransport, PushHandler, TransportEvent, lock};
use crate::types::DaemonEvent;

pub(crate) const DAEMON_EVENT: &str = "daemon_event";

// ── Timeouts ─────────────────────────────────────────────────────────

/// Per-call timeouts.
///
/// `network` applies to calls where the daemon itself makes an outbound
/// request before answering (account data, current location, version info).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpcTimeouts {
    pub default: Duration,
    pub network: Duration,
}

impl Default for RpcTimeouts {
    fn default() -> Self {
        Self {
            default: Duration::from_secs(5),
            network: Duration::from_secs(30),
        }
    }
}

// ── Listener registries ──────────────────────────────────────────────

type DaemonEventListener = Arc<SubscriptionListener<DaemonEvent>>;

type SubscribeFuture = Shared<BoxFuture<'static, Result<(), Error>>>;

/// The daemon-side `daemon_event` subscription of one connection.
struct EventSubscription {
    connection: u64,
    ack: SubscribeFuture,
}

#[derive(Default)]
struct Registry {
    observers: Mutex<Vec<(Arc<ConnectionObserver>, HandlerId, HandlerId)>>,
    event_listeners: Mutex<Vec<DaemonEventListener>>,
    event_subscription: Mutex<Option<EventSubscription>>,
}

// ── DaemonRpc ────────────────────────────────────────────────────────

/// Typed client for the daemon's JSON-RPC interface.
///
/// Cheaply cloneable; clones share the connection and listener registries.
/// Holds no cached data.
#[derive(Clone)]
pub struct DaemonRpc {
    transport: JsonRpcTransport,
    timeouts: RpcTimeouts,
    registry: Arc<Registry>,
    event_handler: PushHandler,
}

impl fmt::Debug for DaemonRpc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DaemonRpc")
            .field("transport", &self.transport)
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl Default for DaemonRpc {
    fn default() -> Self {
        Self::new(RpcTimeouts::default())
    }
}

impl DaemonRpc {
    pub fn new(timeouts: RpcTimeouts) -> Self {
        Self::with_transport(JsonRpcTransport::new(), timeouts)
    }

    /// Build a client over an existing transport.
    ///
    /// Installs the multiplexed `daemon_event` push handler immediately, so
    /// pushes are routed to listeners even before the first subscribe call.
    pub fn with_transport(transport: JsonRpcTransport, timeouts: RpcTimeouts) -> Self {
        let registry = Arc::new(Registry::default());
        let weak = Arc::downgrade(&registry);
        let event_handler: PushHandler = Arc::new(move |payload: Value| {
            if let Some(registry) = weak.upgrade() {
                dispatch_daemon_event(&registry, payload);
            }
        });
        transport.set_push_handler(DAEMON_EVENT, Arc::clone(&event_handler));

        Self {
            transport,
            timeouts,
            registry,
            event_handler,
        }
    }

    pub fn transport(&self) -> &JsonRpcTransport {
        &self.transport
    }

    pub fn timeouts(&self) -> RpcTimeouts {
        self.timeouts
    }

    // ── Connection ───────────────────────────────────────────────────

    pub async fn connect(&self, endpoint: &Endpoint) -> Result<(), Error> {
        self.transport.connect(endpoint).await.map_err(Error::from)
    }

    pub fn disconnect(&self) {
        self.transport.disconnect();
    }

    /// Authenticate the connection with the daemon's shared secret.
    ///
    /// `auth`
    pub async fn authenticate(&self, shared_secret: &str) -> Result<(), Error> {
        self.invoke("auth", Value::from(shared_secret)).await
    }

    /// Register open/close callbacks. Registering the same observer twice
    /// is a no-op.
    pub fn add_connection_observer(&self, observer: &Arc<ConnectionObserver>) {
        let mut observers = lock(&self.registry.observers);
        if observers.iter().any(|(known, _, _)| Arc::ptr_eq(known, observer)) {
            return;
        }

        let opened = Arc::clone(observer);
        let open_id = self.transport.on(TransportEvent::Open, move |_| opened.on_open());
        let closed = Arc::clone(observer);
        let close_id = self.transport.on(TransportEvent::Close, move |error| {
            closed.on_close(error.cloned().map(Error::from).as_ref());
        });
        observers.push((Arc::clone(observer), open_id, close_id));
    }

    pub fn remove_connection_observer(&self, observer: &Arc<ConnectionObserver>) {
        let mut observers = lock(&self.registry.observers);
        observers.retain(|(known, open_id, close_id)| {
            if Arc::ptr_eq(known, observer) {
                self.transport.off(*open_id);
                self.transport.off(*close_id);
                false
            } else {
                true
            }
        });
    }

    // ── Daemon events ────────────────────────────────────────────────

    /// Add a listener for `daemon_event` pushes without contacting the daemon.
    /// Returns `false` if the listener was already registered.
    pub fn add_event_listener(&self, listener: &DaemonEventListener) -> bool {
        let mut listeners = lock(&self.registry.event_listeners);
        if listeners.iter().any(|known| Arc::ptr_eq(known, listener)) {
            return false;
        }
        listeners.push(Arc::clone(listener));
        true
    }

    pub fn remove_event_listener(&self, listener: &DaemonEventListener) -> bool {
        let mut listeners = lock(&self.registry.event_listeners);
        let before = listeners.len();
        listeners.retain(|known| !Arc::ptr_eq(known, listener));
        listeners.len() != before
    }

    /// Register `listener` and make sure the live connection is subscribed
    /// to `daemon_event`.
    ///
    /// The daemon-side subscription is requested once per connection; every
    /// caller on the same connection joins that request. Safe to call again
    /// after a reconnect: the listener is only stored once and the new
    /// connection gets its own subscription.
    pub async fn subscribe_daemon_event_listener(
        &self,
        listener: &DaemonEventListener,
    ) -> Result<(), Error> {
        self.add_event_listener(listener);
        let connection = self.transport.connection_id().ok_or(Error::NoDaemon)?;

        let ack = {
            let mut slot = lock(&self.registry.event_subscription);
            match slot.as_ref() {
                Some(current) if current.connection == connection => current.ack.clone(),
                _ => {
                    debug!(connection, "subscribing to daemon events");
                    let transport = self.transport.clone();
                    let handler = Arc::clone(&self.event_handler);
                    let ack = async move {
                        transport
                            .subscribe(DAEMON_EVENT, handler)
                            .await
                            .map_err(Error::from)
                    }
                    .boxed()
                    .shared();
                    *slot = Some(EventSubscription {
                        connection,
                        ack: ack.clone(),
                    });
                    ack
                }
            }
        };

        let result = ack.clone().await;
        if result.is_err() {
            // Let the next caller on this connection try again.
            let mut slot = lock(&self.registry.event_subscription);
            if slot.as_ref().is_some_and(|current| current.ack.ptr_eq(&ack)) {
                *slot = None;
            }
        }
        result
    }

    // ── Call helpers ─────────────────────────────────────────────────

    /// Send `method` and decode the response as `T`.
    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<T, Error> {
        let response = self
            .transport
            .send(method, params, Some(timeout))
            .await
            .map_err(|e| {
                debug!(method, error = %e, "daemon call failed");
                Error::from(e)
            })?;

        serde_json::from_value(response).map_err(|e| {
            warn!(method, error = %e, "invalid response from daemon");
            Error::response_parse(method, e)
        })
    }

    /// Send `method` with the default timeout, ignoring the result payload.
    pub(crate) async fn invoke(&self, method: &str, params: Value) -> Result<(), Error> {
        let _: IgnoredAny = self.call(method, params, self.timeouts.default).await?;
        Ok(())
    }
}

fn dispatch_daemon_event(registry: &Registry, payload: Value) {
    let listeners: Vec<DaemonEventListener> = lock(&registry.event_listeners).clone();
    if listeners.is_empty() {
        debug!("daemon event without listeners");
        return;
    }

    match serde_json::from_value::<DaemonEvent>(payload) {
        Ok(event) => {
            debug!(kind = event.kind(), "daemon event");
            for listener in &listeners {
                listener.on_event(event.clone());
            }
        }
        Err(e) => {
            warn!(error = %e, "invalid payload from daemon_event");
            let error = Error::response_parse(DAEMON_EVENT, e);
            for listener in &listeners {
                listener.on_error(error.clone());
            }
        }
    }
}

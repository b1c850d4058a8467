// Connection observers and subscription listeners
//
// Callback pairs handed to `DaemonRpc`. Both are registered behind an
// `Arc` and deduplicated by identity.

use std::fmt;

use crate::error::Error;

type OpenCallback = Box<dyn Fn() + Send + Sync>;
type CloseCallback = Box<dyn Fn(Option<&Error>) + Send + Sync>;

/// Receives connection open and close notifications.
pub struct ConnectionObserver {
    open_handler: OpenCallback,
    close_handler: CloseCallback,
}

impl ConnectionObserver {
    pub fn new<O, C>(on_open: O, on_close: C) -> Self
    where
        O: Fn() + Send + Sync + 'static,
        C: Fn(Option<&Error>) + Send + Sync + 'static,
    {
        Self {
            open_handler: Box::new(on_open),
            close_handler: Box::new(on_close),
        }
    }

    /// Called by the client when the connection opens.
    pub fn on_open(&self) {
        (self.open_handler)();
    }

    /// Called by the client when the connection closes, with the cause if
    /// it did not close on request.
    pub fn on_close(&self, error: Option<&Error>) {
        (self.close_handler)(error);
    }
}

impl fmt::Debug for ConnectionObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionObserver").finish_non_exhaustive()
    }
}

/// Receives decoded push payloads, or the decode error when a payload is
/// malformed. A decode error never ends the subscription.
pub struct SubscriptionListener<T> {
    event_handler: Box<dyn Fn(T) + Send + Sync>,
    error_handler: Box<dyn Fn(Error) + Send + Sync>,
}

impl<T> SubscriptionListener<T> {
    pub fn new<E, R>(on_event: E, on_error: R) -> Self
    where
        E: Fn(T) + Send + Sync + 'static,
        R: Fn(Error) + Send + Sync + 'static,
    {
        Self {
            event_handler: Box::new(on_event),
            error_handler: Box::new(on_error),
        }
    }

    pub fn on_event(&self, payload: T) {
        (self.event_handler)(payload);
    }

    pub fn on_error(&self, error: Error) {
        (self.error_handler)(error);
    }
}

impl<T> fmt::Debug for SubscriptionListener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionListener").finish_non_exhaustive()
    }
}

use std::fmt;

use super::error::SocketError;
use super::Socket;

/// Why a socket left the connecting/connected state.
#[derive(Debug)]
pub enum DisconnectReason {
    /// `stop()` was called while connected
    Stopped,
    /// The peer closed the stream
    ClosedByPeer,
    /// Connection establishment or the transport failed
    Error(SocketError),
}

impl DisconnectReason {
    pub fn error(&self) -> Option<&SocketError> {
        match self {
            DisconnectReason::Error(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Stopped => write!(f, "stopped"),
            DisconnectReason::ClosedByPeer => write!(f, "closed by peer"),
            DisconnectReason::Error(err) => write!(f, "{err}"),
        }
    }
}

/// Receiver of a socket's lifecycle and data notifications.
///
/// A socket holds a weak reference to exactly one observer, given at
/// construction. Callbacks for one socket never overlap and arrive in order:
/// `on_connect` first, then any number of `on_data_received`, and
/// `on_disconnect` last. A failed `connect` produces only `on_disconnect`.
///
/// Callbacks run on the socket's I/O task, so they should return quickly.
/// Calling `send`, `stop` or `connect` on the socket from inside a callback is
/// allowed.
///
/// Stopping a *different* socket from inside a callback is allowed too. If a
/// callback of that socket is running on another thread at the time, `stop`
/// returns without waiting for it, and its `on_disconnect` is delivered on
/// that thread right after the running callback returns. Two callbacks that
/// stop each other's socket therefore never deadlock.
#[cfg_attr(test, mockall::automock)]
pub trait SocketObserver: Send + Sync {
    fn on_connect(&self, socket: &Socket);

    fn on_disconnect(&self, socket: &Socket, reason: &DisconnectReason);

    fn on_data_received(&self, socket: &Socket, data: &[u8]);
}

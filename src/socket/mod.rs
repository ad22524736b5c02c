//! Asynchronous TCP/TLS client socket with observer callbacks.
//!
//! A [`Socket`] connects to one host at a time, optionally upgrades the stream
//! to TLS, and reports what happens to the [`SocketObserver`] it was created
//! with. `connect`, `send` and `stop` return immediately; the network work runs
//! on a tokio task.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tlssocket::{DisconnectReason, Socket, SocketObserver};
//!
//! struct Printer;
//!
//! impl SocketObserver for Printer {
//!     fn on_connect(&self, socket: &Socket) {
//!         socket.send(b"GET / HTTP/1.0\r\n\r\n").ok();
//!     }
//!     fn on_disconnect(&self, _socket: &Socket, reason: &DisconnectReason) {
//!         println!("disconnected: {reason}");
//!     }
//!     fn on_data_received(&self, _socket: &Socket, data: &[u8]) {
//!         print!("{}", String::from_utf8_lossy(data));
//!     }
//! }
//!
//! let observer = Arc::new(Printer);
//! let socket = Socket::new(&observer);
//! socket.connect("example.com:443").unwrap();
//! ```

pub mod address;
pub mod consts;
pub mod error;
pub mod event;
mod gate;
pub mod log;
pub mod observer;
mod runtime;
mod session;
pub mod state;
pub mod stats;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use ::log::{debug, info};
use bytes::Bytes;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

pub use error::SocketError;
pub use observer::{DisconnectReason, SocketObserver};
pub use state::SocketState;

use crate::tls::settings::{SocketSettings, TlsSettings};
use address::Target;
use event::Event;
use gate::{Entry, Gate, Guard};
use runtime::IoContext;
use stats::Stats;

/// Handle to a client connection.
///
/// Clones share the same connection. When the last handle is dropped any
/// session in flight is torn down without further callbacks.
#[derive(Clone)]
pub struct Socket {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    id: String,
    observer: Weak<dyn SocketObserver>,
    settings: Mutex<SocketSettings>,
    session: Mutex<Session>,
    // Held while a callback runs; stop() waits on it
    gate: Gate,
    stats: Arc<Stats>,
    io: IoContext,
}

#[derive(Debug, Default)]
struct Session {
    state: SocketState,
    generation: u64,
    target: Option<Target>,
    outbound: Option<mpsc::UnboundedSender<Bytes>>,
    stop: Option<Event>,
}

impl Session {
    fn set_state(&mut self, next: SocketState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking observer must not wedge the socket
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl Socket {
    /// New idle socket reporting to `observer`.
    ///
    /// Only a weak reference is kept; the caller owns the observer. I/O runs on
    /// the current tokio runtime, or on a dedicated one started at the first
    /// `connect` when there is none.
    pub fn new<O: SocketObserver + 'static>(observer: &Arc<O>) -> Self {
        Socket::with_context(observer, IoContext::current())
    }

    /// Same as [`Socket::new`], running I/O on the runtime behind `handle`.
    pub fn with_handle<O: SocketObserver + 'static>(observer: &Arc<O>, handle: Handle) -> Self {
        Socket::with_context(observer, IoContext::with_handle(handle))
    }

    fn with_context<O: SocketObserver + 'static>(observer: &Arc<O>, io: IoContext) -> Self {
        let observer: Weak<O> = Arc::downgrade(observer);
        let observer: Weak<dyn SocketObserver> = observer;
        Socket {
            inner: Arc::new(Inner {
                id: uuid::Uuid::new_v4().to_string(),
                observer,
                settings: Mutex::new(SocketSettings::default()),
                session: Mutex::new(Session::default()),
                gate: Gate::new(),
                stats: Arc::new(Stats::new()),
                io,
            }),
        }
    }

    pub fn with_settings(self, settings: SocketSettings) -> Self {
        self.set_settings(settings);
        self
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn settings(&self) -> SocketSettings {
        lock(&self.inner.settings).clone()
    }

    /// Replace the settings. A session in flight keeps the values it started with.
    pub fn set_settings(&self, settings: SocketSettings) {
        *lock(&self.inner.settings) = settings;
    }

    pub fn set_tls_settings(&self, tls: TlsSettings) {
        lock(&self.inner.settings).tls = tls;
    }

    pub fn state(&self) -> SocketState {
        lock(&self.inner.session).state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SocketState::Connected
    }

    /// Target of the current or last session, as `host:port`
    pub fn peer(&self) -> Option<String> {
        lock(&self.inner.session)
            .target
            .as_ref()
            .map(|t| t.to_string())
    }

    pub fn stats(&self) -> &Stats {
        &self.inner.stats
    }

    /// Start connecting to `host` (`name`, `name:port`, IPv4 or IPv6, with an
    /// optional port; the default port comes from the settings).
    ///
    /// Returns once the attempt is scheduled. The outcome arrives as
    /// `on_connect` or, on failure, as `on_disconnect`. Allowed from the idle,
    /// disconnected and stopped states.
    pub fn connect(&self, host: &str) -> Result<(), SocketError> {
        let settings = self.settings();
        let target = Target::parse(host, settings.default_port)?;

        let mut session = lock(&self.inner.session);
        if session.state.is_active() {
            return Err(SocketError::AlreadyConnected);
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let stop = Event::new();
        let generation = session.generation + 1;

        self.inner.io.spawn(session::run(
            Arc::downgrade(&self.inner),
            self.inner.id.clone(),
            generation,
            target.clone(),
            settings,
            self.inner.stats.clone(),
            outbound_rx,
            stop.clone(),
        ))?;

        info!("[{}] Connecting to {}", self.inner.id, target);
        session.generation = generation;
        session.set_state(SocketState::Connecting);
        session.target = Some(target);
        session.outbound = Some(outbound_tx);
        session.stop = Some(stop);
        Ok(())
    }

    /// Queue `data` for transmission.
    ///
    /// Only valid while connected; nothing is buffered for a later connection.
    /// Bytes from successive calls, from any thread, go out in call order.
    pub fn send(&self, data: &[u8]) -> Result<(), SocketError> {
        let session = lock(&self.inner.session);
        if session.state != SocketState::Connected {
            return Err(SocketError::NotConnected);
        }
        if data.is_empty() {
            return Ok(());
        }
        let outbound = session.outbound.as_ref().ok_or(SocketError::NotConnected)?;
        outbound
            .send(Bytes::copy_from_slice(data))
            .map_err(|_| SocketError::NotConnected)
    }

    /// Close the connection and move to the stopped state.
    ///
    /// Idempotent. If the socket was connected, `on_disconnect` is delivered
    /// with [`DisconnectReason::Stopped`] before this returns; a pending
    /// connect is abandoned silently. Once this returns no other callback for
    /// the abandoned session will run. A later `connect` starts over.
    ///
    /// The exception is a call from inside a callback of another socket while
    /// this one's callback is running on a different thread: then `stop` does
    /// not wait, and that thread delivers `on_disconnect` once its callback
    /// returns.
    pub fn stop(&self) {
        let (previous, stop) = {
            let mut session = lock(&self.inner.session);
            if session.state == SocketState::Stopped {
                return;
            }
            let previous = session.state;
            session.set_state(SocketState::Stopped);
            session.generation += 1;
            session.outbound = None;
            (previous, session.stop.take())
        };

        if let Some(stop) = stop {
            stop.set();
        }
        info!("[{}] Stopped (was {})", self.inner.id, previous);

        let notify = previous == SocketState::Connected;
        if notify {
            self.inner.stats.mark_disconnected();
        }
        // Let an in-flight callback finish before reporting
        match self.inner.gate.enter_or_defer(notify) {
            Entry::Owned(guard) => {
                if notify {
                    self.inner.deliver_stopped(self);
                }
                self.inner.leave(self, guard);
            }
            Entry::Reentrant => {
                if notify {
                    self.inner.deliver_stopped(self);
                }
            }
            Entry::Deferred => debug!(
                "[{}] Callback running on another thread, not waiting for it",
                self.inner.id
            ),
        }
    }
}

impl PartialEq for Socket {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Socket {}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = lock(&self.inner.session);
        f.debug_struct("Socket")
            .field("id", &self.inner.id)
            .field("state", &session.state)
            .field("target", &session.target)
            .finish()
    }
}

impl Inner {
    /// Run `f` holding the callback gate, unless this thread already holds it
    /// (a callback calling back into the socket).
    fn with_gate<R>(self: &Arc<Self>, f: impl FnOnce(&Socket) -> R) -> R {
        let socket = Socket {
            inner: self.clone(),
        };
        match self.gate.enter() {
            Entry::Owned(guard) => {
                let result = f(&socket);
                self.leave(&socket, guard);
                result
            }
            _ => f(&socket),
        }
    }

    /// Release the gate, first delivering a stop handed over while it was held.
    fn leave(&self, socket: &Socket, mut guard: Guard<'_>) {
        while let Err(held) = guard.release() {
            guard = held;
            self.deliver_stopped(socket);
        }
    }

    /// Run `notify` against the observer. Caller holds the gate.
    fn deliver<F>(&self, socket: &Socket, notify: F)
    where
        F: FnOnce(&dyn SocketObserver, &Socket),
    {
        match self.observer.upgrade() {
            Some(observer) => notify(observer.as_ref(), socket),
            None => debug!("[{}] Observer is gone, notification dropped", self.id),
        }
    }

    fn deliver_stopped(&self, socket: &Socket) {
        self.deliver(socket, |observer, socket| {
            observer.on_disconnect(socket, &DisconnectReason::Stopped)
        });
    }

    fn is_current(&self, generation: u64, state: SocketState) -> bool {
        let session = lock(&self.session);
        session.generation == generation && session.state == state
    }

    /// Session `generation` finished its handshake.
    ///
    /// Returns false if the session was stopped or replaced meanwhile.
    pub(crate) fn connected(self: &Arc<Self>, generation: u64) -> bool {
        self.with_gate(|socket| {
            {
                let mut session = lock(&self.session);
                if session.generation != generation || session.state != SocketState::Connecting {
                    return false;
                }
                session.set_state(SocketState::Connected);
            }
            self.stats.mark_connected();
            info!("[{}] Connected", self.id);

            self.deliver(socket, |observer, socket| observer.on_connect(socket));
            true
        })
    }

    /// Bytes arrived on session `generation`. Returns false once the session is stale.
    pub(crate) fn received(self: &Arc<Self>, generation: u64, data: &[u8]) -> bool {
        self.with_gate(|socket| {
            if !self.is_current(generation, SocketState::Connected) {
                return false;
            }
            self.stats.add_recv_bytes(data.len() as u64);

            self.deliver(socket, |observer, socket| {
                observer.on_data_received(socket, data)
            });
            true
        })
    }

    /// Session `generation` failed or was closed by the peer.
    pub(crate) fn disconnected(self: &Arc<Self>, generation: u64, reason: DisconnectReason) {
        self.with_gate(|socket| {
            let previous = {
                let mut session = lock(&self.session);
                if session.generation != generation || !session.state.is_active() {
                    return;
                }
                let previous = session.state;
                session.set_state(SocketState::Disconnected);
                session.outbound = None;
                session.stop = None;
                previous
            };
            if previous == SocketState::Connected {
                self.stats.mark_disconnected();
            }
            info!("[{}] Disconnected ({}): {}", self.id, previous, reason);

            self.deliver(socket, |observer, socket| {
                observer.on_disconnect(socket, &reason)
            });
        })
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let session = self.session.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(stop) = session.stop.take() {
            debug!("[{}] Dropped while {}, closing", self.id, session.state);
            stop.set();
        }
    }
}

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tlssocket::{DisconnectReason, Socket, SocketError, SocketObserver, SocketState};

use super::utils;

/// Owned copy of a [`DisconnectReason`]
#[derive(Clone, Debug, PartialEq)]
pub enum Disconnect {
    Stopped,
    ClosedByPeer,
    Handshake,
    Transport(io::ErrorKind),
    Other(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Recorded {
    Connected(SocketState),
    Data(Vec<u8>),
    Disconnected(Disconnect),
}

/// Observer that records every callback, in order.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<Recorded>>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Recorder::default())
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().unwrap().clone()
    }

    pub fn connects(&self) -> usize {
        self.count(|e| matches!(e, Recorded::Connected(_)))
    }

    pub fn disconnects(&self) -> Vec<Disconnect> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Recorded::Disconnected(reason) => Some(reason),
                _ => None,
            })
            .collect()
    }

    /// All data chunks concatenated
    pub fn data(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Recorded::Data(chunk) => Some(chunk),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub async fn wait_connected(&self) -> bool {
        utils::wait_until(Duration::from_secs(5), || self.connects() > 0).await
    }

    pub async fn wait_disconnected(&self) -> bool {
        utils::wait_until(Duration::from_secs(5), || !self.disconnects().is_empty()).await
    }

    pub async fn wait_data(&self, len: usize) -> bool {
        utils::wait_until(Duration::from_secs(5), || self.data().len() >= len).await
    }

    fn count<F: Fn(&Recorded) -> bool>(&self, filter: F) -> usize {
        self.events.lock().unwrap().iter().filter(|e| filter(e)).count()
    }

    fn push(&self, event: Recorded) {
        self.events.lock().unwrap().push(event);
    }
}

impl SocketObserver for Recorder {
    fn on_connect(&self, socket: &Socket) {
        self.push(Recorded::Connected(socket.state()));
    }

    fn on_disconnect(&self, _socket: &Socket, reason: &DisconnectReason) {
        let reason = match reason {
            DisconnectReason::Stopped => Disconnect::Stopped,
            DisconnectReason::ClosedByPeer => Disconnect::ClosedByPeer,
            DisconnectReason::Error(SocketError::HandshakeFailure(_)) => Disconnect::Handshake,
            DisconnectReason::Error(SocketError::Transport(e)) => Disconnect::Transport(e.kind()),
            DisconnectReason::Error(e) => Disconnect::Other(e.to_string()),
        };
        self.push(Recorded::Disconnected(reason));
    }

    fn on_data_received(&self, _socket: &Socket, data: &[u8]) {
        self.push(Recorded::Data(data.to_vec()));
    }
}

use std::sync::{Arc, Weak};

use bytes::Bytes;
use log::{debug, warn};
use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use super::address::Target;
use super::consts;
use super::error::{self, SocketError};
use super::event::Event;
use super::observer::DisconnectReason;
use super::stats::Stats;
use super::Inner;
use crate::tls::client::ConnectionBuilder;
use crate::tls::settings::SocketSettings;

/// One connection attempt and, if it succeeds, its lifetime.
///
/// Only a weak reference to the socket is held: when the last handle goes away
/// the task notices on its next notification and exits quietly. `stop` ends
/// the task at any point.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn run(
    socket: Weak<Inner>,
    socket_id: String,
    generation: u64,
    target: Target,
    settings: SocketSettings,
    stats: Arc<Stats>,
    outbound: mpsc::UnboundedReceiver<Bytes>,
    stop: Event,
) {
    // The field is public, a zero sized buffer would read as EOF
    let buffer_size = settings
        .read_buffer_size
        .clamp(consts::MIN_READ_BUFFER_SIZE, consts::MAX_READ_BUFFER_SIZE);

    let established = tokio::select! {
        _ = stop.clone() => {
            debug!("[{}] Connect to {} abandoned", socket_id, target);
            return;
        }
        result = ConnectionBuilder::new(target.clone()).with_settings(settings).connect() => result,
    };

    let stream = match established {
        Ok(stream) => stream,
        Err(err) => {
            match &err {
                SocketError::HandshakeFailure(_) => {
                    error::log_handshake_error(&socket_id, &target.to_string(), &err)
                }
                _ => warn!("[{}] Could not connect to {}: {}", socket_id, target, err),
            }
            if let Some(socket) = socket.upgrade() {
                socket.disconnected(generation, DisconnectReason::Error(err));
            }
            return;
        }
    };

    match socket.upgrade() {
        Some(inner) if inner.connected(generation) => (),
        // Stopped or dropped while the handshake ran, the stream just closes
        _ => return,
    }

    let (reader, writer) = io::split(stream);

    let reason = tokio::select! {
        _ = stop => None,
        reason = read_loop(&socket, generation, reader, buffer_size) => reason,
        reason = write_loop(&socket_id, &stats, writer, outbound) => reason,
    };

    match reason {
        Some(reason) => {
            if let Some(socket) = socket.upgrade() {
                socket.disconnected(generation, reason);
            }
        }
        None => debug!("[{}] Session with {} closed locally", socket_id, target),
    }
}

/// Deliver everything read until EOF or an error.
///
/// `None` when the session became stale while reading.
async fn read_loop<R: AsyncRead + Unpin>(
    socket: &Weak<Inner>,
    generation: u64,
    mut reader: R,
    buffer_size: usize,
) -> Option<DisconnectReason> {
    let mut buffer = vec![0u8; buffer_size];
    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => return Some(DisconnectReason::ClosedByPeer),
            Ok(n) => {
                let delivered = match socket.upgrade() {
                    Some(socket) => socket.received(generation, &buffer[..n]),
                    None => false,
                };
                if !delivered {
                    return None;
                }
            }
            Err(e) => return Some(DisconnectReason::Error(SocketError::Transport(e))),
        }
    }
}

/// Write queued buffers in order. Returns `None` once the queue is closed.
async fn write_loop<W: AsyncWrite + Unpin>(
    socket_id: &str,
    stats: &Stats,
    mut writer: W,
    mut outbound: mpsc::UnboundedReceiver<Bytes>,
) -> Option<DisconnectReason> {
    while let Some(data) = outbound.recv().await {
        let written = async {
            writer.write_all(&data).await?;
            writer.flush().await
        }
        .await;
        if let Err(e) = written {
            return Some(DisconnectReason::Error(SocketError::Transport(e)));
        }
        stats.add_sent_bytes(data.len() as u64);
    }

    if let Err(e) = writer.shutdown().await {
        debug!("[{}] Error shutting down writer: {}", socket_id, e);
    }
    None
}

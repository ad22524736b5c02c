use std::io;

use log::error;
use thiserror::Error;

/// Errors reported by a [`Socket`](super::Socket).
///
/// `InvalidAddress`, `AlreadyConnected`, `NotConnected` and `InvalidSetting` are
/// returned straight to the caller. `HandshakeFailure` and `Transport` happen on
/// the I/O task and only reach the observer, wrapped in a
/// [`DisconnectReason`](super::DisconnectReason).
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    #[error("socket is already connecting or connected")]
    AlreadyConnected,

    #[error("socket is not connected")]
    NotConnected,

    #[error("TLS handshake failed: {0}")]
    HandshakeFailure(String),

    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("invalid setting '{name}': {message}")]
    InvalidSetting { name: String, message: String },
}

impl SocketError {
    pub(crate) fn invalid_setting(name: &str, message: impl Into<String>) -> Self {
        SocketError::InvalidSetting {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// True for failures that happen after `connect` returned (handshake, I/O).
    pub fn is_async(&self) -> bool {
        matches!(
            self,
            SocketError::HandshakeFailure(_) | SocketError::Transport(_)
        )
    }
}

pub(crate) fn log_handshake_error(socket_id: &str, target: &str, err: &SocketError) {
    error!("[{socket_id}] HANDSHAKE error with {target}: {err}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SocketError::InvalidAddress("bad host".into()).to_string(),
            "invalid address 'bad host'"
        );
        assert_eq!(
            SocketError::NotConnected.to_string(),
            "socket is not connected"
        );
        assert_eq!(
            SocketError::invalid_setting("peer_name", "must not be empty").to_string(),
            "invalid setting 'peer_name': must not be empty"
        );
    }

    #[test]
    fn test_async_kinds() {
        assert!(SocketError::HandshakeFailure("bad certificate".into()).is_async());
        assert!(SocketError::from(io::Error::from(io::ErrorKind::ConnectionRefused)).is_async());
        assert!(!SocketError::AlreadyConnected.is_async());
        assert!(!SocketError::NotConnected.is_async());
    }
}

use std::fmt;

/// Lifecycle of a [`Socket`](super::Socket).
///
/// ```text
/// Idle ──connect──▶ Connecting ──ok──▶ Connected
///                       │                  │
///                       └──fail──▶ Disconnected ◀──peer close / error
///
/// any ──stop──▶ Stopped          Disconnected | Stopped ──connect──▶ Connecting
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SocketState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Stopped,
}

impl SocketState {
    pub fn can_transition_to(&self, next: SocketState) -> bool {
        use SocketState::*;

        matches!(
            (self, next),
            (Idle, Connecting)
                | (Disconnected, Connecting)
                | (Stopped, Connecting)
                | (Connecting, Connected)
                | (Connecting, Disconnected)
                | (Connected, Disconnected)
                | (_, Stopped)
        )
    }

    /// A session is in flight (a transport exists or is being set up)
    pub fn is_active(&self) -> bool {
        matches!(self, SocketState::Connecting | SocketState::Connected)
    }
}

impl fmt::Display for SocketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketState::Idle => write!(f, "idle"),
            SocketState::Connecting => write!(f, "connecting"),
            SocketState::Connected => write!(f, "connected"),
            SocketState::Disconnected => write!(f, "disconnected"),
            SocketState::Stopped => write!(f, "stopped"),
        }
    }
}

pub mod config;
pub mod socket;
pub mod tls;

pub use socket::{DisconnectReason, Socket, SocketError, SocketObserver, SocketState};
pub use tls::settings::{SocketSettings, TlsSettings, TlsVersion};

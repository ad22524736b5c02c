use std::fmt;
use std::net::{IpAddr, SocketAddr};

use rustls::pki_types::ServerName;

use super::error::SocketError;

/// Host and port a socket connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    /// Parse `host`, `host:port`, `a.b.c.d[:port]`, `::1` or `[::1]:port`.
    ///
    /// The host part must be a literal IP address or a valid DNS name. When no
    /// port is given `default_port` is used.
    pub fn parse(address: &str, default_port: u16) -> Result<Self, SocketError> {
        let invalid = || SocketError::InvalidAddress(address.to_string());

        if address.is_empty() || address.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid());
        }

        // Full socket address, covers "1.2.3.4:80" and "[::1]:80"
        if let Ok(addr) = address.parse::<SocketAddr>() {
            if addr.port() == 0 {
                return Err(invalid());
            }
            return Ok(Target {
                host: addr.ip().to_string(),
                port: addr.port(),
            });
        }

        // Bare IP, including unbracketed IPv6
        if let Ok(ip) = address.parse::<IpAddr>() {
            return Ok(Target {
                host: ip.to_string(),
                port: default_port,
            });
        }

        if address.starts_with('[') {
            // "[::1]" without port
            let inner = address
                .strip_prefix('[')
                .and_then(|s| s.strip_suffix(']'))
                .ok_or_else(invalid)?;
            let ip = inner.parse::<std::net::Ipv6Addr>().map_err(|_| invalid())?;
            return Ok(Target {
                host: ip.to_string(),
                port: default_port,
            });
        }

        let (host, port) = match address.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| invalid())?;
                if port == 0 {
                    return Err(invalid());
                }
                (host, port)
            }
            None => (address, default_port),
        };

        let host = host.trim_end_matches('.');
        if host.is_empty() || host.len() > 253 || ServerName::try_from(host).is_err() {
            return Err(invalid());
        }

        Ok(Target {
            host: host.to_string(),
            port,
        })
    }

    /// Name presented for SNI and certificate checks
    pub fn server_name(&self, peer_name: Option<&str>) -> Result<ServerName<'static>, SocketError> {
        let name = peer_name.unwrap_or(&self.host);
        ServerName::try_from(name.to_string())
            .map_err(|_| SocketError::invalid_setting("peer_name", format!("'{name}' is not a valid server name")))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

//! Structured replacement for the untyped "SSL settings" bag.
//!
//! [`TlsSettings`] holds the recognized TLS options, [`SocketSettings`] wraps
//! them together with the transport level knobs. Both are plain values: a
//! socket takes a snapshot when `connect` is called, so the last value set
//! before a connect attempt wins.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::socket::consts;
use crate::socket::SocketError;

/// Lowest TLS protocol version accepted during the handshake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsVersion {
    #[default]
    Tls12,
    Tls13,
}

impl TlsVersion {
    pub fn protocol_versions(&self) -> &'static [&'static rustls::SupportedProtocolVersion] {
        static TLS12_AND_UP: &[&rustls::SupportedProtocolVersion] =
            &[&rustls::version::TLS13, &rustls::version::TLS12];
        static TLS13_ONLY: &[&rustls::SupportedProtocolVersion] = &[&rustls::version::TLS13];

        match self {
            TlsVersion::Tls12 => TLS12_AND_UP,
            TlsVersion::Tls13 => TLS13_ONLY,
        }
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsVersion::Tls12 => write!(f, "1.2"),
            TlsVersion::Tls13 => write!(f, "1.3"),
        }
    }
}

impl FromStr for TlsVersion {
    type Err = SocketError;

    // 1.0 and 1.1 are not supported
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1.2" | "tls1.2" | "tlsv1.2" | "tlsv1_2" => Ok(TlsVersion::Tls12),
            "1.3" | "tls1.3" | "tlsv1.3" | "tlsv1_3" => Ok(TlsVersion::Tls13),
            _ => Err(SocketError::invalid_setting(
                "min_protocol_version",
                format!("unsupported TLS version '{s}', expected 1.2 or 1.3"),
            )),
        }
    }
}

/// TLS options applied when a socket upgrades its TCP stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsSettings {
    /// Upgrade to TLS after the TCP handshake. When false the stream stays plain.
    pub enabled: bool,
    /// Accept any server certificate (development only)
    pub trust_all_certificates: bool,
    /// Name used for SNI and certificate checks instead of the connect host
    pub peer_name: Option<String>,
    pub min_protocol_version: TlsVersion,
    /// OpenSSL style cipher list, "" for the provider defaults
    pub ciphers: String,
    /// PEM bundle of trusted roots, `None` for the platform store
    pub ca_certificate_path: Option<String>,
}

impl Default for TlsSettings {
    fn default() -> Self {
        TlsSettings {
            enabled: true,
            trust_all_certificates: false,
            peer_name: None,
            min_protocol_version: TlsVersion::default(),
            ciphers: String::new(),
            ca_certificate_path: None,
        }
    }
}

impl TlsSettings {
    /// Plain TCP, no TLS upgrade
    pub fn disabled() -> Self {
        TlsSettings {
            enabled: false,
            ..Default::default()
        }
    }

    /// Build settings from named options, starting from the defaults.
    ///
    /// Recognized names: `enabled`, `trust_all_certificates`,
    /// `validates_certificate_chain` (its inverse), `peer_name`,
    /// `min_protocol_version`, `ciphers`, `ca_certificate_path`.
    pub fn from_options<I, K, V>(options: I) -> Result<Self, SocketError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = TlsSettings::default();
        for (name, value) in options {
            settings.set_option(name.as_ref(), value.as_ref())?;
        }
        Ok(settings)
    }

    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), SocketError> {
        match name {
            "enabled" => self.enabled = parse_bool(name, value)?,
            "trust_all_certificates" => self.trust_all_certificates = parse_bool(name, value)?,
            "validates_certificate_chain" => {
                self.trust_all_certificates = !parse_bool(name, value)?
            }
            "peer_name" => self.peer_name = non_empty(value),
            "min_protocol_version" => self.min_protocol_version = value.parse()?,
            "ciphers" => self.ciphers = value.trim().to_string(),
            "ca_certificate_path" => self.ca_certificate_path = non_empty(value),
            _ => {
                return Err(SocketError::invalid_setting(name, "unknown TLS option"));
            }
        }
        Ok(())
    }
}

/// Everything a socket needs to know before it connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketSettings {
    pub tls: TlsSettings,
    /// Used when the host passed to `connect` carries no port
    pub default_port: u16,
    /// Bound on DNS + TCP + TLS establishment
    pub connect_timeout: Duration,
    pub read_buffer_size: usize,
    pub nodelay: bool,
}

impl Default for SocketSettings {
    fn default() -> Self {
        SocketSettings {
            tls: TlsSettings::default(),
            default_port: consts::DEFAULT_PORT,
            connect_timeout: consts::CONNECT_TIMEOUT,
            read_buffer_size: consts::READ_BUFFER_SIZE,
            nodelay: true,
        }
    }
}

impl SocketSettings {
    pub fn with_tls(mut self, tls: TlsSettings) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(consts::MIN_READ_BUFFER_SIZE, consts::MAX_READ_BUFFER_SIZE);
        self
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, SocketError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SocketError::invalid_setting(
            name,
            format!("'{value}' is not a boolean"),
        )),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

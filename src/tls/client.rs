use tokio::{
    io::{self, AsyncRead, AsyncWrite},
    net::TcpStream,
    time::timeout,
};

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};

use tokio_rustls::{
    rustls::{
        pki_types::{pem::PemObject, CertificateDer},
        ClientConfig, RootCertStore,
    },
    TlsConnector,
};

use super::crypto_provider;
use super::noverify::NoVerifySsl;
use super::settings::{SocketSettings, TlsSettings};
use crate::socket::{address::Target, SocketError};

/// Byte stream produced by [`ConnectionBuilder::connect`], plain or TLS.
pub trait IoStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> IoStream for T {}

pub struct ConnectionBuilder {
    target: Target,
    settings: SocketSettings,
}

impl fmt::Debug for ConnectionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionBuilder")
            .field("target", &self.target.to_string())
            .field("tls", &self.settings.tls.enabled)
            .field("trust_all", &self.settings.tls.trust_all_certificates)
            .finish()
    }
}

impl ConnectionBuilder {
    pub fn new(target: Target) -> Self {
        ConnectionBuilder {
            target,
            settings: SocketSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: SocketSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Resolve, connect and (if enabled) run the TLS handshake, all bounded by
    /// the configured connect timeout.
    pub async fn connect(self) -> Result<Box<dyn IoStream>, SocketError> {
        let limit = self.settings.connect_timeout;
        match timeout(limit, self.establish()).await {
            Ok(result) => result,
            Err(_) => Err(SocketError::Transport(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connection not established after {:?}", limit),
            ))),
        }
    }

    async fn establish(self) -> Result<Box<dyn IoStream>, SocketError> {
        debug!("Connecting to {}", self.target);

        // Configuration problems surface before any traffic is sent
        let connector = if self.settings.tls.enabled {
            Some(tls_connector(&self.settings.tls)?)
        } else {
            None
        };

        let stream = TcpStream::connect((self.target.host.as_str(), self.target.port)).await?;
        stream.set_nodelay(self.settings.nodelay)?;
        debug!(
            "TCP connected to {} ({})",
            self.target,
            stream
                .peer_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "[unknown]".into())
        );

        let connector = match connector {
            Some(connector) => connector,
            None => return Ok(Box::new(stream)),
        };

        let server_name = self
            .target
            .server_name(self.settings.tls.peer_name.as_deref())?;
        let tls_stream = connector
            .connect(server_name, stream)
            .await
            .map_err(|e| SocketError::HandshakeFailure(e.to_string()))?;

        let (_, session) = tls_stream.get_ref();
        debug!(
            "TLS established with {}: {:?} {:?}",
            self.target,
            session.protocol_version(),
            session.negotiated_cipher_suite().map(|s| s.suite())
        );

        Ok(Box::new(tls_stream))
    }
}

/// Compile `settings` into a rustls connector.
pub fn tls_connector(settings: &TlsSettings) -> Result<TlsConnector, SocketError> {
    let provider = Arc::new(crypto_provider::provider(&settings.ciphers));

    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_protocol_versions(settings.min_protocol_version.protocol_versions())
        .map_err(|e| SocketError::invalid_setting("ciphers", e.to_string()))?;

    let config = if settings.trust_all_certificates {
        warn!("Certificate verification is disabled");
        builder
            .dangerous()
            .with_custom_certificate_verifier(NoVerifySsl::new(provider))
            .with_no_client_auth()
    } else {
        builder
            .with_root_certificates(root_store(settings.ca_certificate_path.as_deref())?)
            .with_no_client_auth()
    };

    Ok(TlsConnector::from(Arc::new(config)))
}

fn root_store(certificate_path: Option<&str>) -> Result<RootCertStore, SocketError> {
    let mut root_store = RootCertStore::empty();

    match certificate_path {
        Some(path) => {
            debug!("Loading certificates from: {}", path);
            let bad_file = |e: &dyn fmt::Display| {
                SocketError::invalid_setting("ca_certificate_path", format!("{path}: {e}"))
            };
            let certs: Vec<CertificateDer> = CertificateDer::pem_file_iter(path)
                .map_err(|e| bad_file(&e))?
                .collect::<Result<_, _>>()
                .map_err(|e| bad_file(&e))?;

            let (added, ignored) = root_store.add_parsable_certificates(certs);
            if added == 0 {
                return Err(bad_file(&"no usable certificates"));
            }
            debug!("Loaded {} certificates ({} ignored)", added, ignored);
        }
        None => {
            let native = rustls_native_certs::load_native_certs();
            for err in &native.errors {
                warn!("Error loading platform certificates: {}", err);
            }
            let (added, ignored) = root_store.add_parsable_certificates(native.certs);
            debug!("Loaded {} platform certificates ({} ignored)", added, ignored);
        }
    }

    Ok(root_store)
}

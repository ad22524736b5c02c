use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::{
    rustls::{
        crypto::aws_lc_rs,
        pki_types::{CertificateDer, PrivateKeyDer},
        ServerConfig,
    },
    TlsAcceptor,
};

/// TLS echo server with a freshly generated self-signed certificate for
/// `localhost`.
pub struct TlsServer {
    pub port: u16,
    pub cert_pem: String,
    handle: tokio::task::JoinHandle<()>,
}

#[allow(dead_code)]
impl TlsServer {
    pub async fn spawn() -> Self {
        let key_pair = rcgen::KeyPair::generate().unwrap();
        let params = rcgen::CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        let cert = params.self_signed(&key_pair).unwrap();

        let server_cert = CertificateDer::from(cert.der().to_vec());
        let server_key = PrivateKeyDer::try_from(key_pair.serialize_der()).unwrap();
        let config = ServerConfig::builder_with_provider(Arc::new(aws_lc_rs::default_provider()))
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(vec![server_cert], server_key)
            .unwrap();
        let acceptor = TlsAcceptor::from(Arc::new(config));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                let acceptor = acceptor.clone();
                tokio::spawn(async move {
                    // Rejected handshakes just drop the connection
                    let mut stream = match acceptor.accept(stream).await {
                        Ok(stream) => stream,
                        Err(e) => {
                            log::debug!("Fake TLS server handshake error: {}", e);
                            return;
                        }
                    };
                    let mut buffer = [0; 8192];
                    loop {
                        let n = match stream.read(&mut buffer).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => n,
                        };
                        if stream.write_all(&buffer[..n]).await.is_err() {
                            break;
                        }
                    }
                    stream.shutdown().await.ok();
                });
            }
        });

        TlsServer {
            port,
            cert_pem: cert.pem(),
            handle,
        }
    }

    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// Write the certificate to a unique temporary file, usable as a CA bundle
    pub fn write_ca_file(&self) -> PathBuf {
        let path = std::env::temp_dir().join(format!("tlssocket-ca-{}.pem", uuid::Uuid::new_v4()));
        std::fs::write(&path, &self.cert_pem).unwrap();
        path
    }
}

impl Drop for TlsServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

use std::time::Duration;

use crate::socket::{consts, SocketError};
use crate::tls::settings::{SocketSettings, TlsSettings};

/// Settings for the `tlssocket` tool, loaded by [`ConfigLoader`].
///
/// # Configuration Loading Order
///
/// 1. Default values are set.
/// 2. The configuration file (INI, no sections) is loaded if it exists.
/// 3. Environment variables prefixed with `TLSSOCKET_` override both.
///
/// # Example
///
/// ```rust
/// use tlssocket::config::ConfigLoader;
/// let config = ConfigLoader::new()
///     .with_filename("custom_config.conf")
///     .load()
///     .unwrap();
/// let settings = config.socket_settings().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub loglevel: String,
    pub logfile: Option<String>,

    pub port: u16,
    pub connect_timeout: Duration,
    pub read_buffer_size: usize,
    pub nodelay: bool,

    pub tls_enabled: bool,
    pub trust_all_certificates: bool,
    pub peer_name: Option<String>,
    pub ssl_min_tls_version: String, // Valid values are 1.2, 1.3 (1.0 and 1.1 are not supported)
    pub ssl_ciphers: String,
    pub ssl_ca_certificate: Option<String>,
}

impl Config {
    /// Settings a [`Socket`](crate::Socket) should use for this configuration.
    pub fn socket_settings(&self) -> Result<SocketSettings, SocketError> {
        let tls = TlsSettings {
            enabled: self.tls_enabled,
            trust_all_certificates: self.trust_all_certificates,
            peer_name: self.peer_name.clone(),
            min_protocol_version: self.ssl_min_tls_version.parse()?,
            ciphers: self.ssl_ciphers.clone(),
            ca_certificate_path: self.ssl_ca_certificate.clone(),
        };

        Ok(SocketSettings {
            tls,
            default_port: self.port,
            connect_timeout: self.connect_timeout,
            read_buffer_size: self.read_buffer_size,
            nodelay: self.nodelay,
        })
    }
}

pub struct ConfigLoader {
    filename: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        ConfigLoader::new()
    }
}

impl ConfigLoader {
    /// Create a new ConfigLoader object
    pub fn new() -> Self {
        let config_file = if cfg!(debug_assertions) {
            consts::CONFIGFILE_DEBUG
        } else {
            consts::CONFIGFILE
        };
        ConfigLoader {
            filename: config_file.into(),
        }
    }

    /// Set the configuration file to load
    pub fn with_filename(&mut self, file: &str) -> &mut Self {
        self.filename = file.to_string();
        self
    }

    /// Load defaults, then the configuration file, then `TLSSOCKET_*`
    /// environment variables. A missing file is not an error.
    pub fn load(&self) -> Result<Config, config::ConfigError> {
        let cfg_reader = config::Config::builder()
            .set_default("loglevel", "INFO")?
            .set_default("logfile", "")?
            .set_default("port", consts::DEFAULT_PORT)?
            .set_default("connect_timeout", consts::CONNECT_TIMEOUT.as_secs_f64())?
            .set_default("read_buffer_size", consts::READ_BUFFER_SIZE as u64)?
            .set_default("nodelay", true)?
            .set_default("tls_enabled", true)?
            .set_default("trust_all_certificates", false)?
            .set_default("peer_name", "")?
            .set_default("ssl_min_tls_version", "1.2")?
            .set_default("ssl_ciphers", "")?
            .set_default("ssl_ca_certificate", "")?
            .add_source(config::File::new(&self.filename, config::FileFormat::Ini).required(false))
            .add_source(config::Environment::with_prefix("tlssocket"))
            .build()?;

        let connect_timeout = cfg_reader.get::<f32>("connect_timeout")?;
        if !connect_timeout.is_finite() {
            return Err(config::ConfigError::Message(format!(
                "connect_timeout must be a number of seconds, got {}",
                connect_timeout
            )));
        }
        let connect_timeout =
            connect_timeout.clamp(consts::MIN_CONNECT_TIMEOUT, consts::MAX_CONNECT_TIMEOUT);
        let connect_timeout = Duration::from_millis((connect_timeout * 1000.0) as u64);

        let read_buffer_size = usize::try_from(cfg_reader.get::<u64>("read_buffer_size")?)
            .unwrap_or(consts::MAX_READ_BUFFER_SIZE)
            .clamp(consts::MIN_READ_BUFFER_SIZE, consts::MAX_READ_BUFFER_SIZE);

        Ok(Config {
            loglevel: cfg_reader.get::<String>("loglevel")?.to_uppercase(),
            logfile: optional(cfg_reader.get("logfile")?),
            port: cfg_reader.get("port")?,
            connect_timeout,
            read_buffer_size,
            nodelay: cfg_reader.get("nodelay")?,
            tls_enabled: cfg_reader.get("tls_enabled")?,
            trust_all_certificates: cfg_reader.get("trust_all_certificates")?,
            peer_name: optional(cfg_reader.get("peer_name")?),
            ssl_min_tls_version: cfg_reader.get("ssl_min_tls_version")?,
            ssl_ciphers: cfg_reader.get("ssl_ciphers")?,
            ssl_ca_certificate: optional(cfg_reader.get("ssl_ca_certificate")?),
        })
    }
}

// Empty strings in the file mean "not set"
fn optional(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tls::settings::TlsVersion;

    fn defaults() -> Config {
        ConfigLoader::new()
            .with_filename("non_existing_for_tests")
            .load()
            .unwrap()
    }

    #[test]
    fn test_socket_settings_from_defaults() {
        let settings = defaults().socket_settings().unwrap();
        assert_eq!(settings, SocketSettings::default());
    }

    #[test]
    fn test_socket_settings_maps_tls_fields() {
        let mut config = defaults();
        config.trust_all_certificates = true;
        config.peer_name = Some("backend.internal".into());
        config.ssl_min_tls_version = "1.3".into();
        config.ssl_ca_certificate = Some("/tmp/ca.pem".into());
        config.port = 8443;

        let settings = config.socket_settings().unwrap();
        assert!(settings.tls.trust_all_certificates);
        assert_eq!(settings.tls.peer_name.as_deref(), Some("backend.internal"));
        assert_eq!(settings.tls.min_protocol_version, TlsVersion::Tls13);
        assert_eq!(settings.tls.ca_certificate_path.as_deref(), Some("/tmp/ca.pem"));
        assert_eq!(settings.default_port, 8443);
    }

    #[test]
    fn test_socket_settings_rejects_old_tls() {
        let mut config = defaults();
        config.ssl_min_tls_version = "1.0".into();
        assert!(matches!(
            config.socket_settings(),
            Err(SocketError::InvalidSetting { .. })
        ));
    }

    fn load_from(name: &str, content: &str) -> Result<Config, config::ConfigError> {
        let path = std::env::temp_dir().join(format!("{}-{}.conf", name, uuid::Uuid::new_v4()));
        std::fs::write(&path, content).unwrap();
        let result = ConfigLoader::new()
            .with_filename(path.to_str().unwrap())
            .load();
        std::fs::remove_file(&path).unwrap();
        result
    }

    #[test]
    fn test_load_clamps_out_of_range_values() {
        let config = load_from(
            "tlssocket-clamp",
            "connect_timeout = 9999\nread_buffer_size = 1\n",
        )
        .unwrap();
        assert_eq!(
            config.connect_timeout,
            Duration::from_secs_f32(consts::MAX_CONNECT_TIMEOUT)
        );
        assert_eq!(config.read_buffer_size, consts::MIN_READ_BUFFER_SIZE);
    }

    #[test]
    fn test_load_rejects_malformed_timeout() {
        assert!(load_from("tlssocket-timeout", "connect_timeout = abc\n").is_err());
    }

    #[test]
    fn test_load_rejects_nan_timeout() {
        let err = load_from("tlssocket-nan", "connect_timeout = nan\n").unwrap_err();
        assert!(err.to_string().contains("connect_timeout"));
    }

    #[test]
    fn test_load_rejects_malformed_buffer_size() {
        assert!(load_from("tlssocket-buffer", "read_buffer_size = lots\n").is_err());
    }

    #[test]
    fn test_optional() {
        assert_eq!(optional("".into()), None);
        assert_eq!(optional("  ".into()), None);
        assert_eq!(optional("x".into()), Some("x".to_string()));
    }
}

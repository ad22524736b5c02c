use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio::io::AsyncReadExt;

use tlssocket::socket::{consts, event::Event, log as logging};
use tlssocket::{config, DisconnectReason, Socket, SocketObserver};

/// Prints inbound bytes to stdout and signals when the connection goes away.
struct Terminal {
    connected: Event,
    closed: Event,
}

impl SocketObserver for Terminal {
    fn on_connect(&self, socket: &Socket) {
        info!("Connected to {}", socket.peer().unwrap_or_default());
        self.connected.set();
    }

    fn on_disconnect(&self, socket: &Socket, reason: &DisconnectReason) {
        let stats = socket.stats();
        match reason.error() {
            Some(err) => warn!("Connection failed: {}", err),
            None => info!(
                "Disconnected ({}), {} bytes in, {} bytes out, up {:.1?}",
                reason,
                stats.recv_bytes(),
                stats.sent_bytes(),
                stats.age()
            ),
        }
        self.closed.set();
    }

    fn on_data_received(&self, _socket: &Socket, data: &[u8]) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(data).and_then(|_| stdout.flush()) {
            debug!("Error writing to stdout: {}", e);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = clap::Command::new("tlssocket")
        .version(consts::VERSION)
        .about("Connect to a TCP/TLS server and pipe stdin/stdout through it")
        .arg(
            clap::Arg::new("config")
                .short('c')
                .long("config")
                .help("Config file to use")
                .action(clap::ArgAction::Set),
        )
        .arg(
            clap::Arg::new("port")
                .short('p')
                .long("port")
                .help("Port used when HOST has none")
                .value_parser(clap::value_parser!(u16).range(1..))
                .action(clap::ArgAction::Set),
        )
        .arg(
            clap::Arg::new("insecure")
                .long("insecure")
                .help("Accept any server certificate")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("no-tls")
                .long("no-tls")
                .help("Plain TCP, no TLS upgrade")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("peer-name")
                .long("peer-name")
                .help("Name to verify the server certificate against")
                .action(clap::ArgAction::Set),
        )
        .arg(
            clap::Arg::new("host")
                .help("host, host:port or [ipv6]:port")
                .required(true),
        );

    let matches = cmd.get_matches();

    let mut loader = config::ConfigLoader::new();
    if let Some(config_file) = matches.get_one::<String>("config") {
        loader.with_filename(config_file);
    }
    let config = loader.load().context("Loading configuration")?;

    logging::setup(&config.logfile, &config.loglevel).context("Setting up logging")?;
    info!("Starting tlssocket {}", consts::VERSION);
    debug!("Config: {:?}", config);

    let mut settings = config.socket_settings()?;
    if let Some(port) = matches.get_one::<u16>("port") {
        settings = settings.with_default_port(*port);
    }
    if matches.get_flag("insecure") {
        settings.tls.trust_all_certificates = true;
    }
    if matches.get_flag("no-tls") {
        settings.tls.enabled = false;
    }
    if let Some(peer_name) = matches.get_one::<String>("peer-name") {
        settings.tls.peer_name = Some(peer_name.clone());
    }

    let observer = Arc::new(Terminal {
        connected: Event::new(),
        closed: Event::new(),
    });
    let socket = Socket::new(&observer).with_settings(settings);

    let host = matches
        .get_one::<String>("host")
        .context("HOST is required")?;
    socket.connect(host)?;

    tokio::select! {
        _ = observer.connected.clone() => (),
        _ = observer.closed.clone() => anyhow::bail!("Could not connect to {}", host),
        _ = tokio::signal::ctrl_c() => {
            socket.stop();
            return Ok(());
        }
    }

    let mut stdin = tokio::io::stdin();
    let mut buffer = vec![0u8; consts::READ_BUFFER_SIZE];
    let mut stdin_open = true;
    loop {
        tokio::select! {
            _ = observer.closed.clone() => break,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                socket.stop();
                break;
            }
            read = stdin.read(&mut buffer), if stdin_open => match read {
                Ok(0) => {
                    debug!("stdin closed, waiting for the server");
                    stdin_open = false;
                }
                Ok(n) => {
                    if let Err(e) = socket.send(&buffer[..n]) {
                        warn!("Dropping {} bytes from stdin: {}", n, e);
                        break;
                    }
                }
                Err(e) => {
                    warn!("Error reading stdin: {}", e);
                    stdin_open = false;
                }
            },
        }
    }

    Ok(())
}

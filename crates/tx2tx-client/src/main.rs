//! tx2tx client entry point.
//!
//! Connects to the server, verifies injection capability, then runs the
//! receive/inject poll loop: drain server messages, hand them to the
//! session, emit a periodic keepalive, sleep. On connection loss one
//! reconnect cycle is attempted when enabled; otherwise the loop exits.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tx2tx_client::application::session::{ClientSession, NullOverlay};
use tx2tx_client::infrastructure::backend;
use tx2tx_client::infrastructure::network::{server_address_parse, ClientNetwork};
use tx2tx_core::config::Config;
use tx2tx_core::logging::{self, LogLevel};
use tx2tx_core::protocol::messages::Message;

/// tx2tx client: receives forwarded input events and injects them locally.
#[derive(Debug, Parser)]
#[command(name = "tx2tx-client", version)]
struct Args {
    /// Server address as host:port (overrides config).
    server: Option<String>,

    /// Path to the config file (default: search standard locations).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Display name, e.g. ":0" (overrides config).
    #[arg(long)]
    display: Option<String>,

    /// Client name announced to the server (matched against the server's
    /// configured positions).
    #[arg(long)]
    client: Option<String>,

    /// Input backend to use. This build ships `mock`; platform backends
    /// plug in through the display backend contract.
    #[arg(long, default_value = "x11")]
    backend: String,

    /// Log at debug level.
    #[arg(long)]
    debug: bool,
    /// Log at info level.
    #[arg(long)]
    info: bool,
    /// Log at warning level.
    #[arg(long)]
    warning: bool,
    /// Log at error level.
    #[arg(long)]
    error: bool,
    /// Log at critical level.
    #[arg(long)]
    critical: bool,
}

fn level_flags(args: &Args) -> Vec<LogLevel> {
    let mut flags = Vec::new();
    if args.debug {
        flags.push(LogLevel::Debug);
    }
    if args.info {
        flags.push(LogLevel::Info);
    }
    if args.warning {
        flags.push(LogLevel::Warning);
    }
    if args.error {
        flags.push(LogLevel::Error);
    }
    if args.critical {
        flags.push(LogLevel::Critical);
    }
    flags
}

fn logging_init(level: LogLevel, format: &str, file: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_filter().to_string()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let compact = format.eq_ignore_ascii_case("compact");
    let log_file = file.and_then(|path| match std::fs::File::create(path) {
        Ok(f) => Some(f),
        Err(err) => {
            eprintln!("cannot open log file {path}: {err}");
            None
        }
    });
    match log_file {
        Some(f) => {
            let writer = Arc::new(f);
            if compact {
                builder.compact().with_writer(writer).init();
            } else {
                builder.with_writer(writer).init();
            }
        }
        None => {
            if compact {
                builder.compact().init();
            } else {
                builder.init();
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(server) = &args.server {
        config.client.server_address = server.clone();
    }
    if let Some(display) = &args.display {
        config.client.display = Some(display.clone());
    }

    let level = logging::level_resolve(&level_flags(&args), &config.logging.level);
    logging_init(level, &config.logging.format, config.logging.file.as_deref());

    let (host, port) =
        server_address_parse(&config.client.server_address).context("resolving server address")?;

    info!("tx2tx client v{}", env!("CARGO_PKG_VERSION"));
    if let Some(name) = &args.client {
        info!("client name: {name}");
    }
    info!("connecting to {host}:{port}");
    info!("display: {}", config.client.display.as_deref().unwrap_or("$DISPLAY"));

    let (mut display, injector) =
        backend::client_backend_create(&args.backend).context("selecting input backend")?;
    display
        .connection_establish()
        .context("connecting to display backend")?;
    let screen = display
        .screen_geometry()
        .context("querying screen geometry")?;
    info!("screen geometry: {screen}");

    if !injector.injection_ready() {
        display.connection_close();
        anyhow::bail!("input injection not available for the selected backend");
    }
    info!("input injection ready");

    let mut network = ClientNetwork::new(
        &host,
        port,
        config.client.reconnect.clone(),
        config.protocol.buffer_size,
        &config.protocol.version,
        Some(screen),
        args.client.as_deref(),
    );
    network.connect().context("connecting to server")?;

    let mut session = ClientSession::new(display, injector, NullOverlay);

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
                running.store(false, Ordering::Relaxed);
            }
        });
    }

    let keepalive_interval = Duration::from_secs(config.protocol.keepalive_interval.max(1));
    let mut last_keepalive = Instant::now();

    while running.load(Ordering::Relaxed) {
        match network.receive() {
            Ok(messages) => {
                for message in messages {
                    session.server_message_handle(message);
                }
            }
            Err(err) => {
                error!("connection error: {err}");
                if !config.client.reconnect.enabled {
                    break;
                }
                if network.reconnect() {
                    info!("reconnected successfully");
                    continue;
                }
                error!("reconnection failed, exiting");
                break;
            }
        }

        if last_keepalive.elapsed() >= keepalive_interval {
            if let Err(err) = network.message_send(&Message::keepalive()) {
                error!("keepalive failed: {err}");
            }
            last_keepalive = Instant::now();
        }

        session.overlay_poll();
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    network.connection_close();
    session.shutdown();
    info!("tx2tx client stopped");
    Ok(())
}

//! tx2tx server entry point.
//!
//! Wires configuration, logging, the platform backend, the TCP listener,
//! and the context engine together, then runs the cooperative poll loop:
//! accept, drain peers, tick the engine, sleep. Ctrl-C flips a shutdown
//! flag from a background task (the loop itself never blocks).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tx2tx_core::config::Config;
use tx2tx_core::logging::{self, LogLevel};
use tx2tx_server::application::context_engine::{
    panic_key_parse, ContextEngine, EngineConfig,
};
use tx2tx_server::application::jump_hotkey::JumpHotkey;
use tx2tx_server::infrastructure::backend;
use tx2tx_server::infrastructure::network::ServerNetwork;

/// tx2tx server: captures local input and routes it to remote clients.
#[derive(Debug, Parser)]
#[command(name = "tx2tx-server", version)]
struct Args {
    /// Path to the config file (default: search standard locations).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host address to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config).
    #[arg(long)]
    port: Option<u16>,

    /// Near-edge telemetry band in pixels (overrides config).
    #[arg(long)]
    edge_threshold: Option<i32>,

    /// Minimum pointer velocity in px/s to cross a boundary (overrides config).
    #[arg(long)]
    velocity_threshold: Option<f64>,

    /// Display name, e.g. ":0" (overrides config).
    #[arg(long)]
    display: Option<String>,

    /// Input backend to use. This build ships `mock`; platform backends
    /// plug in through the display backend contract.
    #[arg(long, default_value = "x11")]
    backend: String,

    /// Server name for logging (overrides config).
    #[arg(long)]
    name: Option<String>,

    /// Shut down when a connected client disconnects.
    #[arg(long)]
    die_on_disconnect: bool,

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
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(edge_threshold) = args.edge_threshold {
        config.server.edge_threshold = edge_threshold;
    }
    if let Some(velocity_threshold) = args.velocity_threshold {
        config.server.velocity_threshold = velocity_threshold;
    }
    if let Some(display) = &args.display {
        config.server.display = Some(display.clone());
    }
    if let Some(name) = &args.name {
        config.server.name = name.clone();
    }

    let level = logging::level_resolve(&level_flags(&args), &config.logging.level);
    logging_init(level, &config.logging.format, config.logging.file.as_deref());

    info!("tx2tx server v{}", env!("CARGO_PKG_VERSION"));
    info!("server name: {}", config.server.name);
    info!("listening on {}:{}", config.server.host, config.server.port);
    info!("edge threshold: {} pixels", config.server.edge_threshold);
    info!(
        "velocity threshold: {} px/s (edge resistance)",
        config.server.velocity_threshold
    );
    info!("display: {}", config.server.display.as_deref().unwrap_or("$DISPLAY"));
    info!("max clients: {}", config.server.max_clients);
    if config.clients.is_empty() {
        warn!("no clients configured");
    } else {
        info!("configured clients: {}", config.clients.len());
        for client in &config.clients {
            info!("  - {} (position: {})", client.name, client.position);
        }
    }

    let (panic_keysyms, panic_modifier_mask) = panic_key_parse(&config.server.panic_key);

    let (mut display, capturer) =
        backend::server_backend_create(&args.backend).context("selecting input backend")?;
    display
        .connection_establish()
        .context("connecting to display backend")?;
    let screen = display
        .screen_geometry()
        .context("querying screen geometry")?;
    info!("screen geometry: {screen}");

    let mut network = ServerNetwork::new(
        &config.server.host,
        config.server.port,
        config.server.max_clients,
        config.protocol.buffer_size,
        &config.protocol.version,
    );
    network.start().context("starting server network")?;

    let engine_config = EngineConfig {
        velocity_threshold: config.server.velocity_threshold,
        edge_threshold: config.server.edge_threshold,
        context_to_client: config.context_to_client_map(),
        panic_keysyms,
        panic_modifier_mask,
        jump_hotkey: JumpHotkey::from_config(&config.server.jump_hotkey),
    };
    let mut engine = ContextEngine::new(display, capturer, screen, engine_config);

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

    let poll_delay = Duration::from_millis(config.server.poll_interval_ms.max(5));
    info!("server running, press Ctrl-C to stop");

    while running.load(Ordering::Relaxed) {
        network.connections_accept();
        let clients_before = network.client_count();
        network.client_data_receive();

        if args.die_on_disconnect && network.client_count() < clients_before {
            warn!("[NETWORK] client disconnected and --die-on-disconnect is set, shutting down");
            break;
        }

        if network.client_count() > 0 {
            engine.tick(&mut network, Instant::now());
        }

        tokio::time::sleep(poll_delay).await;
    }

    network.shutdown();
    engine.shutdown();
    info!("tx2tx server stopped");
    Ok(())
}

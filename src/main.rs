use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use futures::{stream::FuturesUnordered, StreamExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use usb_netmode::config::ConfigStore;
use usb_netmode::state::AppState;
use usb_netmode::usb_mode::{FileModeStore, UsbModeRegistry};
use usb_netmode::utils::{bind_tcp_listeners, resolve_bind_addresses};
use usb_netmode::web;

/// Log level for the application
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Verbose,
    Debug,
    Trace,
}

/// usb-netmode command line arguments
#[derive(Parser, Debug)]
#[command(name = "usb-netmode")]
#[command(version, about = "USB gadget network mode service", long_about = None)]
struct CliArgs {
    /// Listen address (overrides database config)
    #[arg(short = 'a', long, value_name = "ADDRESS")]
    address: Option<String>,

    /// HTTP port (overrides database config)
    #[arg(short = 'p', long, value_name = "PORT")]
    http_port: Option<u16>,

    /// Data directory path (default: /mnt/data)
    #[arg(short = 'd', long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Permanent mode file (overrides database config)
    #[arg(long, value_name = "FILE")]
    mode_file: Option<PathBuf>,

    /// Temporary mode file (overrides database config)
    #[arg(long, value_name = "FILE")]
    temp_mode_file: Option<PathBuf>,

    /// Log level (error, warn, info, verbose, debug, trace)
    #[arg(short = 'l', long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Increase verbosity (-v for verbose, -vv for debug, -vvv for trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    init_logging(args.log_level, args.verbose, args.log_json);

    tracing::info!("Starting usb-netmode v{}", env!("CARGO_PKG_VERSION"));

    // Determine data directory (CLI arg takes precedence)
    let data_dir = args.data_dir.unwrap_or_else(get_data_dir);
    tracing::info!("Data directory: {}", data_dir.display());

    tokio::fs::create_dir_all(&data_dir).await?;

    // Initialize configuration store; record paths are settled under the data dir
    let config_store = ConfigStore::open_in(&data_dir).await?;
    let mut config = (*config_store.get()).clone();

    // Apply CLI argument overrides to config (only if explicitly specified)
    if let Some(addr) = args.address {
        config.web.bind_address = addr.clone();
        config.web.bind_addresses = vec![addr];
    }
    if let Some(port) = args.http_port {
        config.web.http_port = port;
    }
    if let Some(path) = args.mode_file {
        config.usb.mode_file = path.to_string_lossy().to_string();
    }
    if let Some(path) = args.temp_mode_file {
        config.usb.temp_mode_file = path.to_string_lossy().to_string();
    }
    config.usb.normalize(&data_dir);

    let bind_ips = resolve_bind_addresses(&config.web)?;
    for ip in &bind_ips {
        let addr = SocketAddr::new(*ip, config.web.http_port);
        tracing::info!("Server will listen on: http://{}", addr);
    }

    // Mode records
    let mode_store = FileModeStore::new(
        config.usb.mode_file_path(),
        config.usb.temp_mode_file_path(),
    );
    tracing::info!(
        "USB mode records: permanent={}, temporary={}",
        config.usb.mode_file,
        config.usb.temp_mode_file
    );
    let registry = Arc::new(UsbModeRegistry::new(Arc::new(mode_store)));
    let status = registry.status();
    tracing::info!(
        "Effective USB mode: {} ({}){}",
        status.mode_name(),
        status.mode_value(),
        if status.is_temporary {
            ", temporary override active"
        } else {
            ""
        }
    );

    let state = AppState::new(config_store, registry, data_dir);
    let app = web::create_router(state);

    let listeners = bind_tcp_listeners(&bind_ips, config.web.http_port)?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    };

    let mut servers = FuturesUnordered::new();
    for listener in listeners {
        let local_addr = listener.local_addr()?;
        tracing::info!("Starting HTTP server on {}", local_addr);

        let listener = tokio::net::TcpListener::from_std(listener)?;
        let server = axum::serve(listener, app.clone());
        servers.push(async move { server.await });
    }

    tokio::select! {
        _ = shutdown_signal => {}
        result = servers.next() => {
            if let Some(Err(e)) = result {
                tracing::error!("HTTP server error: {}", e);
            }
        }
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initialize logging with tracing
fn init_logging(level: LogLevel, verbose_count: u8, json: bool) {
    // Verbose count overrides log level
    let effective_level = match verbose_count {
        0 => level,
        1 => LogLevel::Verbose,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };

    let filter = match effective_level {
        LogLevel::Error => "usb_netmode=error,tower_http=error",
        LogLevel::Warn => "usb_netmode=warn,tower_http=warn",
        LogLevel::Info => "usb_netmode=info,tower_http=info",
        LogLevel::Verbose => "usb_netmode=debug,tower_http=info",
        LogLevel::Debug => "usb_netmode=debug,tower_http=debug",
        LogLevel::Trace => "usb_netmode=trace,tower_http=debug",
    };

    // Environment variable takes highest priority
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
    {
        eprintln!("failed to initialize tracing: {}", err);
    }
}

/// Get the application data directory
fn get_data_dir() -> PathBuf {
    // Check environment variable first
    if let Ok(path) = std::env::var("USB_NETMODE_DATA_DIR") {
        return PathBuf::from(path);
    }

    // Same directory the gadget boot script reads the mode files from
    PathBuf::from("/mnt/data")
}

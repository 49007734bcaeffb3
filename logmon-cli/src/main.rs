mod bus;
mod commands;
mod export;
mod logging;
mod tui;
mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use logmon_core::buffer::BoundedBuffer;
use logmon_core::config::{ConfigError, MonitorConfig};
use logmon_core::subscriber::Subscriber;

use bus::{DemoBus, RedisBus};

#[derive(Parser)]
#[command(name = "logmon")]
#[command(about = "Live terminal viewer for logs published over Redis pub/sub", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: discover logmon.yml upwards from the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Redis URL, overrides the config file
    #[arg(long, env = "REDIS_URL", global = true)]
    redis_url: Option<String>,

    /// Only show the backend source
    #[arg(short = 'b', long, conflicts_with = "batch_only")]
    backend_only: bool,

    /// Only show the batch source
    #[arg(short = 'w', long)]
    batch_only: bool,

    /// Buffer capacity in lines
    #[arg(short = 'm', long)]
    max_lines: Option<usize>,

    #[arg(long)]
    refresh_rate_ms: Option<u64>,

    /// Seconds between reconnect attempts
    #[arg(long)]
    reconnect_secs: Option<u64>,

    /// Generate synthetic logs instead of connecting to Redis
    #[arg(long)]
    demo: bool,

    /// Write diagnostic logs to this file (or set LOGMON_LOG_FILE)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default logmon.yml in the current directory
    Init {
        #[arg(short, long)]
        yes: bool,
    },
    /// Check config, Redis reachability and clipboard support
    Doctor,
}

/// Discover or load the config, then apply command-line overrides
fn load_config(cli: &Cli) -> Result<(Option<PathBuf>, MonitorConfig), ConfigError> {
    let (path, mut config) = match &cli.config {
        Some(path) => (Some(path.clone()), MonitorConfig::load(path)?),
        None => MonitorConfig::discover_or_default(&std::env::current_dir()?)?,
    };

    if let Some(url) = &cli.redis_url {
        config.redis_url = url.clone();
    }
    if let Some(max_lines) = cli.max_lines {
        config.max_lines = max_lines;
    }
    if let Some(ms) = cli.refresh_rate_ms {
        config.refresh_rate_ms = ms;
    }
    if let Some(secs) = cli.reconnect_secs {
        config.reconnect_interval_ms = secs.saturating_mul(1000);
    }
    if cli.backend_only {
        config.retain_sources(&["backend", "ray"]);
    } else if cli.batch_only {
        config.retain_sources(&["batch", "ray"]);
    }

    config.validate()?;
    Ok((path, config))
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();

    // Handle subcommands
    match &cli.command {
        Some(Commands::Init { yes }) => match commands::run_init(*yes) {
            Ok(()) => return Ok(()),
            Err(e) => fail(e),
        },
        Some(Commands::Doctor) => match commands::run_doctor(load_config(&cli)).await {
            Ok(()) => return Ok(()),
            Err(e) => fail(e),
        },
        None => {
            // Fall through to TUI
        }
    }

    let log_path = match logging::init(cli.log_file.as_deref()) {
        Ok(path) => path,
        Err(e) => fail(format!("cannot open log file: {}", e)),
    };

    let (config_path, config) = match load_config(&cli) {
        Ok(loaded) => loaded,
        Err(e) => fail(e),
    };
    info!(
        config = ?config_path,
        log_file = ?log_path,
        sources = config.sources.len(),
        max_lines = config.max_lines,
        "starting"
    );

    let buffer = Arc::new(BoundedBuffer::new(config.max_lines));
    let settings = config.subscriber_settings();

    let subscriber = if cli.demo {
        let bus = DemoBus::new(config.channel_prefix.clone());
        Subscriber::new(bus, &config.sources, buffer.clone(), settings).spawn()
    } else {
        let bus = match RedisBus::open(&config.redis_url) {
            Ok(bus) => bus,
            Err(e) => fail(e),
        };
        match bus.resolve_endpoint().await {
            Ok(addr) => info!(url = %config.redis_url, %addr, "redis endpoint resolved"),
            Err(e) => fail(e),
        }
        Subscriber::new(bus, &config.sources, buffer.clone(), settings).spawn()
    };

    let refresh_rate = config.refresh_rate();
    tui::run(buffer, config.sources, subscriber, refresh_rate).await
}

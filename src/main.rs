use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ecgmon::access::FsDirectoryAccess;
use ecgmon::config::Config;
use ecgmon::format;
use ecgmon::inference::HttpInferenceClient;
use ecgmon::monitor::{Monitor, MonitorState};

#[derive(Parser)]
#[command(
    name = "ecgmon",
    version,
    about = "Upload ECG recordings to an emotion inference server"
)]
struct Cli {
    /// Directory containing ECG CSV files
    path: Option<PathBuf>,

    /// Launch interactive TUI
    #[arg(long)]
    tui: bool,

    /// Output as JSON instead of a text report
    #[arg(long)]
    json: bool,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Inference server base URL (e.g. http://192.168.10.157:8000)
    #[arg(long, env = "ECGMON_SERVER_URL")]
    server: Option<String>,

    /// API key forwarded to the server for song recommendations
    #[arg(long, env = "ECGMON_API_KEY")]
    api_key: Option<String>,

    /// Ignore recommended songs returned by the server
    #[arg(long)]
    no_media: bool,

    /// Request timeout in seconds (default: transport default)
    #[arg(long)]
    timeout: Option<u64>,

    /// Write logs to this file (TUI mode logs nowhere otherwise)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_logging(log_file: Option<&Path>, tui: bool) -> Result<()> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ecgmon=info"))
    };
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None if !tui => {
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .init();
        }
        None => {}
    }
    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match cli.config {
        Some(ref path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(ref server) = cli.server {
        config.server_url = server.clone();
    }
    if let Some(ref key) = cli.api_key {
        config.api_key = Some(key.clone());
    }
    if cli.no_media {
        config.enable_media_recommendations = false;
    }
    if cli.timeout.is_some() {
        config.request_timeout_secs = cli.timeout;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.json && cli.tui {
        anyhow::bail!("--json and --tui cannot be used together");
    }

    init_logging(cli.log_file.as_deref(), cli.tui)?;

    let config = resolve_config(&cli)?;
    let client = HttpInferenceClient::new(&config).context("Failed to build HTTP client")?;
    info!(endpoint = %client.endpoint(), media = config.enable_media_recommendations, "configured");
    let monitor = Monitor::new(Arc::new(client), config.api_key.clone());

    if cli.tui {
        return ecgmon::tui::run(
            cli.path,
            monitor,
            &FsDirectoryAccess,
            config.enable_media_recommendations,
        );
    }

    let path = cli
        .path
        .as_deref()
        .context("A directory is required unless --tui is given")?;

    let mut state = MonitorState::new();
    let (handle, token) = match state.grant(&FsDirectoryAccess, Some(path)) {
        Some(granted) => granted,
        None => anyhow::bail!(
            "{}",
            state.error().unwrap_or("Permission to access directory was denied")
        ),
    };

    let start = Instant::now();
    monitor.scan_blocking(&handle, &token, &mut state);
    let elapsed = start.elapsed();

    if cli.json {
        println!("{}", format::format_json(&state));
    } else {
        println!("{}", format::format_report(&state));
    }

    eprintln!(
        "Processed {} files ({} failed) in {:.2}s",
        state.processed_count(),
        state.failed_count(),
        elapsed.as_secs_f64(),
    );

    Ok(())
}

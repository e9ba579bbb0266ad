//! ipfs-dl - fetch numbered JSON resources from an IPFS gateway.
//!
//! `serve` exposes the REST API, `fetch` runs one range in the foreground and
//! prints its records as NDJSON on stdout, `archive` writes the storage area out
//! as a ZIP file.

use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ipfs_dl::stream::encode_line;
use ipfs_dl::types::PartialDownloadRequest;
use ipfs_dl::{Config, DownloadRequest, RangeDownloader, RunEvent};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ipfs-dl")]
#[command(about = "Sequential range downloader for IPFS gateway JSON resources")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true, env = "IPFS_DL_CONFIG")]
    config: Option<PathBuf>,

    /// Gateway base URL resource names are appended to
    #[arg(long, global = true, env = "IPFS_DL_GATEWAY_URL")]
    gateway_url: Option<String>,

    /// Directory accumulating fetched files
    #[arg(long, global = true, env = "IPFS_DL_DOWNLOAD_DIR")]
    download_dir: Option<PathBuf>,

    /// Per-request timeout in milliseconds
    #[arg(long, global = true, env = "IPFS_DL_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the REST API until interrupted
    Serve {
        /// Address to listen on (overrides the config file)
        #[arg(long, env = "IPFS_DL_BIND")]
        bind: Option<SocketAddr>,
    },

    /// Download a range in the foreground, printing one JSON line per item
    Fetch {
        /// First identifier
        #[arg(long)]
        start: Option<u64>,
        /// Last identifier, inclusive
        #[arg(long)]
        end: Option<u64>,
        /// Pause between items in milliseconds
        #[arg(long)]
        delay: Option<u64>,
    },

    /// Write every stored JSON file into one ZIP archive
    Archive {
        /// Output file (default: the configured archive name in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    let default_filter = if is_verbose() {
        "ipfs_dl=debug"
    } else {
        "ipfs_dl=info"
    };

    // stdout carries NDJSON for `fetch`, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if cli.verbose {
        tracing::debug!("verbose logging enabled");
    }
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Serve { bind } => serve(config, bind).await,
        Commands::Fetch { start, end, delay } => {
            let partial = PartialDownloadRequest {
                start,
                end,
                delay_ms: delay,
            };
            fetch(config, partial).await
        }
        Commands::Archive { output } => archive(config, output).await,
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(url) = &cli.gateway_url {
        config.gateway.base_url = url.clone();
    }
    if let Some(dir) = &cli.download_dir {
        config.storage.download_dir = dir.clone();
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.gateway.timeout = std::time::Duration::from_millis(timeout_ms);
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn serve(mut config: Config, bind: Option<SocketAddr>) -> anyhow::Result<()> {
    if let Some(bind) = bind {
        config.server.api.bind_address = bind;
    }

    let downloader = Arc::new(RangeDownloader::new(config)?);
    let config = downloader.get_config();
    ipfs_dl::api::start_api_server(downloader, config).await?;
    Ok(())
}

async fn fetch(config: Config, partial: PartialDownloadRequest) -> anyhow::Result<()> {
    let request = DownloadRequest::from_partial(partial, &config.defaults);
    let downloader = Arc::new(RangeDownloader::new(config)?);
    let mut run = downloader.start(request).await?;

    let shutdown = ipfs_dl::shutdown_signal();
    tokio::pin!(shutdown);

    let mut stdout = std::io::stdout().lock();
    loop {
        let event = tokio::select! {
            _ = &mut shutdown => {
                run.cancel();
                anyhow::bail!("interrupted");
            }
            event = run.next_event() => event,
        };

        match event {
            Some(RunEvent::Progress(record)) => {
                stdout.write_all(&encode_line(&record)?)?;
                stdout.flush()?;
            }
            Some(RunEvent::Complete(summary)) => {
                stdout.write_all(&encode_line(&summary)?)?;
                return Ok(());
            }
            Some(RunEvent::Failed(e)) => return Err(e).context("range download aborted"),
            None => anyhow::bail!("range download ended without a summary"),
        }
    }
}

async fn archive(config: Config, output: Option<PathBuf>) -> anyhow::Result<()> {
    let output = output.unwrap_or_else(|| PathBuf::from(&config.storage.archive_name));
    let downloader = RangeDownloader::new(config)?;

    let bytes = downloader.build_archive().await?;
    tokio::fs::write(&output, &bytes)
        .await
        .with_context(|| format!("writing archive to {}", output.display()))?;

    tracing::info!(path = %output.display(), bytes = bytes.len(), "archive written");
    Ok(())
}

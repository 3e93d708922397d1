use anyhow::{Context, Result};
use chirp_config::ChirpConfig;
use chirp_feed::Feed;
use chirp_server::{Mode, Server};
use clap::Parser;
use std::io::{self, BufReader, BufWriter};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Reads JSON requests from stdin and writes one JSON reply per line to stdout.
#[derive(Debug, Parser)]
#[command(name = "chirp", version)]
struct Cli {
    /// Consumer threads. Omit to process requests sequentially.
    consumers: Option<NonZeroUsize>,

    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // stdout carries replies, so logs go to stderr.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_thread_names(true)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ChirpConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ChirpConfig::default(),
    };
    init_tracing(&config.log_level);

    let mode = Mode::from_consumers(cli.consumers.or(config.consumers));
    let feed = Feed::new(config.max_readers).context("creating feed")?;
    let server = Server::new(feed, mode);
    tracing::debug!(
        mode = %server.mode(),
        max_readers = server.feed().max_readers(),
        "configured"
    );

    let input = BufReader::new(io::stdin());
    let output = BufWriter::new(io::stdout());
    let summary = server.run(input, output).context("running server")?;

    tracing::debug!(?summary, "exiting");
    Ok(())
}

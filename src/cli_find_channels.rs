//! Finds the YouTube channels for a list of artist names and writes them to
//! a YAML channel list.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod discovery;

use discovery::{load_artists, write_channels_file, ChannelFinder};

const SEARCH_DELAY: Duration = Duration::from_millis(500);

#[derive(Parser, Debug)]
struct CliArgs {
    /// File with one artist name per line. Blank lines and `#` comments are
    /// skipped.
    pub artists_file: PathBuf,

    /// Where to write the discovered channel list.
    #[clap(long, default_value = "channels.yml")]
    pub output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let Ok(api_key) = std::env::var("YOUTUBE_API_KEY") else {
        bail!("YOUTUBE_API_KEY must be set");
    };

    let artists = load_artists(&cli_args.artists_file)?;
    if artists.is_empty() {
        bail!("No artists found in {:?}", cli_args.artists_file);
    }
    info!("Looking up channels for {} artist(s)", artists.len());

    let finder = ChannelFinder::new(api_key);
    let mut channels = Vec::new();

    for artist in &artists {
        match finder.find_best_channel(artist).await {
            Ok(Some(channel)) => channels.push((channel.url(), channel.title)),
            Ok(None) => {}
            Err(e) => warn!(artist = %artist, error = %e, "Channel lookup failed"),
        }
        tokio::time::sleep(SEARCH_DELAY).await;
    }

    if channels.is_empty() {
        bail!("No channels found for any artist");
    }

    write_channels_file(&cli_args.output, &channels)
        .context("Failed to write the channel list")?;

    Ok(())
}

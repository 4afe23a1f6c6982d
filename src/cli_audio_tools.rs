//! Downloads and transcribes audio for videos the analysis flagged as
//! emotionally resonant sega.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod audio;
mod config;
mod model;
mod popularity;
mod sink;

use config::{AppConfig, CliConfig, FileConfig};
use sink::SupabaseSink;

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the TOML configuration file.
    #[clap(value_parser = parse_path)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download audio for every stored video with an emotional sentiment
    /// flag and a confirmed sega genre.
    Download,

    /// Transcribe downloaded audio files that have no transcript yet.
    Transcribe,
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

    let file_config = FileConfig::load(&cli_args.config)?;
    let config = AppConfig::resolve(&CliConfig::default(), Some(file_config))?;

    let cancellation_token = CancellationToken::new();
    let signal_token = cancellation_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received ctrl-c, finishing up");
            signal_token.cancel();
        }
    });

    match cli_args.command {
        Command::Download => {
            let sink = Arc::new(SupabaseSink::new(
                config.credentials.supabase_url.clone(),
                config.credentials.supabase_key.clone(),
            ));
            let report = audio::download_run(sink.as_ref(), &config.audio, &cancellation_token)
                .await
                .context("Download run failed")?;
            if report.rate_limited {
                info!("Stopped early due to rate limiting, try again later");
            }
        }
        Command::Transcribe => {
            audio::transcribe_run(&config.audio, &cancellation_token)
                .await
                .context("Transcription run failed")?;
        }
    }

    Ok(())
}

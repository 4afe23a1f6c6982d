use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod classifier;
mod collector;
mod config;
mod matcher;
mod merge;
mod model;
mod pipeline;
mod popularity;
mod sink;
mod table;

use classifier::GeminiClassifier;
use collector::YoutubeCollector;
use config::{AppConfig, CliConfig, FileConfig};
use matcher::{DeezerMatcher, SpotifyMatcher, StreamingMatcher};
use pipeline::PipelineContext;
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

    /// Directory for analysis dumps, overridden by `out_dir` in the config
    /// file when both are set.
    #[clap(long, value_parser = parse_path)]
    pub out_dir: Option<PathBuf>,
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
    let cli_config = CliConfig {
        out_dir: cli_args.out_dir,
    };
    let config = AppConfig::resolve(&cli_config, Some(file_config))?;

    let cancellation_token = CancellationToken::new();
    let signal_token = cancellation_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received ctrl-c, finishing up");
            signal_token.cancel();
        }
    });

    let collector = Arc::new(YoutubeCollector::new(
        config.credentials.youtube_api_key.clone(),
        config.collector.clone(),
    ));
    let classifier = Arc::new(GeminiClassifier::new(
        config.credentials.gemini_api_key.clone(),
        config.classifier.clone(),
    ));

    let spotify: Option<Arc<dyn StreamingMatcher>> = match &config.credentials.spotify {
        Some(credentials) => {
            match SpotifyMatcher::connect(credentials, config.matchers.clone()).await {
                Ok(matcher) => Some(Arc::new(matcher)),
                Err(e) => {
                    warn!(error = %e, "Spotify authentication failed, running without it");
                    None
                }
            }
        }
        None => None,
    };
    let deezer = Arc::new(DeezerMatcher::new(config.matchers.clone()));

    let sink = Arc::new(SupabaseSink::new(
        config.credentials.supabase_url.clone(),
        config.credentials.supabase_key.clone(),
    ));

    let ctx = PipelineContext {
        config,
        collector,
        classifier,
        spotify,
        deezer,
        sink,
        cancellation_token,
    };

    let merged = pipeline::run(&ctx).await.context("Pipeline run failed")?;
    info!("Run complete: {} videos analyzed", merged.len());

    Ok(())
}

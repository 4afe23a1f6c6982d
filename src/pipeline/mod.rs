//! End-to-end pipeline orchestration.
//!
//! One run walks the stages in order: collect, then classification and
//! multiplatform popularity concurrently, then merge, report and persist.
//! The two concurrent branches never share mutable state; each produces
//! records keyed by `video_id` and the merge joins them afterwards.

use crate::classifier::Classifier;
use crate::collector::Collector;
use crate::config::{AppConfig, ClassifierSettings};
use crate::matcher::{run_matcher, StreamingMatcher};
use crate::merge::merge_records;
use crate::model::{ClassificationRecord, MergedRecord, PlatformMatch, VideoRecord};
use crate::popularity::build_popularity_records;
use crate::sink::AnalysisSink;
use crate::table::render_summary;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Everything a pipeline run needs, wired up by the binary.
pub struct PipelineContext {
    pub config: AppConfig,
    pub collector: Arc<dyn Collector>,
    pub classifier: Arc<dyn Classifier>,
    /// Absent when no Spotify credentials were configured.
    pub spotify: Option<Arc<dyn StreamingMatcher>>,
    pub deezer: Arc<dyn StreamingMatcher>,
    pub sink: Arc<dyn AnalysisSink>,
    pub cancellation_token: CancellationToken,
}

/// Run the full pipeline once. Returns the merged rows so callers can
/// inspect what was persisted.
pub async fn run(ctx: &PipelineContext) -> Result<Vec<MergedRecord>> {
    info!(
        "Step 1: collecting videos from {} channel(s)",
        ctx.config.channel_ids.len()
    );
    let videos = ctx
        .collector
        .collect(&ctx.config.channel_ids, &ctx.cancellation_token)
        .await
        .context("Video collection failed")?;
    info!("Collected {} videos", videos.len());

    if videos.is_empty() {
        info!("Nothing to analyze");
        return Ok(Vec::new());
    }

    std::fs::create_dir_all(&ctx.config.out_dir).with_context(|| {
        format!("Failed to create output directory {:?}", ctx.config.out_dir)
    })?;

    info!("Step 2: running classification and popularity analysis concurrently");
    let (classifications, popularity) = tokio::join!(
        classify_all(
            ctx.classifier.as_ref(),
            &videos,
            &ctx.config.classifier,
            &ctx.cancellation_token,
        ),
        multiplatform_analysis(ctx, &videos),
    );

    info!("Step 3: merging {} videos with analysis results", videos.len());
    let merged = merge_records(&videos, &classifications, &popularity);

    info!("Step 4: final analysis summary\n{}", render_summary(&merged));

    info!("Step 5: persisting {} rows", merged.len());
    let inserted = ctx
        .sink
        .insert_batch(&merged)
        .await
        .context("Failed to persist analysis rows")?;
    info!("Persisted {} of {} rows", inserted, merged.len());

    Ok(merged)
}

/// Classify every video, substituting the fallback record on failure so the
/// output always lines up one-to-one with the input.
async fn classify_all(
    classifier: &dyn Classifier,
    videos: &[VideoRecord],
    settings: &ClassifierSettings,
    cancel: &CancellationToken,
) -> Vec<ClassificationRecord> {
    info!(
        "Classifying {} videos with {}",
        videos.len(),
        classifier.model()
    );
    let mut records = Vec::with_capacity(videos.len());

    for video in videos {
        if cancel.is_cancelled() {
            info!("Classification cancelled, filling remaining videos with fallbacks");
            records.extend(
                videos[records.len()..]
                    .iter()
                    .map(|v| ClassificationRecord::fallback(&v.video_id)),
            );
            break;
        }

        match classifier.classify(video).await {
            Ok(record) => {
                info!(
                    video_id = %video.video_id,
                    sega_genre = %record.sega_genre,
                    sentiment_flag = record.sentiment_flag,
                    "Classified video"
                );
                records.push(record);
            }
            Err(e) => {
                warn!(
                    video_id = %video.video_id,
                    error = %e,
                    "Classification failed, using fallback record"
                );
                records.push(ClassificationRecord::fallback(&video.video_id));
            }
        }

        tokio::time::sleep(Duration::from_secs(settings.delay_secs)).await;
    }

    records
}

/// Run both streaming matchers concurrently, then derive normalized
/// popularity from their combined signals.
async fn multiplatform_analysis(
    ctx: &PipelineContext,
    videos: &[VideoRecord],
) -> Vec<crate::model::PopularityRecord> {
    let out_dir = ctx.config.out_dir.as_path();

    let spotify_fut = async {
        match &ctx.spotify {
            Some(matcher) => {
                run_matcher(
                    matcher.as_ref(),
                    videos,
                    &ctx.config.matchers,
                    Some(out_dir),
                    &ctx.cancellation_token,
                )
                .await
            }
            None => {
                info!("Spotify credentials not configured, skipping Spotify analysis");
                Vec::<PlatformMatch>::new()
            }
        }
    };

    let deezer_fut = run_matcher(
        ctx.deezer.as_ref(),
        videos,
        &ctx.config.matchers,
        Some(out_dir),
        &ctx.cancellation_token,
    );

    let (spotify_matches, deezer_matches) = tokio::join!(spotify_fut, deezer_fut);

    build_popularity_records(
        videos,
        &spotify_matches,
        &deezer_matches,
        ctx.config.popularity.threshold,
    )
}

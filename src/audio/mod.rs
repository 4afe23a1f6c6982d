//! Audio download and transcription for flagged videos.
//!
//! Both steps shell out: `yt-dlp` for audio extraction and the `whisper`
//! CLI for transcription. Downloads are capped per run and back off hard on
//! rate limiting, since YouTube blocks the IP for hours once it starts
//! returning 429s.

use crate::config::AudioSettings;
use crate::sink::AnalysisSink;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const AUDIO_EXTENSIONS: [&str; 6] = ["mp3", "wav", "m4a", "flac", "ogg", "webm"];

/// Outcome of a download run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// True when the run stopped early because of rate limiting.
    pub rate_limited: bool,
}

/// Download audio for every stored video that qualifies, up to the per-run
/// cap. Already-downloaded videos are skipped, so repeated runs converge.
pub async fn download_run(
    sink: &dyn AnalysisSink,
    settings: &AudioSettings,
    cancel: &CancellationToken,
) -> Result<DownloadReport> {
    let targets = sink
        .fetch_download_targets()
        .await
        .context("Failed to fetch download targets")?;
    info!("{} video(s) qualify for audio download", targets.len());

    std::fs::create_dir_all(&settings.audio_dir)
        .with_context(|| format!("Failed to create audio directory {:?}", settings.audio_dir))?;

    let mut report = DownloadReport::default();

    for video_id in targets {
        if cancel.is_cancelled() {
            info!("Download run cancelled");
            break;
        }
        if report.downloaded >= settings.max_downloads_per_run as usize {
            info!(
                "Reached per-run cap of {} downloads",
                settings.max_downloads_per_run
            );
            break;
        }

        if existing_audio_file(&settings.audio_dir, &video_id).is_some() {
            report.skipped += 1;
            continue;
        }

        info!(video_id = %video_id, "Downloading audio");
        let output = Command::new(&settings.ytdlp_path)
            .arg("-x")
            .arg("--audio-format")
            .arg("mp3")
            .arg("-o")
            .arg(settings.audio_dir.join("%(id)s.%(ext)s"))
            .arg(format!("https://www.youtube.com/watch?v={}", video_id))
            .output()
            .await
            .with_context(|| format!("Failed to spawn {}", settings.ytdlp_path))?;

        if output.status.success() {
            report.downloaded += 1;
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_rate_limited(&stderr) {
                warn!("Rate limited by YouTube, stopping the download run");
                report.rate_limited = true;
                break;
            }
            warn!(video_id = %video_id, stderr = %stderr.trim(), "Download failed");
            report.failed += 1;
        }

        tokio::time::sleep(Duration::from_secs(settings.delay_secs)).await;
    }

    info!(
        "Download run finished: {} downloaded, {} skipped, {} failed",
        report.downloaded, report.skipped, report.failed
    );
    Ok(report)
}

/// Outcome of a transcription run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TranscribeReport {
    pub transcribed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Transcribe every downloaded audio file that has no transcript yet.
pub async fn transcribe_run(
    settings: &AudioSettings,
    cancel: &CancellationToken,
) -> Result<TranscribeReport> {
    std::fs::create_dir_all(&settings.transcript_dir).with_context(|| {
        format!(
            "Failed to create transcript directory {:?}",
            settings.transcript_dir
        )
    })?;

    let audio_files = list_audio_files(&settings.audio_dir)?;
    info!("{} audio file(s) found", audio_files.len());

    let mut report = TranscribeReport::default();

    for audio_file in audio_files {
        if cancel.is_cancelled() {
            info!("Transcription run cancelled");
            break;
        }

        if transcript_exists(&settings.transcript_dir, &audio_file) {
            report.skipped += 1;
            continue;
        }

        info!(file = ?audio_file, "Transcribing");
        let output = Command::new(&settings.whisper_path)
            .arg(&audio_file)
            .arg("--model")
            .arg(&settings.whisper_model)
            .arg("--output_format")
            .arg("txt")
            .arg("--output_dir")
            .arg(&settings.transcript_dir)
            .output()
            .await
            .with_context(|| format!("Failed to spawn {}", settings.whisper_path))?;

        if output.status.success() {
            report.transcribed += 1;
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(file = ?audio_file, stderr = %stderr.trim(), "Transcription failed");
            report.failed += 1;
        }
    }

    info!(
        "Transcription run finished: {} transcribed, {} skipped, {} failed",
        report.transcribed, report.skipped, report.failed
    );
    Ok(report)
}

fn is_audio_extension(ext: &str) -> bool {
    AUDIO_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(ext))
}

/// Any already-downloaded audio file for this video, regardless of format.
fn existing_audio_file(dir: &Path, video_id: &str) -> Option<PathBuf> {
    AUDIO_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", video_id, ext)))
        .find(|path| path.exists())
}

fn list_audio_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read audio directory {:?}", dir))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(is_audio_extension)
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

fn transcript_exists(transcript_dir: &Path, audio_file: &Path) -> bool {
    match audio_file.file_stem() {
        Some(stem) => transcript_dir
            .join(format!("{}.txt", stem.to_string_lossy()))
            .exists(),
        None => false,
    }
}

fn is_rate_limited(stderr: &str) -> bool {
    stderr.contains("429") || stderr.contains("Too Many Requests")
}

//! Track matching against streaming catalogs.

mod deezer;
mod query;
mod spotify;

pub use deezer::DeezerMatcher;
pub use query::{clean_channel_name_for_search, clean_title_for_search};
pub use spotify::SpotifyMatcher;

use crate::config::MatcherSettings;
use crate::model::{PlatformMatch, StreamingMatch, VideoRecord};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Errors that can occur when querying a streaming catalog.
///
/// Distinct from "no match found", which is `Ok(None)`.
#[derive(Debug, Error)]
pub enum MatcherError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Request timeout")]
    Timeout,
}

/// Trait for streaming catalog matchers.
#[async_trait]
pub trait StreamingMatcher: Send + Sync {
    /// Platform name for logging and dump file naming.
    fn platform(&self) -> &'static str;

    /// Best-guess track for one video, or `None` when the catalog has no
    /// plausible match.
    async fn find_track(
        &self,
        video: &VideoRecord,
    ) -> Result<Option<StreamingMatch>, MatcherError>;
}

/// Run one matcher over the whole video list.
///
/// Per-video failures degrade to "no match" so a flaky catalog never aborts
/// the run. Results are optionally dumped to
/// `<out_dir>/<platform>_analysis_results.json` for auditing.
pub async fn run_matcher(
    matcher: &dyn StreamingMatcher,
    videos: &[VideoRecord],
    settings: &MatcherSettings,
    out_dir: Option<&Path>,
    cancel: &CancellationToken,
) -> Vec<PlatformMatch> {
    let platform = matcher.platform();
    info!("Starting {} analysis on {} videos", platform, videos.len());

    let mut matches = Vec::new();

    for video in videos {
        if cancel.is_cancelled() {
            info!("{} analysis cancelled, keeping partial results", platform);
            break;
        }

        match matcher.find_track(video).await {
            Ok(Some(track)) => {
                info!(
                    "{}: '{}' -> {} by {} (signal {})",
                    platform, video.title, track.name, track.artist, track.signal
                );
                matches.push(PlatformMatch {
                    video_id: video.video_id.clone(),
                    title: video.title.clone(),
                    channel_name: video.channel_name.clone(),
                    track,
                });
            }
            Ok(None) => {
                info!("{}: '{}' -> not found", platform, video.title);
            }
            Err(e) => {
                warn!(
                    video_id = %video.video_id,
                    error = %e,
                    "{} search failed, treating as no match",
                    platform
                );
            }
        }

        tokio::time::sleep(Duration::from_millis(settings.delay_ms)).await;
    }

    if settings.dump_json {
        if let Some(dir) = out_dir {
            dump_matches(dir, platform, &matches);
        }
    }

    matches
}

fn dump_matches(dir: &Path, platform: &str, matches: &[PlatformMatch]) {
    let path = dir.join(format!("{}_analysis_results.json", platform.to_lowercase()));
    let result = serde_json::to_string_pretty(matches)
        .map_err(|e| e.to_string())
        .and_then(|json| std::fs::write(&path, json).map_err(|e| e.to_string()));
    match result {
        Ok(()) => info!("{} analysis saved to {:?}", platform, path),
        Err(e) => warn!("Failed to save {} analysis to {:?}: {}", platform, path, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StreamingMatch;
    use std::collections::HashMap;

    struct FakeMatcher {
        tracks: HashMap<String, StreamingMatch>,
        fail_ids: Vec<String>,
    }

    #[async_trait]
    impl StreamingMatcher for FakeMatcher {
        fn platform(&self) -> &'static str {
            "Fake"
        }

        async fn find_track(
            &self,
            video: &VideoRecord,
        ) -> Result<Option<StreamingMatch>, MatcherError> {
            if self.fail_ids.contains(&video.video_id) {
                return Err(MatcherError::Connection("boom".to_string()));
            }
            Ok(self.tracks.get(&video.video_id).cloned())
        }
    }

    fn make_video(video_id: &str) -> VideoRecord {
        VideoRecord {
            video_id: video_id.to_string(),
            title: format!("Title {}", video_id),
            video_url: String::new(),
            channel_name: "Channel".to_string(),
            channel_id: "UC".to_string(),
            channel_url: String::new(),
            views: "10".to_string(),
            youtube_views: 10,
            comments: "c".to_string(),
        }
    }

    fn make_track(signal: u64) -> StreamingMatch {
        StreamingMatch {
            track_id: "t".to_string(),
            name: "Track".to_string(),
            artist: "Artist".to_string(),
            link: "https://example.com".to_string(),
            signal,
        }
    }

    fn fast_settings() -> MatcherSettings {
        MatcherSettings {
            delay_ms: 0,
            timeout_secs: 1,
            dump_json: false,
        }
    }

    #[tokio::test]
    async fn test_run_matcher_collects_only_found_tracks() {
        let matcher = FakeMatcher {
            tracks: HashMap::from([("v1".to_string(), make_track(80))]),
            fail_ids: vec![],
        };
        let videos = vec![make_video("v1"), make_video("v2")];
        let matches = run_matcher(
            &matcher,
            &videos,
            &fast_settings(),
            None,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].video_id, "v1");
        assert_eq!(matches[0].track.signal, 80);
    }

    #[tokio::test]
    async fn test_run_matcher_errors_degrade_to_no_match() {
        let matcher = FakeMatcher {
            tracks: HashMap::from([("v2".to_string(), make_track(5))]),
            fail_ids: vec!["v1".to_string()],
        };
        let videos = vec![make_video("v1"), make_video("v2")];
        let matches = run_matcher(
            &matcher,
            &videos,
            &fast_settings(),
            None,
            &CancellationToken::new(),
        )
        .await;

        // v1 errored but the run continued to v2.
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].video_id, "v2");
    }

    #[tokio::test]
    async fn test_run_matcher_cancelled_returns_partial() {
        let matcher = FakeMatcher {
            tracks: HashMap::new(),
            fail_ids: vec![],
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let videos = vec![make_video("v1")];
        let matches = run_matcher(&matcher, &videos, &fast_settings(), None, &cancel).await;
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_run_matcher_dumps_json_when_enabled() {
        let dir = tempfile::TempDir::new().unwrap();
        let matcher = FakeMatcher {
            tracks: HashMap::from([("v1".to_string(), make_track(42))]),
            fail_ids: vec![],
        };
        let mut settings = fast_settings();
        settings.dump_json = true;
        let videos = vec![make_video("v1")];

        run_matcher(
            &matcher,
            &videos,
            &settings,
            Some(dir.path()),
            &CancellationToken::new(),
        )
        .await;

        let dumped = std::fs::read_to_string(dir.path().join("fake_analysis_results.json")).unwrap();
        let parsed: Vec<PlatformMatch> = serde_json::from_str(&dumped).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].track.signal, 42);
    }
}

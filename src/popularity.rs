//! Popularity normalization across incompatible platform signals.
//!
//! Spotify reports popularity on a bounded 0..=100 scale while Deezer
//! exposes an unbounded rank. To make them comparable with raw view counts,
//! the bounded signal is scaled by a fixed multiplier and the larger of the
//! two is taken as a synthetic stream count. The final score is a symmetric
//! ratio between views and streams.

use crate::model::{PlatformMatch, PopularityRecord, StreamingPlatform, VideoRecord};
use std::collections::HashMap;
use tracing::debug;

/// Scale factor applied to Spotify's 0..=100 popularity so it is
/// commensurate in magnitude with Deezer's raw rank.
pub const SPOTIFY_STREAM_MULTIPLIER: u64 = 1_000_000;

/// Policy threshold above which a normalized score counts as popular.
/// Configurable via `[popularity] threshold` in the config file.
pub const DEFAULT_POPULARITY_THRESHOLD: f64 = 0.5;

/// Combine the two platform signals into one synthetic stream count.
///
/// Both present and positive: the max of the scaled values, labelled
/// `Combined` so a video is not penalized just because one matcher missed.
/// One present: that value with its platform label. Neither: zero, `None`.
pub fn derive_synthetic_stream_count(
    spotify_popularity: u64,
    deezer_rank: u64,
) -> (u64, StreamingPlatform) {
    let spotify_count = spotify_popularity.saturating_mul(SPOTIFY_STREAM_MULTIPLIER);
    let deezer_count = deezer_rank;

    if spotify_count > 0 && deezer_count > 0 {
        (spotify_count.max(deezer_count), StreamingPlatform::Combined)
    } else if spotify_count > 0 {
        (spotify_count, StreamingPlatform::Spotify)
    } else if deezer_count > 0 {
        (deezer_count, StreamingPlatform::Deezer)
    } else {
        (0, StreamingPlatform::None)
    }
}

/// Score how closely the view count and the synthetic stream count agree.
///
/// Both zero is defined as 1.0 (no information asymmetry); exactly one zero
/// is 0.0 (total asymmetry); otherwise `min / max`, a symmetric ratio in
/// (0, 1] that is 1.0 on exact agreement.
pub fn normalize_popularity(views: u64, streams: u64) -> f64 {
    if views == 0 && streams == 0 {
        return 1.0;
    }
    if views == 0 || streams == 0 {
        return 0.0;
    }
    views.min(streams) as f64 / views.max(streams) as f64
}

/// 1 iff the score reaches the threshold.
pub fn derive_flag(score: f64, threshold: f64) -> u8 {
    if score >= threshold {
        1
    } else {
        0
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Build the popularity record for one video from its platform matches.
///
/// An unparseable view count must not crash the run: it collapses to a zero
/// score with zero views.
pub fn popularity_record_for(
    video: &VideoRecord,
    spotify_popularity: u64,
    deezer_rank: u64,
    threshold: f64,
) -> PopularityRecord {
    let (best_streams, platform_used) = derive_synthetic_stream_count(spotify_popularity, deezer_rank);

    let (youtube_views, normalized_score) = match video.views.parse::<u64>() {
        Ok(views) => (views, normalize_popularity(views, best_streams)),
        Err(_) => {
            debug!(
                video_id = %video.video_id,
                views = %video.views,
                "Unparseable view count, scoring as zero"
            );
            (0, 0.0)
        }
    };

    let normalized_score = round4(normalized_score);

    PopularityRecord {
        video_id: video.video_id.clone(),
        youtube_views,
        streaming_count_used: best_streams,
        streaming_platform_used: platform_used,
        normalized_score,
        popularity_flag: derive_flag(normalized_score, threshold),
    }
}

/// Build popularity records for every collected video.
///
/// The matcher result lists are independently ordered; alignment is by
/// exact `video_id` lookup. A video absent from either list simply has no
/// signal for that platform.
pub fn build_popularity_records(
    videos: &[VideoRecord],
    spotify_matches: &[PlatformMatch],
    deezer_matches: &[PlatformMatch],
    threshold: f64,
) -> Vec<PopularityRecord> {
    let spotify_by_id: HashMap<&str, &PlatformMatch> = spotify_matches
        .iter()
        .map(|m| (m.video_id.as_str(), m))
        .collect();
    let deezer_by_id: HashMap<&str, &PlatformMatch> = deezer_matches
        .iter()
        .map(|m| (m.video_id.as_str(), m))
        .collect();

    videos
        .iter()
        .map(|video| {
            let spotify_popularity = spotify_by_id
                .get(video.video_id.as_str())
                .map(|m| m.track.signal)
                .unwrap_or(0);
            let deezer_rank = deezer_by_id
                .get(video.video_id.as_str())
                .map(|m| m.track.signal)
                .unwrap_or(0);
            popularity_record_for(video, spotify_popularity, deezer_rank, threshold)
        })
        .collect()
}
